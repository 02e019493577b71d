//! Walk configuration.
//!
//! Defaults reproduce the capture this decoder was first written for: HTTP
//! responses to `192.168.0.101`, header blocks split on `CRLF CRLF`, and two
//! filler bytes on 68- and 76-byte frames.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::reassembly::DuplicatePolicy;

pub const DEFAULT_DESTINATION: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 101);
pub const DEFAULT_DELIMITER: &[u8] = b"\r\n\r\n";
pub const DEFAULT_PADDED_TOTALS: [u32; 2] = [68, 76];
pub const DEFAULT_FILLER_LEN: usize = 2;

/// What to do with a frame whose link or network tag is not IPv4/TCP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MismatchPolicy {
    /// Fail the whole walk.
    #[default]
    Abort,
    /// Step over the frame using its record length and continue.
    SkipFrame,
}

/// Frames whose captured length is listed here carry `filler_len` bytes of
/// link-layer padding after the IP datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddingQuirk {
    pub padded_totals: BTreeSet<u32>,
    pub filler_len: usize,
}

impl PaddingQuirk {
    /// A quirk table with no entries.
    pub fn none() -> Self {
        Self {
            padded_totals: BTreeSet::new(),
            filler_len: DEFAULT_FILLER_LEN,
        }
    }

    /// Filler bytes expected after the datagram of a frame of this length.
    pub fn filler_for(&self, captured_len: u32) -> usize {
        if self.padded_totals.contains(&captured_len) {
            self.filler_len
        } else {
            0
        }
    }
}

impl Default for PaddingQuirk {
    fn default() -> Self {
        Self {
            padded_totals: DEFAULT_PADDED_TOTALS.into_iter().collect(),
            filler_len: DEFAULT_FILLER_LEN,
        }
    }
}

/// Everything the walk needs besides the capture bytes.
///
/// # Examples
/// ```
/// use std::net::Ipv4Addr;
///
/// use streamshark_core::{DuplicatePolicy, ReassemblyConfig};
///
/// let config = ReassemblyConfig::default()
///     .with_destination(Ipv4Addr::new(10, 0, 0, 2))
///     .with_duplicates(DuplicatePolicy::Reject);
/// assert_eq!(config.destination, Ipv4Addr::new(10, 0, 0, 2));
/// assert_eq!(config.delimiter.as_deref(), Some(&b"\r\n\r\n"[..]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReassemblyConfig {
    /// Only payloads addressed here are kept.
    pub destination: Ipv4Addr,
    /// Separator between an application header block and its body.
    /// `None` keeps whole payloads.
    pub delimiter: Option<Vec<u8>>,
    pub padding: PaddingQuirk,
    pub duplicates: DuplicatePolicy,
    pub on_mismatch: MismatchPolicy,
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            destination: DEFAULT_DESTINATION,
            delimiter: Some(DEFAULT_DELIMITER.to_vec()),
            padding: PaddingQuirk::default(),
            duplicates: DuplicatePolicy::default(),
            on_mismatch: MismatchPolicy::default(),
        }
    }
}

impl ReassemblyConfig {
    pub fn with_destination(mut self, destination: Ipv4Addr) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_delimiter(mut self, delimiter: Option<Vec<u8>>) -> Self {
        self.delimiter = delimiter.filter(|d| !d.is_empty());
        self
    }

    pub fn with_padding(mut self, padding: PaddingQuirk) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn with_mismatch_policy(mut self, on_mismatch: MismatchPolicy) -> Self {
        self.on_mismatch = on_mismatch;
        self
    }
}

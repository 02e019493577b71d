//! StreamShark core library: offline TCP stream reconstruction from captures.
//!
//! A capture buffer is walked frame by frame through the Ethernet, IPv4 and
//! TCP headers. Header lengths are derived from the nibble fields inside the
//! headers, the application payload span is computed from them, and the
//! payload fragments addressed to one destination are reassembled in
//! ascending sequence order into the byte stream the frames carried.
//!
//! Decoding is byte-oriented and side-effect free; the only I/O is the
//! file-loading convenience [`reassemble_capture_file`]. Protocol layouts live
//! in `layout` modules so parsers stay minimal.
//!
//! Invariants:
//! - Every frame advances the capture cursor by exactly its captured length.
//! - Fatal errors carry the frame number and byte offset they occurred at and
//!   never come with a partial stream.
//! - Output is deterministic: the same capture and configuration always
//!   produce the same bytes and summary.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use streamshark_core::{ReassemblyConfig, reassemble_capture_file};
//!
//! let result = reassemble_capture_file(Path::new("net.cap"), &ReassemblyConfig::default())?;
//! std::fs::write("stream.bin", result.stream.as_bytes())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod capture;
mod config;
mod error;
mod payload;
pub mod protocols;
pub mod reader;
mod reassembly;
mod walker;

pub use config::{
    DEFAULT_DELIMITER, DEFAULT_DESTINATION, DEFAULT_FILLER_LEN, DEFAULT_PADDED_TOTALS,
    MismatchPolicy, PaddingQuirk, ReassemblyConfig,
};
pub use error::{DecodeError, Layer, ShortRead};
pub use payload::{Extraction, Filler, PayloadOutcome, extract_payload, payload_len, split_header_block};
pub use reassembly::{
    AssembledStream, DuplicateFragment, DuplicatePolicy, InsertOutcome, PayloadFragment,
    StreamAssembler,
};
pub use walker::{CaptureWalker, FrameOutcome, WalkState, reassemble, reassemble_capture_file};

/// Result of a complete walk: the stream and what was seen on the way.
#[derive(Debug, Clone)]
pub struct Reassembly {
    pub stream: AssembledStream,
    pub summary: CaptureSummary,
}

/// Per-walk counters with deterministic content for a given input.
///
/// # Examples
/// ```
/// use streamshark_core::CaptureSummary;
///
/// let summary = CaptureSummary::default();
/// assert_eq!(summary.frames_total, 0);
/// assert!(summary.time_start.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSummary {
    /// Frames whose record header was read.
    pub frames_total: u64,
    /// Frames whose fragment entered the stream.
    pub frames_stored: u64,
    /// Frames whose sequence number was already stored.
    pub frames_duplicate: u64,
    /// Frames with payload for another destination.
    pub frames_filtered: u64,
    /// Frames without application payload.
    pub frames_empty: u64,
    /// Frames stepped over for an unsupported protocol.
    pub frames_skipped: u64,
    /// Frames whose padding filler was consumed.
    pub frames_padded: u64,
    /// Frames listed in the padding table that did not carry the filler.
    pub padding_unverified: u64,
    /// Frames with trailing bytes no rule accounts for.
    pub unaccounted_trailers: u64,
    /// Bytes after the last complete frame that could not form a record header.
    pub dangling_bytes: u64,
    /// Fragments in the assembled stream.
    pub fragments: u64,
    /// Assembled stream length in bytes.
    pub stream_bytes: u64,
    /// RFC3339 timestamp of the earliest frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// RFC3339 timestamp of the latest frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::CaptureSummary;

    #[test]
    fn summary_omits_missing_timestamps() {
        let summary = CaptureSummary {
            frames_total: 2,
            time_start: Some("1970-01-01T00:00:01Z".to_string()),
            ..CaptureSummary::default()
        };
        let value = serde_json::to_value(&summary).expect("summary json");
        assert_eq!(value["frames_total"], 2);
        assert_eq!(value["time_start"], "1970-01-01T00:00:01Z");
        assert!(value.get("time_end").is_none());
    }
}

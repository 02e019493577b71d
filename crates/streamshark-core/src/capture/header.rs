use pcap_parser::nom;
use pcap_parser::{Linktype, PcapError, PcapHeader, parse_pcap_header};

use super::layout;
use crate::error::DecodeError;
use crate::reader::{ByteOrder, ByteReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampResolution {
    Micros,
    Nanos,
}

impl TimestampResolution {
    fn units_per_second(self) -> f64 {
        match self {
            TimestampResolution::Micros => 1e6,
            TimestampResolution::Nanos => 1e9,
        }
    }
}

/// Validated capture global header.
#[derive(Debug, Clone)]
pub struct CaptureHeader {
    /// Magic number as read little-endian; big-endian writers show up byte-swapped.
    pub magic: u32,
    pub byte_order: ByteOrder,
    pub resolution: TimestampResolution,
    pub version_major: u16,
    pub version_minor: u16,
    pub zone_offset: i32,
    pub timestamp_accuracy: u32,
    pub snap_len: u32,
    pub linktype: Linktype,
}

impl CaptureHeader {
    /// Convert a record's seconds/fraction pair to fractional seconds.
    pub fn timestamp(&self, ts_sec: u32, ts_frac: u32) -> f64 {
        ts_sec as f64 + ts_frac as f64 / self.resolution.units_per_second()
    }

    fn from_pcap(raw: &PcapHeader, linktype: Linktype) -> Self {
        Self {
            magic: raw.magic_number,
            byte_order: if raw.is_bigendian() {
                ByteOrder::Big
            } else {
                ByteOrder::Little
            },
            resolution: if raw.is_nanosecond_precision() {
                TimestampResolution::Nanos
            } else {
                TimestampResolution::Micros
            },
            version_major: raw.version_major,
            version_minor: raw.version_minor,
            zone_offset: raw.thiszone,
            timestamp_accuracy: raw.sigfigs,
            snap_len: raw.snaplen,
            linktype,
        }
    }
}

/// Decode and validate the global header.
///
/// `pcap_parser` picks the byte order from the magic number; on top of that
/// the major version must be 2 and the link type Ethernet before any frame
/// is read.
///
/// # Errors
/// Returns `DecodeError::InvalidCapture` for a short header, an unknown or
/// modified-format magic, an unsupported major version or a non-Ethernet
/// link type.
pub fn parse_capture_header(reader: &mut ByteReader<'_>) -> Result<CaptureHeader, DecodeError> {
    let start = reader.offset();
    reader
        .require_len(layout::GLOBAL_HEADER_LEN)
        .map_err(|short| DecodeError::InvalidCapture {
            offset: start,
            reason: format!(
                "global header needs {} bytes, got {}",
                short.needed, short.actual
            ),
        })?;

    let input = reader.peek_rest();
    let (_, raw) = parse_pcap_header(input).map_err(|err| rejected(start, input, err))?;
    if raw.is_modified_format() {
        return Err(DecodeError::InvalidCapture {
            offset: start,
            reason: "modified pcap format (0xa1b2cd34) is not supported".to_string(),
        });
    }
    if raw.version_major != layout::SUPPORTED_MAJOR_VERSION {
        return Err(DecodeError::InvalidCapture {
            offset: start + layout::VERSION_OFFSET,
            reason: format!(
                "unsupported format version {}.{}",
                raw.version_major, raw.version_minor
            ),
        });
    }

    let linktype = Linktype(raw.network.0 & layout::LINKTYPE_MASK);
    if linktype != Linktype::ETHERNET {
        return Err(DecodeError::InvalidCapture {
            offset: start + layout::LINKTYPE_OFFSET,
            reason: format!("expected Ethernet link type (1), got {}", linktype.0),
        });
    }

    reader
        .skip(layout::GLOBAL_HEADER_LEN)
        .map_err(|e| DecodeError::InvalidCapture {
            offset: e.offset,
            reason: "global header ended early".to_string(),
        })?;
    Ok(CaptureHeader::from_pcap(&raw, linktype))
}

fn rejected(offset: usize, input: &[u8], err: nom::Err<PcapError<&[u8]>>) -> DecodeError {
    let reason = match err {
        nom::Err::Error(PcapError::HeaderNotRecognized)
        | nom::Err::Failure(PcapError::HeaderNotRecognized) => {
            let magic: String = input.iter().take(4).map(|b| format!("{b:02x}")).collect();
            format!("unknown magic number 0x{magic}")
        }
        nom::Err::Incomplete(_) => "global header ended early".to_string(),
        other => format!("global header rejected: {other:?}"),
    };
    DecodeError::InvalidCapture { offset, reason }
}

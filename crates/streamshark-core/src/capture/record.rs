use pcap_parser::nom;
use pcap_parser::{parse_pcap_frame, parse_pcap_frame_be};

use super::header::CaptureHeader;
use super::layout;
use crate::error::{DecodeError, Layer};
use crate::reader::{ByteOrder, ByteReader};

/// Per-frame record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
    pub ts_sec: u32,
    /// Microseconds or nanoseconds, depending on the capture magic.
    pub ts_frac: u32,
    pub captured_len: u32,
    pub original_len: u32,
}

impl FrameRecord {
    pub fn timestamp(&self, header: &CaptureHeader) -> f64 {
        header.timestamp(self.ts_sec, self.ts_frac)
    }
}

/// Decode one record and carve out its frame bytes.
///
/// Length fields follow the byte order announced by the capture magic, so
/// captures from big-endian writers walk the same as little-endian ones.
/// On success the reader has advanced by the record header plus exactly
/// `captured_len` bytes, and the returned reader covers the frame alone.
/// A frame cut short by the snapshot length is rejected: only complete
/// frames can be walked layer by layer.
///
/// # Errors
/// `TruncatedCapture` when the record header or its frame runs past the end
/// of the capture, `SnapshotTruncated` when the captured length differs from
/// the original length.
pub fn parse_frame_record<'a>(
    reader: &mut ByteReader<'a>,
    header: &CaptureHeader,
    frame: u64,
) -> Result<(FrameRecord, ByteReader<'a>), DecodeError> {
    let offset = reader.offset();
    let truncated = |e: crate::error::ShortRead| e.into_truncated(frame, Layer::Record);
    reader.require_len(layout::RECORD_HEADER_LEN).map_err(truncated)?;

    let input = reader.peek_rest();
    let parsed = match header.byte_order {
        ByteOrder::Little => parse_pcap_frame(input),
        ByteOrder::Big => parse_pcap_frame_be(input),
    };
    let (_, block) = parsed.map_err(|err| match err {
        nom::Err::Incomplete(needed) => {
            let available = input.len().saturating_sub(layout::RECORD_HEADER_LEN);
            let missing = match needed {
                nom::Needed::Size(n) => n.get(),
                nom::Needed::Unknown => 1,
            };
            DecodeError::TruncatedCapture {
                frame,
                layer: Layer::Record,
                offset: offset + layout::RECORD_HEADER_LEN,
                needed: available + missing,
                actual: available,
            }
        }
        other => DecodeError::InvalidCapture {
            offset,
            reason: format!("record header rejected: {other:?}"),
        },
    })?;

    let record = FrameRecord {
        ts_sec: block.ts_sec,
        ts_frac: block.ts_usec,
        captured_len: block.caplen,
        original_len: block.origlen,
    };
    if record.captured_len != record.original_len {
        return Err(DecodeError::SnapshotTruncated {
            frame,
            offset,
            captured: record.captured_len,
            original: record.original_len,
        });
    }

    reader.skip(layout::RECORD_HEADER_LEN).map_err(truncated)?;
    let data = reader.sub_reader(block.data.len()).map_err(truncated)?;
    Ok((record, data))
}

#[cfg(test)]
mod tests {
    use super::parse_frame_record;
    use crate::capture::header::{CaptureHeader, TimestampResolution};
    use crate::error::{DecodeError, Layer};
    use crate::reader::{ByteOrder, ByteReader};
    use pcap_parser::Linktype;

    fn header() -> CaptureHeader {
        CaptureHeader {
            magic: 0xa1b2_c3d4,
            byte_order: ByteOrder::Little,
            resolution: TimestampResolution::Micros,
            version_major: 2,
            version_minor: 4,
            zone_offset: 0,
            timestamp_accuracy: 0,
            snap_len: 65535,
            linktype: Linktype::ETHERNET,
        }
    }

    fn record(captured: u32, original: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&10u32.to_le_bytes());
        out.extend_from_slice(&250_000u32.to_le_bytes());
        out.extend_from_slice(&captured.to_le_bytes());
        out.extend_from_slice(&original.to_le_bytes());
        out.resize(out.len() + captured as usize, 0xee);
        out
    }

    #[test]
    fn parse_record_ok() {
        let mut bytes = record(66, 66);
        bytes.extend_from_slice(b"next");
        let header = header();
        let mut reader = ByteReader::with_base(&bytes, 24);
        let (parsed, data) = parse_frame_record(&mut reader, &header, 0).unwrap();
        assert_eq!(parsed.captured_len, 66);
        assert!((parsed.timestamp(&header) - 10.25).abs() < f64::EPSILON);
        assert_eq!(data.offset(), 40);
        assert_eq!(data.remaining(), 66);
        assert_eq!(reader.offset(), 24 + 16 + 66);
        assert_eq!(reader.read_rest(), b"next");
    }

    #[test]
    fn big_endian_lengths_follow_the_magic() {
        let mut header = header();
        header.byte_order = ByteOrder::Big;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&10u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(b"abc");
        let (parsed, mut data) =
            parse_frame_record(&mut ByteReader::new(&bytes), &header, 1).unwrap();
        assert_eq!(parsed.captured_len, 3);
        assert_eq!(data.read_rest(), b"abc");
    }

    #[test]
    fn frame_body_past_end_is_truncated() {
        let bytes = record(60, 60);
        let err = parse_frame_record(&mut ByteReader::new(&bytes[..46]), &header(), 4).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TruncatedCapture {
                frame: 4,
                layer: Layer::Record,
                offset: 16,
                needed: 60,
                actual: 30,
            }
        ));
    }

    #[test]
    fn reject_snapshot_truncated_frame() {
        let bytes = record(64, 1514);
        let err = parse_frame_record(&mut ByteReader::new(&bytes), &header(), 7).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::SnapshotTruncated {
                frame: 7,
                captured: 64,
                original: 1514,
                ..
            }
        ));
    }

    #[test]
    fn short_record_is_truncated() {
        let bytes = record(66, 66);
        let err = parse_frame_record(&mut ByteReader::new(&bytes[..9]), &header(), 1).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TruncatedCapture {
                layer: Layer::Record,
                needed: 16,
                actual: 9,
                ..
            }
        ));
    }
}

//! Application payload extraction.
//!
//! The payload span is derived, not read: `total_len - ip_header - tcp_header`.
//! After the payload, the frame may still hold link-layer filler that no
//! header accounts for; the configured padding table says how much of it is
//! expected, and whatever is left beyond that is reported as an unaccounted
//! trailer.

use crate::capture::FrameRecord;
use crate::config::ReassemblyConfig;
use crate::error::{DecodeError, Layer};
use crate::protocols::ipv4::Ipv4Header;
use crate::protocols::tcp::TcpHeader;
use crate::reader::ByteReader;
use crate::reassembly::PayloadFragment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadOutcome {
    /// Computed payload length was zero or negative.
    Empty,
    /// Payload addressed somewhere other than the configured destination.
    Filtered { len: usize },
    Fragment(PayloadFragment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filler {
    /// Frame length is not in the padding table.
    NotExpected,
    Consumed(usize),
    /// Frame length is in the padding table but the frame ended first.
    Missing { expected: usize, available: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub outcome: PayloadOutcome,
    pub filler: Filler,
    /// Bytes left in the frame after payload and filler.
    pub trailer_len: usize,
}

/// Signed payload length so short datagrams cannot underflow.
pub fn payload_len(ipv4: &Ipv4Header, tcp: &TcpHeader) -> i64 {
    i64::from(ipv4.total_len) - ipv4.header_len() as i64 - tcp.header_len() as i64
}

/// Return the body after the first `delimiter`, or the whole payload when the
/// delimiter does not occur.
///
/// # Examples
/// ```
/// use streamshark_core::split_header_block;
///
/// let body = split_header_block(b"HTTP/1.1 200 OK\r\n\r\nHELLO", b"\r\n\r\n");
/// assert_eq!(body, b"HELLO");
/// assert_eq!(split_header_block(b"HELLO", b"\r\n\r\n"), b"HELLO");
/// ```
pub fn split_header_block<'a>(payload: &'a [u8], delimiter: &[u8]) -> &'a [u8] {
    if delimiter.is_empty() || payload.len() < delimiter.len() {
        return payload;
    }
    match payload
        .windows(delimiter.len())
        .position(|window| window == delimiter)
    {
        Some(start) => &payload[start + delimiter.len()..],
        None => payload,
    }
}

/// Consume the payload and any expected filler of one frame.
///
/// `reader` must sit on the first byte after the TCP header. The reader is
/// advanced past the payload even when the payload is filtered out.
///
/// # Errors
/// `TruncatedCapture` when the frame ends before the derived payload length.
pub fn extract_payload(
    reader: &mut ByteReader<'_>,
    record: &FrameRecord,
    ipv4: &Ipv4Header,
    tcp: &TcpHeader,
    config: &ReassemblyConfig,
    frame: u64,
) -> Result<Extraction, DecodeError> {
    let len = payload_len(ipv4, tcp);
    let outcome = if len <= 0 {
        PayloadOutcome::Empty
    } else {
        let payload = reader
            .read_slice(len as usize)
            .map_err(|e| e.into_truncated(frame, Layer::Payload))?;
        if ipv4.destination != config.destination {
            PayloadOutcome::Filtered {
                len: payload.len(),
            }
        } else {
            let content = match config.delimiter.as_deref() {
                Some(delimiter) => split_header_block(payload, delimiter),
                None => payload,
            };
            PayloadOutcome::Fragment(PayloadFragment {
                sequence: tcp.sequence,
                content: content.to_vec(),
            })
        }
    };

    let expected = config.padding.filler_for(record.captured_len);
    let filler = if expected == 0 {
        Filler::NotExpected
    } else if reader.remaining() >= expected {
        reader
            .skip(expected)
            .map_err(|e| e.into_truncated(frame, Layer::Payload))?;
        Filler::Consumed(expected)
    } else {
        Filler::Missing {
            expected,
            available: reader.remaining(),
        }
    };

    Ok(Extraction {
        outcome,
        filler,
        trailer_len: reader.remaining(),
    })
}

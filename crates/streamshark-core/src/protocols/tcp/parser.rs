use etherparse::TcpHeaderSlice;
use etherparse::err::tcp::{HeaderError, HeaderSliceError};

use super::layout::{self, flags};
use crate::error::{DecodeError, Layer, ShortRead};
use crate::reader::ByteReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence: u32,
    pub acknowledgement: u32,
    pub data_offset: u8,
    pub flags: u16,
    pub window: u16,
}

impl TcpHeader {
    /// Header length in bytes including options.
    pub fn header_len(&self) -> usize {
        layout::header_len(self.data_offset)
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }
}

/// Decode a TCP header and consume its options.
///
/// The header spans `4 * data_offset` bytes; everything past the fixed 20
/// is options, skipped so the reader lands on the first payload byte.
///
/// # Errors
/// `MalformedHeader` when the data offset is below 5 and
/// `TruncatedCapture` when the frame ends inside the header.
pub fn parse_tcp(reader: &mut ByteReader<'_>, frame: u64) -> Result<TcpHeader, DecodeError> {
    let offset = reader.offset();
    let slice = TcpHeaderSlice::from_slice(reader.peek_rest()).map_err(|err| match err {
        HeaderSliceError::Len(e) => {
            ShortRead::from_len_error(offset, &e).into_truncated(frame, Layer::Tcp)
        }
        HeaderSliceError::Content(HeaderError::DataOffsetTooSmall { data_offset }) => {
            DecodeError::MalformedHeader {
                frame,
                layer: Layer::Tcp,
                offset: offset + layout::DATA_OFFSET_FIELD,
                reason: format!(
                    "data offset {data_offset} words is below the minimum of {}",
                    layout::MIN_DATA_OFFSET
                ),
            }
        }
    })?;

    let data_offset = slice.data_offset();
    reader
        .skip(layout::header_len(data_offset))
        .map_err(|e| e.into_truncated(frame, Layer::Tcp))?;

    Ok(TcpHeader {
        source_port: slice.source_port(),
        destination_port: slice.destination_port(),
        sequence: slice.sequence_number(),
        acknowledgement: slice.acknowledgment_number(),
        data_offset,
        flags: flag_bits(&slice),
        window: slice.window_size(),
    })
}

fn flag_bits(slice: &TcpHeaderSlice<'_>) -> u16 {
    [
        (slice.fin(), flags::FIN),
        (slice.syn(), flags::SYN),
        (slice.rst(), flags::RST),
        (slice.psh(), flags::PSH),
        (slice.ack(), flags::ACK),
        (slice.urg(), flags::URG),
        (slice.ece(), flags::ECE),
        (slice.cwr(), flags::CWR),
        (slice.ns(), flags::NS),
    ]
    .into_iter()
    .filter(|(set, _)| *set)
    .fold(0, |bits, (_, flag)| bits | flag)
}

use std::fmt;

use etherparse::{EtherType, Ethernet2HeaderSlice};

use super::layout;
use crate::error::{DecodeError, Layer, ShortRead};
use crate::reader::ByteReader;

/// Hardware address, transmitted most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; layout::MAC_LEN]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: MacAddr,
    pub source: MacAddr,
    pub ether_type: EtherType,
}

/// Decode the fixed 14-byte Ethernet II header.
///
/// # Errors
/// `TruncatedCapture` when the frame is shorter than the header and
/// `UnsupportedProtocol` when the ether type is not IPv4.
pub fn parse_ethernet(
    reader: &mut ByteReader<'_>,
    frame: u64,
) -> Result<EthernetHeader, DecodeError> {
    let offset = reader.offset();
    let slice = Ethernet2HeaderSlice::from_slice(reader.peek_rest())
        .map_err(|e| ShortRead::from_len_error(offset, &e).into_truncated(frame, Layer::Ethernet))?;

    let ether_type = slice.ether_type();
    if ether_type != layout::EXPECTED_ETHER_TYPE {
        return Err(DecodeError::UnsupportedProtocol {
            frame,
            layer: Layer::Ethernet,
            offset: offset + layout::ETHER_TYPE_OFFSET,
            found: format!("ether type 0x{:04x}", ether_type.0),
        });
    }

    reader
        .skip(slice.slice().len())
        .map_err(|e| e.into_truncated(frame, Layer::Ethernet))?;
    Ok(EthernetHeader {
        destination: MacAddr(slice.destination()),
        source: MacAddr(slice.source()),
        ether_type,
    })
}

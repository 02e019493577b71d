use std::net::Ipv4Addr;

use etherparse::IpNumber;

use super::layout;
use crate::error::{DecodeError, Layer, ShortRead};
use crate::reader::ByteReader;

/// Decoded IPv4 header. Checksums are not verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version: u8,
    pub ihl: u8,
    pub total_len: u16,
    pub identification: u16,
    pub ttl: u8,
    pub protocol: IpNumber,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    /// Header length in bytes including options.
    pub fn header_len(&self) -> usize {
        layout::header_len(self.ihl)
    }
}

/// Decode an IPv4 header and skip its options.
///
/// On success the reader sits on the first transport byte, exactly
/// `4 * ihl` bytes after where it started.
///
/// # Errors
/// `MalformedHeader` for a version other than 4 or an IHL below 5,
/// `UnsupportedProtocol` when the payload is not TCP, and
/// `TruncatedCapture` when the frame ends inside the header.
pub fn parse_ipv4(reader: &mut ByteReader<'_>, frame: u64) -> Result<Ipv4Header, DecodeError> {
    let offset = reader.offset();
    let short = |e: ShortRead| e.into_truncated(frame, Layer::Ipv4);
    reader.require_len(layout::FIXED_HEADER_LEN).map_err(short)?;

    let version_ihl = reader.read_u8().map_err(short)?;
    let version = version_ihl >> 4;
    let ihl = version_ihl & 0x0f;
    if version != layout::VERSION {
        return Err(malformed(frame, offset, format!("version {version}, expected 4")));
    }
    if ihl < layout::MIN_IHL {
        return Err(malformed(
            frame,
            offset,
            format!("header length {ihl} words is below the minimum of 5"),
        ));
    }

    let _dscp_ecn = reader.read_u8().map_err(short)?;
    let total_len = reader.read_u16_be().map_err(short)?;
    let identification = reader.read_u16_be().map_err(short)?;
    let _flags_fragment = reader.read_u16_be().map_err(short)?;
    let ttl = reader.read_u8().map_err(short)?;
    let protocol_offset = reader.offset();
    let protocol = IpNumber(reader.read_u8().map_err(short)?);
    let _checksum = reader.read_u16_be().map_err(short)?;
    let source = Ipv4Addr::from(reader.read_array::<4>().map_err(short)?);
    let destination = Ipv4Addr::from(reader.read_array::<4>().map_err(short)?);

    if protocol != layout::EXPECTED_PROTOCOL {
        return Err(DecodeError::UnsupportedProtocol {
            frame,
            layer: Layer::Ipv4,
            offset: protocol_offset,
            found: format!("ip protocol {}", protocol.0),
        });
    }

    let options_len = layout::header_len(ihl) - layout::FIXED_HEADER_LEN;
    reader.skip(options_len).map_err(short)?;

    Ok(Ipv4Header {
        version,
        ihl,
        total_len,
        identification,
        ttl,
        protocol,
        source,
        destination,
    })
}

fn malformed(frame: u64, offset: usize, reason: String) -> DecodeError {
    DecodeError::MalformedHeader {
        frame,
        layer: Layer::Ipv4,
        offset,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::parse_ipv4;
    use crate::error::{DecodeError, Layer};
    use crate::reader::ByteReader;

    fn header(version_ihl: u8, total_len: u16, protocol: u8) -> Vec<u8> {
        let mut out = vec![version_ihl, 0];
        out.extend_from_slice(&total_len.to_be_bytes());
        out.extend_from_slice(&0x1c46u16.to_be_bytes());
        out.extend_from_slice(&0x4000u16.to_be_bytes());
        out.push(64);
        out.push(protocol);
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&[10, 0, 0, 1]);
        out.extend_from_slice(&[192, 168, 0, 101]);
        let options = (version_ihl & 0x0f) as usize * 4 - 20;
        out.extend(std::iter::repeat_n(0x01, options));
        out
    }

    #[test]
    fn parse_header_without_options() {
        let bytes = header(0x45, 60, 6);
        let mut reader = ByteReader::new(&bytes);
        let parsed = parse_ipv4(&mut reader, 0).unwrap();
        assert_eq!(parsed.header_len(), 20);
        assert_eq!(parsed.total_len, 60);
        assert_eq!(parsed.identification, 0x1c46);
        assert_eq!(parsed.destination, Ipv4Addr::new(192, 168, 0, 101));
        assert_eq!(reader.position(), 20);
    }

    #[test]
    fn options_are_skipped() {
        let mut bytes = header(0x47, 68, 6);
        bytes.push(0xab);
        let mut reader = ByteReader::new(&bytes);
        let parsed = parse_ipv4(&mut reader, 0).unwrap();
        assert_eq!(parsed.header_len(), 28);
        assert_eq!(reader.position(), 28);
        assert_eq!(reader.read_u8().unwrap(), 0xab);
    }

    #[test]
    fn reject_udp() {
        let bytes = header(0x45, 40, 17);
        let err = parse_ipv4(&mut ByteReader::new(&bytes), 5).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnsupportedProtocol {
                frame: 5,
                layer: Layer::Ipv4,
                offset: 9,
                ..
            }
        ));
    }

    #[test]
    fn reject_ipv6_version() {
        let bytes = header(0x65, 40, 6);
        let err = parse_ipv4(&mut ByteReader::new(&bytes), 0).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedHeader { .. }));
    }

    #[test]
    fn reject_short_ihl() {
        let mut bytes = header(0x45, 40, 6);
        bytes[0] = 0x44;
        let err = parse_ipv4(&mut ByteReader::new(&bytes), 0).unwrap_err();
        assert!(err.to_string().contains("below the minimum"));
    }

    #[test]
    fn truncated_options() {
        let bytes = header(0x46, 40, 6);
        let err = parse_ipv4(&mut ByteReader::new(&bytes[..22]), 0).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TruncatedCapture {
                layer: Layer::Ipv4,
                offset: 20,
                needed: 4,
                actual: 2,
                ..
            }
        ));
    }
}

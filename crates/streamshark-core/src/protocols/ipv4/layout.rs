use etherparse::IpNumber;

/// Bytes every IPv4 header carries before its options.
pub const FIXED_HEADER_LEN: usize = 20;
pub const MIN_IHL: u8 = 5;
pub const VERSION: u8 = 4;

/// The only transport protocol the walk understands.
pub const EXPECTED_PROTOCOL: IpNumber = IpNumber::TCP;

/// Header length in bytes from the IHL nibble (32-bit words).
pub const fn header_len(ihl: u8) -> usize {
    4 * ihl as usize
}

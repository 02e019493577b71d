use etherparse::EtherType;

pub const MAC_LEN: usize = 6;
pub const ETHER_TYPE_OFFSET: usize = 2 * MAC_LEN;

/// The only encapsulated protocol the walk understands.
pub const EXPECTED_ETHER_TYPE: EtherType = EtherType::IPV4;

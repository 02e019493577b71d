pub const MIN_DATA_OFFSET: u8 = 5;
/// Byte holding the data-offset nibble.
pub const DATA_OFFSET_FIELD: usize = 12;

/// Header length in bytes from the data-offset nibble (32-bit words).
pub const fn header_len(data_offset: u8) -> usize {
    4 * data_offset as usize
}

pub mod flags {
    pub const FIN: u16 = 0x001;
    pub const SYN: u16 = 0x002;
    pub const RST: u16 = 0x004;
    pub const PSH: u16 = 0x008;
    pub const ACK: u16 = 0x010;
    pub const URG: u16 = 0x020;
    pub const ECE: u16 = 0x040;
    pub const CWR: u16 = 0x080;
    pub const NS: u16 = 0x100;
    pub const MASK: u16 = 0x1ff;
}

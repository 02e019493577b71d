//! Byte layout of the capture framing (global header and record headers).

pub const GLOBAL_HEADER_LEN: usize = 24;
pub const RECORD_HEADER_LEN: usize = 16;

/// Offsets inside the global header, used to locate validation errors.
pub const VERSION_OFFSET: usize = 4;
pub const LINKTYPE_OFFSET: usize = 20;

pub const SUPPORTED_MAJOR_VERSION: u16 = 2;

/// The link type lives in the low 16 bits; the upper bits carry FCS flags.
pub const LINKTYPE_MASK: i32 = 0x0000_ffff;

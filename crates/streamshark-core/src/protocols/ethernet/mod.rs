//! Ethernet II link layer.

pub mod layout;
pub mod parser;

pub use parser::{EthernetHeader, MacAddr, parse_ethernet};

//! IPv4 network layer.

pub mod layout;
pub mod parser;

pub use parser::{Ipv4Header, parse_ipv4};

//! TCP transport layer.

pub mod layout;
pub mod parser;

pub use parser::{TcpHeader, parse_tcp};

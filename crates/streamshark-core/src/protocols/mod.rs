//! Protocol header decoders for the Ethernet / IPv4 / TCP chain.
//!
//! Each protocol follows a layered structure:
//! - `layout`: header lengths, tag values and derived-length rules
//! - `parser`: decoding through a bounded `ByteReader`; Ethernet and TCP sit on
//!   etherparse header slices, IPv4 is read field by field so a total length
//!   below the header sizes stays a payload question rather than a slice error
//!
//! Decoders consume exactly their header (options included) so the cursor
//! they leave behind sits on the next layer's first byte. Parsers are pure
//! and contain no I/O.

pub mod ethernet;
pub mod ipv4;
pub mod tcp;

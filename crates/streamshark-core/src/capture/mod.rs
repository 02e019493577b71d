//! Capture framing: the global header and the per-frame record headers.
//!
//! Framing fields use the byte order announced by the magic number; the
//! frames they delimit are handed to the protocol decoders untouched.

pub mod header;
pub mod layout;
pub mod record;

pub use header::{CaptureHeader, TimestampResolution, parse_capture_header};
pub use record::{FrameRecord, parse_frame_record};

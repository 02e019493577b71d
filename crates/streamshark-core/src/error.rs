use std::fmt;

use thiserror::Error;

/// Protocol layer a decode error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Capture,
    Record,
    Ethernet,
    Ipv4,
    Tcp,
    Payload,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Capture => "capture header",
            Layer::Record => "frame record",
            Layer::Ethernet => "ethernet",
            Layer::Ipv4 => "ipv4",
            Layer::Tcp => "tcp",
            Layer::Payload => "payload",
        };
        f.write_str(name)
    }
}

/// Fatal decode errors. Every variant carries the position it occurred at so
/// a malformed capture can be diagnosed from the message alone.
///
/// # Examples
/// ```
/// use streamshark_core::DecodeError;
///
/// let err = DecodeError::InvalidCapture {
///     offset: 0,
///     reason: "unknown magic number 0x00000000".to_string(),
/// };
/// assert!(err.to_string().contains("offset 0"));
/// ```
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid capture at offset {offset}: {reason}")]
    InvalidCapture { offset: usize, reason: String },

    #[error(
        "truncated capture in frame {frame} ({layer}) at offset {offset}: need {needed} bytes, got {actual}"
    )]
    TruncatedCapture {
        frame: u64,
        layer: Layer,
        offset: usize,
        needed: usize,
        actual: usize,
    },

    #[error(
        "frame {frame} at offset {offset} was cut by the snapshot length: captured {captured} of {original} bytes"
    )]
    SnapshotTruncated {
        frame: u64,
        offset: usize,
        captured: u32,
        original: u32,
    },

    #[error("unsupported {layer} protocol in frame {frame} at offset {offset}: {found}")]
    UnsupportedProtocol {
        frame: u64,
        layer: Layer,
        offset: usize,
        found: String,
    },

    #[error("malformed {layer} header in frame {frame} at offset {offset}: {reason}")]
    MalformedHeader {
        frame: u64,
        layer: Layer,
        offset: usize,
        reason: String,
    },

    #[error("duplicate sequence number {sequence} in frame {frame}")]
    DuplicateSequence { frame: u64, sequence: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Index of the frame the error was raised in, when it belongs to one.
    pub fn frame(&self) -> Option<u64> {
        match self {
            DecodeError::TruncatedCapture { frame, .. }
            | DecodeError::SnapshotTruncated { frame, .. }
            | DecodeError::UnsupportedProtocol { frame, .. }
            | DecodeError::MalformedHeader { frame, .. }
            | DecodeError::DuplicateSequence { frame, .. } => Some(*frame),
            DecodeError::InvalidCapture { .. } | DecodeError::Io(_) => None,
        }
    }
}

// `io::Error` is not `Clone`; its copy keeps the kind and message.
impl Clone for DecodeError {
    fn clone(&self) -> Self {
        match self {
            DecodeError::InvalidCapture { offset, reason } => DecodeError::InvalidCapture {
                offset: *offset,
                reason: reason.clone(),
            },
            DecodeError::TruncatedCapture {
                frame,
                layer,
                offset,
                needed,
                actual,
            } => DecodeError::TruncatedCapture {
                frame: *frame,
                layer: *layer,
                offset: *offset,
                needed: *needed,
                actual: *actual,
            },
            DecodeError::SnapshotTruncated {
                frame,
                offset,
                captured,
                original,
            } => DecodeError::SnapshotTruncated {
                frame: *frame,
                offset: *offset,
                captured: *captured,
                original: *original,
            },
            DecodeError::UnsupportedProtocol {
                frame,
                layer,
                offset,
                found,
            } => DecodeError::UnsupportedProtocol {
                frame: *frame,
                layer: *layer,
                offset: *offset,
                found: found.clone(),
            },
            DecodeError::MalformedHeader {
                frame,
                layer,
                offset,
                reason,
            } => DecodeError::MalformedHeader {
                frame: *frame,
                layer: *layer,
                offset: *offset,
                reason: reason.clone(),
            },
            DecodeError::DuplicateSequence { frame, sequence } => DecodeError::DuplicateSequence {
                frame: *frame,
                sequence: *sequence,
            },
            DecodeError::Io(err) => {
                DecodeError::Io(std::io::Error::new(err.kind(), err.to_string()))
            }
        }
    }
}

/// Error raised by a bounded cursor before frame context is known.
///
/// Decoders convert it into a [`DecodeError`] once the frame index and layer
/// are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("need {needed} bytes at offset {offset}, got {actual}")]
pub struct ShortRead {
    pub offset: usize,
    pub needed: usize,
    pub actual: usize,
}

impl ShortRead {
    /// Rebase a length error from a header slice decoded at `offset`.
    pub(crate) fn from_len_error(offset: usize, err: &etherparse::err::LenError) -> Self {
        Self {
            offset: offset + err.layer_start_offset,
            needed: err.required_len,
            actual: err.len,
        }
    }

    pub(crate) fn into_truncated(self, frame: u64, layer: Layer) -> DecodeError {
        DecodeError::TruncatedCapture {
            frame,
            layer,
            offset: self.offset,
            needed: self.needed,
            actual: self.actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodeError, Layer, ShortRead};

    #[test]
    fn truncated_message_names_frame_and_layer() {
        let err = ShortRead {
            offset: 40,
            needed: 20,
            actual: 6,
        }
        .into_truncated(3, Layer::Tcp);
        let msg = err.to_string();
        assert!(msg.contains("frame 3"));
        assert!(msg.contains("tcp"));
        assert!(msg.contains("offset 40"));
        assert_eq!(err.frame(), Some(3));
    }

    #[test]
    fn invalid_capture_has_no_frame() {
        let err = DecodeError::InvalidCapture {
            offset: 20,
            reason: "link type".to_string(),
        };
        assert_eq!(err.frame(), None);
    }

    #[test]
    fn clone_keeps_variant_and_message() {
        let err = DecodeError::UnsupportedProtocol {
            frame: 1,
            layer: Layer::Ipv4,
            offset: 63,
            found: "ip protocol 17".to_string(),
        };
        let copy = err.clone();
        assert!(matches!(copy, DecodeError::UnsupportedProtocol { offset: 63, .. }));
        assert_eq!(copy.to_string(), err.to_string());

        let io = DecodeError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        match io.clone() {
            DecodeError::Io(inner) => {
                assert_eq!(inner.kind(), std::io::ErrorKind::NotFound);
                assert!(inner.to_string().contains("gone"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

//! Sequence-keyed fragment store.
//!
//! Fragments are kept in a `BTreeMap` keyed by TCP sequence number, so
//! `finalize` emits them in ascending numeric order no matter the order they
//! were captured in. Sequence wrap-around is not handled: the ordering is only
//! a faithful reconstruction while sequence numbers grow with stream
//! position, which holds for short single-connection captures.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a second fragment with an already-stored sequence number is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the fragment seen first; later copies are retransmissions.
    #[default]
    KeepFirst,
    /// Replace the stored fragment with the later one.
    Overwrite,
    /// Treat the repeat as a fatal error.
    Reject,
}

/// Application bytes carried by one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadFragment {
    pub sequence: u32,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Stored,
    Replaced,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sequence number {sequence} already stored")]
pub struct DuplicateFragment {
    pub sequence: u32,
}

#[derive(Debug, Default)]
pub struct StreamAssembler {
    policy: DuplicatePolicy,
    fragments: BTreeMap<u32, Vec<u8>>,
}

impl StreamAssembler {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            fragments: BTreeMap::new(),
        }
    }

    /// Store a fragment under its sequence number, applying the duplicate
    /// policy on collision.
    ///
    /// # Errors
    /// `DuplicateFragment` when the sequence is already stored and the
    /// policy is `Reject`. The stored fragment is left untouched.
    pub fn insert(&mut self, fragment: PayloadFragment) -> Result<InsertOutcome, DuplicateFragment> {
        let PayloadFragment { sequence, content } = fragment;
        match self.fragments.entry(sequence) {
            Entry::Vacant(slot) => {
                slot.insert(content);
                Ok(InsertOutcome::Stored)
            }
            Entry::Occupied(mut slot) => match self.policy {
                DuplicatePolicy::KeepFirst => Ok(InsertOutcome::Ignored),
                DuplicatePolicy::Overwrite => {
                    slot.insert(content);
                    Ok(InsertOutcome::Replaced)
                }
                DuplicatePolicy::Reject => Err(DuplicateFragment { sequence }),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Concatenate all fragments in ascending sequence order.
    pub fn finalize(self) -> AssembledStream {
        let fragment_count = self.fragments.len();
        let total = self.fragments.values().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for content in self.fragments.into_values() {
            bytes.extend_from_slice(&content);
        }
        AssembledStream {
            bytes,
            fragment_count,
        }
    }
}

/// The reconstructed byte stream, owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledStream {
    bytes: Vec<u8>,
    fragment_count: usize,
}

impl AssembledStream {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of fragments the stream was built from.
    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }
}

impl AsRef<[u8]> for AssembledStream {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::{DuplicateFragment, DuplicatePolicy, InsertOutcome, PayloadFragment, StreamAssembler};

    fn fragment(sequence: u32, content: &[u8]) -> PayloadFragment {
        PayloadFragment {
            sequence,
            content: content.to_vec(),
        }
    }

    #[test]
    fn finalize_orders_by_sequence_not_arrival() {
        let mut assembler = StreamAssembler::default();
        assembler.insert(fragment(3000, b"C")).unwrap();
        assembler.insert(fragment(1000, b"A")).unwrap();
        assembler.insert(fragment(2000, b"B")).unwrap();
        let stream = assembler.finalize();
        assert_eq!(stream.as_bytes(), b"ABC");
        assert_eq!(stream.fragment_count(), 3);
    }

    #[test]
    fn ordering_is_numeric_across_digit_counts() {
        let mut assembler = StreamAssembler::default();
        assembler.insert(fragment(100, b"late")).unwrap();
        assembler.insert(fragment(99, b"early-")).unwrap();
        assembler.insert(fragment(u32::MAX, b"-last")).unwrap();
        assert_eq!(assembler.finalize().as_bytes(), b"early-late-last");
    }

    #[test]
    fn keep_first_ignores_retransmission() {
        let mut assembler = StreamAssembler::new(DuplicatePolicy::KeepFirst);
        assert_eq!(assembler.insert(fragment(1, b"one")).unwrap(), InsertOutcome::Stored);
        assert_eq!(assembler.insert(fragment(1, b"uno")).unwrap(), InsertOutcome::Ignored);
        assert_eq!(assembler.finalize().as_bytes(), b"one");
    }

    #[test]
    fn overwrite_keeps_latest() {
        let mut assembler = StreamAssembler::new(DuplicatePolicy::Overwrite);
        assembler.insert(fragment(1, b"one")).unwrap();
        assert_eq!(assembler.insert(fragment(1, b"uno")).unwrap(), InsertOutcome::Replaced);
        assert_eq!(assembler.len(), 1);
        assert_eq!(assembler.finalize().as_bytes(), b"uno");
    }

    #[test]
    fn reject_reports_sequence() {
        let mut assembler = StreamAssembler::new(DuplicatePolicy::Reject);
        assembler.insert(fragment(42, b"x")).unwrap();
        let err = assembler.insert(fragment(42, b"y")).unwrap_err();
        assert_eq!(err, DuplicateFragment { sequence: 42 });
        assert_eq!(assembler.finalize().as_bytes(), b"x");
    }

    #[test]
    fn empty_assembler_yields_empty_stream() {
        let assembler = StreamAssembler::default();
        assert!(assembler.is_empty());
        let stream = assembler.finalize();
        assert!(stream.is_empty());
        assert_eq!(stream.fragment_count(), 0);
    }
}

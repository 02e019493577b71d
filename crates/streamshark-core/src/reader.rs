//! Bounded forward cursor over capture bytes.
//!
//! Every decoder reads through a `ByteReader`; a read that would run past the
//! end of the underlying slice fails with [`ShortRead`] instead of panicking.
//! Offsets reported in errors are absolute within the capture buffer, so a
//! reader carved out for a single frame still points at the right byte.

use crate::error::ShortRead;

/// Byte order of multi-byte integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Create a reader whose first byte sits at `base` in the enclosing buffer.
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Absolute offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes consumed from this reader so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn require_len(&self, needed: usize) -> Result<(), ShortRead> {
        if self.remaining() < needed {
            return Err(ShortRead {
                offset: self.offset(),
                needed,
                actual: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ShortRead> {
        self.require_len(len)?;
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..self.pos])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ShortRead> {
        let bytes = self.read_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ShortRead> {
        let [value] = self.read_array::<1>()?;
        Ok(value)
    }

    pub fn read_u16(&mut self, order: ByteOrder) -> Result<u16, ShortRead> {
        let bytes = self.read_array::<2>()?;
        Ok(match order {
            ByteOrder::Big => u16::from_be_bytes(bytes),
            ByteOrder::Little => u16::from_le_bytes(bytes),
        })
    }

    pub fn read_u32(&mut self, order: ByteOrder) -> Result<u32, ShortRead> {
        let bytes = self.read_array::<4>()?;
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        })
    }

    pub fn read_u16_be(&mut self) -> Result<u16, ShortRead> {
        self.read_u16(ByteOrder::Big)
    }

    pub fn read_u32_be(&mut self) -> Result<u32, ShortRead> {
        self.read_u32(ByteOrder::Big)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ShortRead> {
        self.read_slice(len).map(|_| ())
    }

    /// Split off the next `len` bytes as an independent reader and advance
    /// past them.
    pub fn sub_reader(&mut self, len: usize) -> Result<ByteReader<'a>, ShortRead> {
        let base = self.offset();
        let data = self.read_slice(len)?;
        Ok(ByteReader::with_base(data, base))
    }

    /// Everything left, without consuming it.
    pub fn peek_rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Consume everything left.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let start = self.pos;
        self.pos = self.data.len();
        &self.data[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteOrder, ByteReader};

    #[test]
    fn reads_both_byte_orders() {
        let data = [0x12, 0x34, 0x12, 0x34, 0x01, 0x00, 0x00, 0x00];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u16(ByteOrder::Big).unwrap(), 0x1234);
        assert_eq!(reader.read_u16(ByteOrder::Little).unwrap(), 0x3412);
        assert_eq!(reader.read_u32(ByteOrder::Little).unwrap(), 1);
        assert!(reader.is_empty());
    }

    #[test]
    fn short_read_reports_absolute_offset() {
        let data = [0u8; 10];
        let mut outer = ByteReader::with_base(&data, 100);
        outer.skip(4).unwrap();
        let mut frame = outer.sub_reader(4).unwrap();
        frame.skip(3).unwrap();
        let err = frame.read_u16_be().unwrap_err();
        assert_eq!(err.offset, 107);
        assert_eq!(err.needed, 2);
        assert_eq!(err.actual, 1);
    }

    #[test]
    fn failed_read_does_not_advance() {
        let data = [1u8, 2, 3];
        let mut reader = ByteReader::new(&data);
        assert!(reader.read_u32_be().is_err());
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.peek_rest(), &[1, 2, 3]);
        assert_eq!(reader.read_rest(), &[1, 2, 3]);
        assert!(reader.peek_rest().is_empty());
    }

    #[test]
    fn sub_reader_advances_parent() {
        let data = [0u8; 8];
        let mut reader = ByteReader::new(&data);
        let sub = reader.sub_reader(5).unwrap();
        assert_eq!(sub.remaining(), 5);
        assert_eq!(reader.offset(), 5);
    }
}

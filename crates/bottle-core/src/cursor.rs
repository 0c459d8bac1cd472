//! Position-tracking reader over a received buffer
//!
//! All multi-byte reads are little-endian. A read that would run past the end
//! of the buffer fails with [`DecodeFault::Truncated`] and leaves the position
//! untouched.

use crate::errors::DecodeFault;

/// Byte cursor over a borrowed buffer
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start reading at `offset`. Offsets past the end are clamped.
    pub fn at(buf: &'a [u8], offset: usize) -> Self {
        Self {
            buf,
            pos: offset.min(buf.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `n` bytes and advance past them
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeFault> {
        if self.remaining() < n {
            return Err(DecodeFault::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeFault> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeFault> {
        Ok(i8::from_le_bytes(self.array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeFault> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeFault> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeFault> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeFault> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    /// Read an `int32` length or count field, rejecting negative values
    ///
    /// A rejected length leaves the cursor where it was.
    pub fn read_len(&mut self) -> Result<usize, DecodeFault> {
        let offset = self.pos;
        let length = self.read_i32()?;
        usize::try_from(length).map_err(|_| {
            self.pos = offset;
            DecodeFault::NegativeLength { offset, length }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_reads() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0xff];
        let mut cursor = ByteCursor::new(&buf);
        assert_eq!(cursor.read_i32().unwrap(), 0x0403_0201);
        assert_eq!(cursor.position(), 4);
        assert_eq!(cursor.read_i8().unwrap(), -1);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let buf = [0x01, 0x02];
        let mut cursor = ByteCursor::new(&buf);
        let err = cursor.read_i32().unwrap_err();
        assert_eq!(
            err,
            DecodeFault::Truncated {
                offset: 0,
                needed: 4,
                available: 2
            }
        );
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_i16().unwrap(), 0x0201);
    }

    #[test]
    fn test_negative_length_rejected() {
        let buf = (-3i32).to_le_bytes();
        let mut cursor = ByteCursor::new(&buf);
        assert_eq!(
            cursor.read_len().unwrap_err(),
            DecodeFault::NegativeLength { offset: 0, length: -3 }
        );
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_i32().unwrap(), -3);
    }

    #[test]
    fn test_offset_is_clamped() {
        let buf = [0u8; 3];
        let cursor = ByteCursor::at(&buf, 10);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.remaining(), 0);
    }
}

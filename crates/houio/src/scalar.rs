//! Fixed-width scalars and variable-length "short lengths" over byte streams.
//!
//! [`ByteReader`] tracks the absolute byte offset so every decode error can
//! point at the place it happened, and supports a single byte of lookahead
//! for the text tokenizer. Binary documents are little-endian unless the
//! magic number arrives byte-swapped, in which case the reader is switched to
//! [`Endianness::Big`]. [`ByteWriter`] always emits little-endian.

use std::io::{self, Read, Write};

use half::f16;

use crate::error::{DecodeError, Error, Result};

/// Lead byte introducing a 16-bit length.
pub const LENGTH_U16: u8 = 0xf2;
/// Lead byte introducing a 32-bit length.
pub const LENGTH_U32: u8 = 0xf4;
/// Lead byte introducing a signed 64-bit length.
pub const LENGTH_I64: u8 = 0xf8;
/// Lengths below this value are stored in a single byte.
pub const LENGTH_INLINE_LIMIT: u8 = 0xf1;

/// Byte order of multi-byte scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

macro_rules! read_scalar {
    ($(#[$doc:meta] $name:ident -> $ty:ty, $n:literal);* $(;)?) => {
        $(
            #[$doc]
            pub fn $name(&mut self) -> Result<$ty> {
                let raw = self.read_array::<$n>()?;
                Ok(match self.endianness {
                    Endianness::Little => <$ty>::from_le_bytes(raw),
                    Endianness::Big => <$ty>::from_be_bytes(raw),
                })
            }
        )*
    };
}

/// Offset-tracking reader with one byte of pushback.
#[derive(Debug)]
pub struct ByteReader<R> {
    inner: R,
    offset: u64,
    peeked: Option<u8>,
    endianness: Endianness,
}

impl<R: Read> ByteReader<R> {
    /// Wrap a stream, starting at offset 0 in little-endian mode.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            peeked: None,
            endianness: Endianness::Little,
        }
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Byte order used for multi-byte scalars.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub(crate) fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    /// Hand the underlying stream back to the caller.
    pub fn into_inner(self) -> R {
        self.inner
    }

    pub(crate) fn error(&self, kind: DecodeError) -> Error {
        Error::decode(self.offset, kind)
    }

    fn map_io(&self, err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            self.error(DecodeError::UnexpectedEndOfInput)
        } else {
            Error::Io(err)
        }
    }

    /// Read one byte, or `None` at a clean end of stream.
    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        if let Some(byte) = self.peeked.take() {
            self.offset += 1;
            return Ok(Some(byte));
        }
        let mut buf = [0_u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(buf[0]));
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(self.map_io(err)),
            }
        }
    }

    /// Push a byte back so the next read returns it again.
    ///
    /// Only one byte of pushback is kept; it must be the byte just read.
    pub fn put_back(&mut self, byte: u8) {
        debug_assert!(self.peeked.is_none());
        self.peeked = Some(byte);
        self.offset -= 1;
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let mut start = 0;
        if let Some(byte) = self.peeked.take() {
            buf[0] = byte;
            start = 1;
        }
        if let Err(err) = self.inner.read_exact(&mut buf[start..]) {
            if start == 1 {
                self.peeked = Some(buf[0]);
            }
            return Err(self.map_io(err));
        }
        self.offset += buf.len() as u64;
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0_u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    /// Read an unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_ne_bytes(self.read_array::<1>()?))
    }

    read_scalar! {
        /// Read a `u16` in the stream byte order.
        read_u16 -> u16, 2;
        /// Read an `i16` in the stream byte order.
        read_i16 -> i16, 2;
        /// Read a `u32` in the stream byte order.
        read_u32 -> u32, 4;
        /// Read an `i32` in the stream byte order.
        read_i32 -> i32, 4;
        /// Read an `i64` in the stream byte order.
        read_i64 -> i64, 8;
        /// Read an `f32` in the stream byte order.
        read_f32 -> f32, 4;
        /// Read an `f64` in the stream byte order.
        read_f64 -> f64, 8;
    }

    /// Read a half precision float.
    pub fn read_f16(&mut self) -> Result<f16> {
        Ok(f16::from_bits(self.read_u16()?))
    }

    /// Read a variable-length encoded length or id.
    ///
    /// ```
    /// use houio::scalar::ByteReader;
    ///
    /// let mut r = ByteReader::new(&[0x05, 0xf2, 0x00, 0x01][..]);
    /// assert_eq!(r.read_length().unwrap(), 5);
    /// assert_eq!(r.read_length().unwrap(), 0x100);
    /// ```
    pub fn read_length(&mut self) -> Result<u64> {
        let at = self.offset;
        match self.read_u8()? {
            n if n < LENGTH_INLINE_LIMIT => Ok(u64::from(n)),
            LENGTH_U16 => Ok(u64::from(self.read_u16()?)),
            LENGTH_U32 => Ok(u64::from(self.read_u32()?)),
            LENGTH_I64 => {
                let n = self.read_i64()?;
                u64::try_from(n).map_err(|_| Error::decode(at, DecodeError::NegativeLength(n)))
            }
            other => Err(Error::decode(at, DecodeError::InvalidLengthPrefix(other))),
        }
    }

    /// Read exactly `len` bytes.
    ///
    /// Memory grows with the bytes actually present, so a corrupt length
    /// cannot force a huge up-front allocation.
    pub fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        if usize::try_from(len).is_err() {
            return Err(self.error(DecodeError::LengthOverflow(len)));
        }
        let mut out = Vec::new();
        let mut remaining = len;
        if remaining > 0 {
            if let Some(byte) = self.peeked.take() {
                out.push(byte);
                self.offset += 1;
                remaining -= 1;
            }
        }
        let read = (&mut self.inner).take(remaining).read_to_end(&mut out);
        let got = read.map_err(|err| self.map_io(err))?;
        self.offset += got as u64;
        if (got as u64) < remaining {
            return Err(self.error(DecodeError::UnexpectedEndOfInput));
        }
        Ok(out)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_length()?;
        let at = self.offset;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| Error::decode(at, DecodeError::InvalidUtf8))
    }

    /// Read `count` fixed-width elements in one bulk read and decode each.
    pub(crate) fn read_bulk<const N: usize, T>(
        &mut self,
        count: u64,
        decode: impl Fn([u8; N], Endianness) -> T,
    ) -> Result<Vec<T>> {
        let len = count
            .checked_mul(N as u64)
            .ok_or_else(|| self.error(DecodeError::LengthOverflow(count)))?;
        let bytes = self.read_bytes(len)?;
        let endianness = self.endianness;
        Ok(bytes
            .chunks_exact(N)
            .map(|chunk| {
                let mut raw = [0_u8; N];
                raw.copy_from_slice(chunk);
                decode(raw, endianness)
            })
            .collect())
    }
}

/// Little-endian scalar writer.
#[derive(Debug)]
pub struct ByteWriter<W> {
    inner: W,
}

impl<W: Write> ByteWriter<W> {
    /// Wrap an output stream.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Hand the underlying stream back to the caller.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Write an unsigned byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    /// Write a signed byte.
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write a `u16`.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write an `i16`.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write a `u32`.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write an `i32`.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write an `i64`.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write an `f32`.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write an `f64`.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write a length or id using the shortest prefix form.
    ///
    /// ```
    /// use houio::scalar::ByteWriter;
    ///
    /// let mut w = ByteWriter::new(Vec::new());
    /// w.write_length(0xf0).unwrap();
    /// w.write_length(0xf1).unwrap();
    /// assert_eq!(w.into_inner(), vec![0xf0, 0xf2, 0xf1, 0x00]);
    /// ```
    #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn write_length(&mut self, length: u64) -> Result<()> {
        if length < u64::from(LENGTH_INLINE_LIMIT) {
            self.write_u8(length as u8)
        } else if length < 0xffff {
            self.write_u8(LENGTH_U16)?;
            self.write_u16(length as u16)
        } else if length < 0xffff_ffff {
            self.write_u8(LENGTH_U32)?;
            self.write_u32(length as u32)
        } else {
            self.write_u8(LENGTH_I64)?;
            self.write_i64(length as i64)
        }
    }

    /// Write a length-prefixed string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_length(value.len() as u64)?;
        self.write_bytes(value.as_bytes())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_prefix_forms() {
        let mut w = ByteWriter::new(Vec::new());
        for n in [0_u64, 0xf0, 0xf1, 0xfffe, 0xffff, 0xffff_fffe, 0xffff_ffff] {
            w.write_length(n).unwrap();
        }
        let bytes = w.into_inner();
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 0xf0);
        assert_eq!(&bytes[2..5], &[LENGTH_U16, 0xf1, 0x00]);

        let mut r = ByteReader::new(bytes.as_slice());
        for n in [0_u64, 0xf0, 0xf1, 0xfffe, 0xffff, 0xffff_fffe, 0xffff_ffff] {
            assert_eq!(r.read_length().unwrap(), n);
        }
        assert_eq!(r.next_byte().unwrap(), None);
    }

    #[test]
    fn rejects_unknown_length_prefix() {
        for lead in [0xf1_u8, 0xf3, 0xfa, 0xff] {
            let bytes = [lead, 0, 0, 0, 0, 0, 0, 0, 0];
            let mut r = ByteReader::new(&bytes[..]);
            let err = r.read_length().unwrap_err();
            assert_eq!(err.decode_kind(), Some(&DecodeError::InvalidLengthPrefix(lead)));
        }
    }

    #[test]
    fn negative_i64_length_is_an_error() {
        let mut bytes = vec![LENGTH_I64];
        bytes.extend_from_slice(&(-2_i64).to_le_bytes());
        let err = ByteReader::new(bytes.as_slice()).read_length().unwrap_err();
        assert_eq!(err.decode_kind(), Some(&DecodeError::NegativeLength(-2)));
    }

    #[test]
    fn big_endian_scalars() {
        let mut r = ByteReader::new(&[0x12, 0x34, 0x3f, 0x80, 0x00, 0x00][..]);
        r.set_endianness(Endianness::Big);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert!((r.read_f32().unwrap() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn truncated_scalar_reports_offset() {
        let mut r = ByteReader::new(&[1, 2, 3][..]);
        assert_eq!(r.read_u8().unwrap(), 1);
        let err = r.read_u32().unwrap_err();
        assert!(matches!(
            err,
            Error::Decode { offset: 1, kind: DecodeError::UnexpectedEndOfInput }
        ));
    }

    #[test]
    fn pushback_is_seen_by_bulk_reads() {
        let mut r = ByteReader::new(&[7, 8, 9][..]);
        let first = r.next_byte().unwrap().unwrap();
        r.put_back(first);
        assert_eq!(r.offset(), 0);
        assert_eq!(r.read_bytes(3).unwrap(), vec![7, 8, 9]);
        assert_eq!(r.offset(), 3);
    }

    #[test]
    fn huge_declared_length_fails_without_allocating() {
        let mut r = ByteReader::new(&[1, 2][..]);
        let err = r.read_bytes(u64::from(u32::MAX)).unwrap_err();
        assert_eq!(err.decode_kind(), Some(&DecodeError::UnexpectedEndOfInput));
    }

    #[test]
    fn half_floats() {
        let one = f16::from_f32(1.5).to_bits().to_le_bytes();
        let mut r = ByteReader::new(&one[..]);
        assert_eq!(r.read_f16().unwrap().to_f32(), 1.5);
    }
}

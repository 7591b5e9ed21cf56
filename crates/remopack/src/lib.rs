//! # Remopack
//!
//! The byte-level framing used on the wire between a remora client and a
//! component host.
//!
//! ## Philosophy
//!
//! - **Flat**: Messages are a header byte followed by fields in a fixed order.
//!   There are no tags and no nesting; the message header says what follows.
//! - **Streaming reads**: `Reader` pulls from any `std::io::Read`, so a message
//!   body can be decoded lazily long after its header was inspected.
//! - **Bounded**: Packed integers are capped at five bytes and blobs at
//!   `u32::MAX`; nothing is read past what a length prefix announces.
//!
//! ## Format
//!
//! - **Fixed-width integers**: Big-Endian.
//! - **Packed integers**: 7-bit groups, least significant group first; the high
//!   bit of each byte marks a continuation.
//! - **Blobs**: `[Len: packed][Data: Len]`
//! - **Strings**: a blob holding UTF-8.

use std::io;
use std::io::Read;

#[cfg(test)]
mod tests;

/// Framing errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input ended in the middle of a field.
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// A packed integer ran past five bytes or past `u32::MAX`.
    #[error("packed integer does not fit in 32 bits")]
    PackedIntegerOverflow,
    /// Blob length exceeds `u32::MAX`.
    #[error("blob of {0} bytes is too large to frame")]
    BlobTooLarge(usize),
    /// String data is not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    /// The underlying reader failed for a reason other than running dry.
    #[error("i/o failure: {0}")]
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEnd,
            _ => Error::Io(e),
        }
    }
}

/// Specialized `Result` for framing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Largest number of bytes a packed `u32` may occupy.
pub const MAX_PACKED_LEN: usize = 5;

/// Appends frame fields to a growable buffer.
///
/// Fixed-width writes cannot fail. Only length-prefixed writes can, when the
/// payload is larger than a packed `u32` can describe.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Creates a new encoder with default capacity.
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(256) }
    }

    /// Writes a single byte.
    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Writes a Big-Endian `u16`.
    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Writes a Big-Endian `u32`.
    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Writes a Big-Endian `i32`.
    pub fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Writes a Big-Endian `i64`.
    pub fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Writes a boolean as `0x00` or `0x01`.
    pub fn bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    /// Writes an unsigned integer in packed form.
    pub fn packed_u32(&mut self, mut v: u32) {
        loop {
            let group = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(group);
                return;
            }
            self.buf.push(group | 0x80);
        }
    }

    /// Writes bytes with no length prefix.
    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a packed length followed by the bytes.
    pub fn blob(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| Error::BlobTooLarge(bytes.len()))?;
        self.packed_u32(len);
        self.raw(bytes);
        Ok(())
    }

    /// Writes a UTF-8 string as a blob.
    pub fn str(&mut self, s: &str) -> Result<()> {
        self.blob(s.as_bytes())
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the encoder, returning the framed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Pulls frame fields from a byte source.
///
/// The reader never buffers ahead: every method consumes exactly the bytes of
/// the field it returns, so the source is left positioned at the next field.
pub struct Reader<R> {
    inner: R,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads a single byte.
    pub fn u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.inner.read_exact(&mut b)?;
        Ok(b[0])
    }

    /// Reads a Big-Endian `u16`.
    pub fn u16(&mut self) -> Result<u16> {
        let mut b = [0u8; 2];
        self.inner.read_exact(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    /// Reads a Big-Endian `u32`.
    pub fn u32(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.inner.read_exact(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    /// Reads a Big-Endian `i32`.
    pub fn i32(&mut self) -> Result<i32> {
        let mut b = [0u8; 4];
        self.inner.read_exact(&mut b)?;
        Ok(i32::from_be_bytes(b))
    }

    /// Reads a Big-Endian `i64`.
    pub fn i64(&mut self) -> Result<i64> {
        let mut b = [0u8; 8];
        self.inner.read_exact(&mut b)?;
        Ok(i64::from_be_bytes(b))
    }

    /// Reads a boolean. Any non-zero byte is `true`.
    pub fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    /// Reads a packed unsigned integer.
    pub fn packed_u32(&mut self) -> Result<u32> {
        let mut value: u64 = 0;
        for i in 0..MAX_PACKED_LEN {
            let b = self.u8()?;
            value |= u64::from(b & 0x7f) << (7 * i);
            if b & 0x80 == 0 {
                return u32::try_from(value).map_err(|_| Error::PackedIntegerOverflow);
            }
        }
        Err(Error::PackedIntegerOverflow)
    }

    /// Reads exactly `len` bytes.
    pub fn bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let read = (&mut self.inner).take(len as u64).read_to_end(&mut out)?;
        if read != len {
            return Err(Error::UnexpectedEnd);
        }
        Ok(out)
    }

    /// Reads a packed length followed by that many bytes.
    pub fn blob(&mut self) -> Result<Vec<u8>> {
        let len = self.packed_u32()? as usize;
        self.bytes(len)
    }

    /// Reads a blob and validates it as UTF-8.
    pub fn string(&mut self) -> Result<String> {
        String::from_utf8(self.blob()?).map_err(|_| Error::InvalidUtf8)
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Returns the underlying source, positioned after the last field read.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

//! Byte-stream primitives shared by every record codec
//!
//! Fixed-width integers are big-endian in every schema version. The only
//! exception is the CompactSize length prefix of legacy strings, which keeps
//! its own little-endian wire rule.

use crate::error::DecodeError;

/// Cursor over a stored value
///
/// Every read names the field it is reading so truncation errors point at
/// the exact place the input ran out.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Create reader positioned at the start of `buf`
    #[inline]
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read exactly `n` bytes
    ///
    /// # Errors
    /// Returns [`DecodeError::UnexpectedEof`] if fewer than `n` bytes remain
    pub fn read_bytes(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(DecodeError::eof(field, n, remaining));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read a fixed-size byte array
    ///
    /// # Errors
    /// Returns [`DecodeError::UnexpectedEof`] on truncated input
    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_bytes(field, N)?;
        let mut arr = [0u8; N];
        arr.copy_from_slice(bytes);
        Ok(arr)
    }

    /// Read a single byte
    ///
    /// # Errors
    /// Returns [`DecodeError::UnexpectedEof`] on truncated input
    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>(field)?[0])
    }

    /// Read a big-endian u16
    ///
    /// # Errors
    /// Returns [`DecodeError::UnexpectedEof`] on truncated input
    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        self.read_array(field).map(u16::from_be_bytes)
    }

    /// Read a big-endian u32
    ///
    /// # Errors
    /// Returns [`DecodeError::UnexpectedEof`] on truncated input
    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.read_array(field).map(u32::from_be_bytes)
    }

    /// Read a big-endian u64
    ///
    /// # Errors
    /// Returns [`DecodeError::UnexpectedEof`] on truncated input
    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        self.read_array(field).map(u64::from_be_bytes)
    }

    /// Read a strict boolean byte (0 or 1)
    ///
    /// # Errors
    /// Returns [`DecodeError::InvalidBool`] for any other value
    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        match self.read_u8(field)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(DecodeError::InvalidBool { field, value }),
        }
    }

    /// Read a canonical CompactSize varint
    ///
    /// # Errors
    /// Returns [`DecodeError::NonCanonicalVarInt`] if a wider form than
    /// necessary was used
    pub fn read_compact_size(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        let discriminant = self.read_u8(field)?;
        let (value, min) = match discriminant {
            0xfd => (u64::from(u16::from_le_bytes(self.read_array(field)?)), 0xfd),
            0xfe => (u64::from(u32::from_le_bytes(self.read_array(field)?)), 0x1_0000),
            0xff => (u64::from_le_bytes(self.read_array(field)?), 0x1_0000_0000),
            n => return Ok(u64::from(n)),
        };
        if value < min {
            return Err(DecodeError::NonCanonicalVarInt { field, value });
        }
        Ok(value)
    }

    /// Read a CompactSize-prefixed UTF-8 string
    ///
    /// # Errors
    /// Fails on truncation, non-canonical prefix or invalid UTF-8
    pub fn read_var_string(&mut self, field: &'static str) -> Result<&'a str, DecodeError> {
        let len = self.read_compact_size(field)?;
        let len = usize::try_from(len).map_err(|_| DecodeError::LengthOverflow { field, len })?;
        let bytes = self.read_bytes(field, len)?;
        std::str::from_utf8(bytes).map_err(|source| DecodeError::InvalidUtf8 { field, source })
    }

    /// Assert the whole value was consumed
    ///
    /// # Errors
    /// Returns [`DecodeError::TrailingBytes`] if input remains
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

/// Append-only buffer mirroring [`WireReader`]
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Create empty writer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create writer with preallocated capacity
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    #[inline]
    pub fn put_u16(&mut self, v: u16) {
        self.put_bytes(&v.to_be_bytes());
    }

    #[inline]
    pub fn put_u32(&mut self, v: u32) {
        self.put_bytes(&v.to_be_bytes());
    }

    #[inline]
    pub fn put_u64(&mut self, v: u64) {
        self.put_bytes(&v.to_be_bytes());
    }

    #[inline]
    pub fn put_bool(&mut self, v: bool) {
        self.put_u8(u8::from(v));
    }

    /// Write the canonical CompactSize form of `n`
    pub fn put_compact_size(&mut self, n: u64) {
        match n {
            0..=0xfc => self.put_u8(n as u8),
            0xfd..=0xffff => {
                self.put_u8(0xfd);
                self.put_bytes(&(n as u16).to_le_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.put_u8(0xfe);
                self.put_bytes(&(n as u32).to_le_bytes());
            }
            _ => {
                self.put_u8(0xff);
                self.put_bytes(&n.to_le_bytes());
            }
        }
    }

    /// Write a CompactSize-prefixed string
    pub fn put_var_string(&mut self, s: &str) {
        self.put_compact_size(s.len() as u64);
        self.put_bytes(s.as_bytes());
    }

    /// Bytes written so far
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing was written
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume writer and return the encoded bytes
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

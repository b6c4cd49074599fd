//! 32-byte chain hashes
//!
//! Provides [`Hash256`], used for transaction ids and chain genesis hashes.
//! Bytes are stored in internal order; the string form is byte-reversed,
//! matching how block explorers print transaction ids.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte double-SHA256 style hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// Create hash from raw bytes in internal order
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create hash from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashParseError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| HashParseError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl Display for Hash256 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.write_str(&hex::encode(reversed))
    }
}

impl FromStr for Hash256 {
    type Err = HashParseError;

    /// Parse the byte-reversed hex form produced by [`Display`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = hex::decode(s)?;
        bytes.reverse();
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8; 32]> for Hash256 {
    fn as_ref(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Errors that can occur when parsing a hash
#[derive(Debug, thiserror::Error)]
pub enum HashParseError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

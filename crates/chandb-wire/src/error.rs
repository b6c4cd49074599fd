//! Error types for the wire codecs
//!
//! Provides error handling for:
//! - Decode operations (stored bytes → record)
//! - Encode operations (record → stored bytes)
//! - Address resolution during legacy decoding
//! - Codec table lookups

use crate::codec::{RecordKind, SchemaVersion};
use std::fmt::{self, Display, Formatter};

/// Errors while decoding a stored record
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Input ended before a field was complete
    #[error("unexpected end of input reading {field}: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// Declared length cannot be addressed on this platform
    #[error("length {len} of {field} overflows usize")]
    LengthOverflow { field: &'static str, len: u64 },

    /// CompactSize prefix used a wider form than necessary
    #[error("non-canonical varint for {field}: {value}")]
    NonCanonicalVarInt { field: &'static str, value: u64 },

    /// String field is not UTF-8
    #[error("invalid utf-8 in {field}: {source}")]
    InvalidUtf8 {
        field: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },

    /// Public key is not a compressed point on secp256k1
    #[error("invalid compressed public key {key}: {source}")]
    InvalidPubKey {
        key: String,
        #[source]
        source: secp256k1::Error,
    },

    /// Unknown address descriptor byte
    #[error("unknown address type: {0}")]
    UnknownAddressType(u8),

    /// Unknown channel close type
    #[error("unknown close type: {0}")]
    UnknownCloseType(u8),

    /// Boolean byte other than 0 or 1
    #[error("invalid boolean {value} for {field}")]
    InvalidBool { field: &'static str, value: u8 },

    /// Bytes left over after the last field
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),

    /// Stored address could not be resolved to an endpoint
    #[error("address resolution failed: {0}")]
    Resolve(#[from] ResolveError),
}

impl DecodeError {
    /// Create end-of-input error for field
    pub fn eof(field: &'static str, needed: usize, remaining: usize) -> Self {
        Self::UnexpectedEof {
            field,
            needed,
            remaining,
        }
    }
}

/// Errors while encoding a record
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Address list does not fit the 4-byte count prefix
    #[error("too many addresses: {0}")]
    TooManyAddresses(usize),

    /// Field required by the target version is absent
    #[error("missing field {0} required by target encoding")]
    MissingField(&'static str),

    /// Encoder was handed a record of another kind
    #[error("record kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: RecordKind,
        actual: RecordKind,
    },
}

/// Errors from the name resolution collaborator
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Resolver rejected the address string
    #[error("failed to resolve {addr}: {source}")]
    Lookup {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Resolver succeeded but produced no endpoint
    #[error("no endpoint found for {0}")]
    NoEndpoint(String),
}

impl ResolveError {
    /// Create lookup error for address
    pub fn lookup(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Lookup {
            addr: addr.into(),
            source,
        }
    }
}

/// Direction of a codec table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecDirection {
    Decode,
    Encode,
}

impl Display for CodecDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode => f.write_str("decoder"),
            Self::Encode => f.write_str("encoder"),
        }
    }
}

/// Errors from the codec table
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// No codec registered for (kind, version)
    #[error("no {direction} registered for {kind} {version}")]
    Unregistered {
        kind: RecordKind,
        version: SchemaVersion,
        direction: CodecDirection,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_error_display() {
        let err = DecodeError::eof("network", 4, 1);
        assert_eq!(
            err.to_string(),
            "unexpected end of input reading network: needed 4 bytes, 1 remaining"
        );
    }

    #[test]
    fn resolve_error_converts_into_decode_error() {
        let err: DecodeError = ResolveError::NoEndpoint("nowhere:1".to_string()).into();
        assert!(matches!(err, DecodeError::Resolve(ResolveError::NoEndpoint(_))));
    }

    #[test]
    fn codec_error_display() {
        let err = CodecError::Unregistered {
            kind: RecordKind::LinkNode,
            version: SchemaVersion::V1,
            direction: CodecDirection::Decode,
        };
        assert_eq!(err.to_string(), "no decoder registered for link-node v1");
    }
}

//! Error types for migrations
//!
//! A migration stops at the first failure and returns it with its variant
//! intact; the enclosing transaction then discards every write.

use crate::state::RunState;
use chandb_chain::LookupError;
use chandb_store::StoreError;
use chandb_wire::{CodecError, DecodeError, EncodeError};
use std::path::PathBuf;

/// Errors raised while migrating a bucket or the whole store
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Target bucket is absent; nothing was read or written
    #[error("bucket {0} does not exist")]
    MissingBucket(String),

    /// Stored bytes do not match the source version
    #[error("failed to decode record {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },

    /// External enrichment failed
    #[error("failed to enrich record {key}: {source}")]
    Enrich {
        key: String,
        #[source]
        source: LookupError,
    },

    /// Record cannot be written in the target version
    #[error("failed to encode record {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: EncodeError,
    },

    /// Read or write through the transaction failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No codec for the requested kind and version
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Stored version is newer than every known migration
    #[error("stored version {stored} is newer than latest known version {latest}")]
    UnknownVersion { stored: u32, latest: u32 },

    /// Version marker is not a 4-byte value
    #[error("version marker must be 4 bytes, found {0}")]
    InvalidVersionMarker(usize),

    /// Runner attempted a transition its state machine forbids
    #[error("illegal runner transition {from:?} -> {to:?}")]
    IllegalTransition { from: RunState, to: RunState },
}

impl MigrationError {
    /// Check if the failure happened before any record was touched
    #[inline]
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::MissingBucket(_) | Self::UnknownVersion { .. })
    }

    /// Hex key of the record that failed, when the failure is per record
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Decode { key, .. } | Self::Enrich { key, .. } | Self::Encode { key, .. } => {
                Some(key)
            }
            _ => None,
        }
    }
}

/// Errors loading a [`MigrateConfig`](crate::MigrateConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parse but are unusable
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_bucket_is_precondition() {
        let err = MigrationError::MissingBucket("nib".to_string());
        assert!(err.is_precondition());
        assert_eq!(err.key(), None);
        assert_eq!(err.to_string(), "bucket nib does not exist");
    }

    #[test]
    fn decode_failure_carries_key() {
        let err = MigrationError::Decode {
            key: "0a0b".to_string(),
            source: DecodeError::TrailingBytes(3),
        };
        assert!(!err.is_precondition());
        assert_eq!(err.key(), Some("0a0b"));
    }
}

//! Error types for the key-value seam

use std::path::PathBuf;

/// Errors raised by a key-value transaction or snapshot I/O
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Bucket does not exist in this transaction
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    /// Write attempted through a read-only transaction
    #[error("transaction is read-only")]
    ReadOnly,

    /// Empty keys are not addressable
    #[error("key required")]
    KeyRequired,

    /// Failure reported by the underlying engine
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Failure reported by the redb database file
    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    /// IO error reading or writing a snapshot
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot JSON is malformed
    #[error("snapshot format error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Snapshot field is not valid hex
    #[error("invalid hex in snapshot {what}: {source}")]
    InvalidHex {
        what: &'static str,
        #[source]
        source: hex::FromHexError,
    },
}

impl StoreError {
    /// Create bucket-not-found error from a raw bucket name
    pub fn bucket_not_found(name: &[u8]) -> Self {
        Self::BucketNotFound(String::from_utf8_lossy(name).into_owned())
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

macro_rules! from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StoreError {
                fn from(err: $ty) -> Self {
                    Self::Redb(err.into())
                }
            }
        )*
    };
}

from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_not_found_display() {
        let err = StoreError::bucket_not_found(b"nib");
        assert_eq!(err.to_string(), "bucket not found: nib");
    }
}

//! Store-wide version marker
//!
//! A single u32 (big-endian) under `metadata/version`. Stores written before
//! the marker existed have neither bucket nor key and read as version 0.

use crate::error::MigrationError;
use chandb_store::KvTx;

pub const METADATA_BUCKET: &[u8] = b"metadata";
pub const VERSION_KEY: &[u8] = b"version";

/// Read the stored version
///
/// # Errors
/// Returns [`MigrationError::InvalidVersionMarker`] if the value is not 4 bytes
pub fn read_version<T: KvTx + ?Sized>(tx: &T) -> Result<u32, MigrationError> {
    if !tx.bucket_exists(METADATA_BUCKET)? {
        return Ok(0);
    }
    match tx.get(METADATA_BUCKET, VERSION_KEY)? {
        None => Ok(0),
        Some(bytes) => {
            let raw: [u8; 4] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| MigrationError::InvalidVersionMarker(bytes.len()))?;
            Ok(u32::from_be_bytes(raw))
        }
    }
}

/// Store a new version, creating the metadata bucket if needed
///
/// # Errors
/// Store failures
pub fn write_version<T: KvTx + ?Sized>(tx: &mut T, version: u32) -> Result<(), MigrationError> {
    tx.create_bucket(METADATA_BUCKET)?;
    tx.put(METADATA_BUCKET, VERSION_KEY, &version.to_be_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chandb_store::MemoryStore;

    #[test]
    fn absent_marker_is_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.view(|tx| read_version(tx)).unwrap(), 0);
    }

    #[test]
    fn marker_is_big_endian() {
        let store = MemoryStore::new();
        store.update(|tx| write_version(tx, 2)).unwrap();
        store.view(|tx| {
            assert_eq!(tx.get(METADATA_BUCKET, VERSION_KEY).unwrap(), Some(vec![0, 0, 0, 2]));
            assert_eq!(read_version(tx).unwrap(), 2);
        });
    }

    #[test]
    fn short_marker_rejected() {
        let store = MemoryStore::new();
        store
            .update(|tx| {
                tx.create_bucket(METADATA_BUCKET)?;
                tx.put(METADATA_BUCKET, VERSION_KEY, &[1, 2])
            })
            .unwrap();
        let err = store.view(|tx| read_version(tx)).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidVersionMarker(2)));
    }
}

//! JSON snapshots of store contents
//!
//! Bucket names, keys and values are hex strings so arbitrary bytes survive
//! the trip through JSON. A `null` value is a nil placeholder.

use crate::error::StoreError;
use crate::memory::{BucketMap, Buckets};
use crate::tx::KvStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Serializable image of every bucket in a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// bucket hex → key hex → value hex
    pub buckets: BTreeMap<String, BTreeMap<String, Option<String>>>,
}

impl StoreSnapshot {
    /// Create empty snapshot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a value
    pub fn insert(&mut self, bucket: &[u8], key: &[u8], value: Option<&[u8]>) {
        self.buckets
            .entry(hex::encode(bucket))
            .or_default()
            .insert(hex::encode(key), value.map(hex::encode));
    }

    /// Image of every bucket of `store` in committed state
    ///
    /// # Errors
    /// Returns engine failures
    pub fn capture<S: KvStore>(store: &S) -> Result<Self, StoreError> {
        store.view(|tx| {
            let mut snapshot = Self::new();
            for bucket in tx.buckets()? {
                snapshot.buckets.entry(hex::encode(&bucket)).or_default();
                for (key, value) in tx.entries(&bucket)? {
                    snapshot.insert(&bucket, &key, value.as_deref());
                }
            }
            Ok(snapshot)
        })
    }

    /// Write every bucket of this snapshot into `store` in one transaction
    ///
    /// Existing keys are overwritten; other contents are kept.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidHex`] or engine failures; nothing is
    /// written on error
    pub fn restore<S: KvStore>(&self, store: &S) -> Result<(), StoreError> {
        let buckets = self.to_buckets()?;
        store.update(|tx| {
            for (name, entries) in &buckets {
                tx.create_bucket(name)?;
                for (key, value) in entries {
                    match value {
                        Some(value) => tx.put(name, key, value)?,
                        None => tx.put_nil(name, key)?,
                    }
                }
            }
            Ok(())
        })
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns [`StoreError::Snapshot`] on malformed JSON
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    /// Returns [`StoreError::Snapshot`] if serialization fails
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read snapshot file
    ///
    /// # Errors
    /// Returns error on IO failure or malformed JSON
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| StoreError::io_error(path, e))?;
        Self::from_json(&json)
    }

    /// Write snapshot file
    ///
    /// The JSON goes to a temporary file in the target directory which then
    /// replaces `path`, so readers see either the old file or the new one.
    ///
    /// # Errors
    /// Returns error on IO failure; `path` is left untouched
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io_error(dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io_error(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| StoreError::io_error(path, e.error))?;
        Ok(())
    }

    pub(crate) fn from_buckets(buckets: &Buckets) -> Self {
        let mut snapshot = Self::new();
        for (name, map) in buckets {
            let entries = snapshot.buckets.entry(hex::encode(name)).or_default();
            for (key, value) in map {
                entries.insert(hex::encode(key), value.as_ref().map(hex::encode));
            }
        }
        snapshot
    }

    pub(crate) fn to_buckets(&self) -> Result<Buckets, StoreError> {
        let mut buckets = Buckets::new();
        for (name, entries) in &self.buckets {
            let mut map = BucketMap::new();
            for (key, value) in entries {
                let value = value
                    .as_deref()
                    .map(hex::decode)
                    .transpose()
                    .map_err(|source| StoreError::InvalidHex { what: "value", source })?;
                map.insert(decode_hex("key", key)?, value);
            }
            buckets.insert(decode_hex("bucket", name)?, map);
        }
        Ok(buckets)
    }
}

fn decode_hex(what: &'static str, s: &str) -> Result<Vec<u8>, StoreError> {
    hex::decode(s).map_err(|source| StoreError::InvalidHex { what, source })
}

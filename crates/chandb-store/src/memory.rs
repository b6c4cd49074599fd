//! In-memory transactional engine
//!
//! [`MemoryStore`] keeps buckets as ordered maps. A write transaction works
//! on a private copy of the committed state and replaces it only when the
//! closure returns `Ok`; any `Err` drops the copy, discarding every staged
//! put. Writers are serialized, so no other writer interleaves with a
//! running migration.

use crate::error::StoreError;
use crate::snapshot::StoreSnapshot;
use crate::tx::{Entry, KvStore, KvTx};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

pub(crate) type BucketMap = BTreeMap<Vec<u8>, Option<Vec<u8>>>;
pub(crate) type Buckets = BTreeMap<Vec<u8>, BucketMap>;

/// Ordered in-memory key-value store with all-or-nothing write transactions
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<Buckets>,
    writer: Mutex<()>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store holding the contents of a snapshot
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidHex`] if the snapshot is not valid hex
    pub fn from_snapshot(snapshot: &StoreSnapshot) -> Result<Self, StoreError> {
        Ok(Self {
            state: RwLock::new(snapshot.to_buckets()?),
            writer: Mutex::new(()),
        })
    }

    /// Capture committed state
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::from_buckets(&self.state.read())
    }

    /// Run `f` in an exclusive read-write transaction
    ///
    /// Commits when `f` returns `Ok`, discards every write when it returns
    /// `Err`. The error is returned unchanged.
    ///
    /// # Errors
    /// Whatever `f` returns
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut MemoryTx) -> Result<T, E>,
    {
        let _writer = self.writer.lock();
        let mut tx = MemoryTx::begin(self.state.read().clone(), true);
        match f(&mut tx) {
            Ok(out) => {
                let puts = tx.puts.len();
                *self.state.write() = tx.buckets;
                tracing::debug!(puts, "transaction committed");
                Ok(out)
            }
            Err(err) => {
                tracing::debug!(discarded = tx.puts.len(), "transaction rolled back");
                Err(err)
            }
        }
    }

    /// Run `f` against a read-only view of committed state
    pub fn view<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&MemoryTx) -> T,
    {
        let tx = MemoryTx::begin(self.state.read().clone(), false);
        f(&tx)
    }

    /// Number of buckets in committed state
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.state.read().len()
    }
}

/// Transaction over a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryTx {
    buckets: Buckets,
    puts: Vec<(Vec<u8>, Vec<u8>)>,
    writable: bool,
}

impl MemoryTx {
    fn begin(buckets: Buckets, writable: bool) -> Self {
        Self {
            buckets,
            puts: Vec::new(),
            writable,
        }
    }

    /// `(bucket, key)` of every put staged so far, in order
    #[must_use]
    pub fn puts(&self) -> &[(Vec<u8>, Vec<u8>)] {
        &self.puts
    }

    fn bucket(&self, bucket: &[u8]) -> Result<&BucketMap, StoreError> {
        self.buckets
            .get(bucket)
            .ok_or_else(|| StoreError::bucket_not_found(bucket))
    }

    fn stage(&mut self, bucket: &[u8], key: &[u8], value: Option<Vec<u8>>) -> Result<(), StoreError> {
        if !self.writable {
            return Err(StoreError::ReadOnly);
        }
        if key.is_empty() {
            return Err(StoreError::KeyRequired);
        }
        let map = self
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::bucket_not_found(bucket))?;
        map.insert(key.to_vec(), value);
        self.puts.push((bucket.to_vec(), key.to_vec()));
        Ok(())
    }
}

impl KvStore for MemoryStore {
    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn KvTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        MemoryStore::update(self, |tx| f(tx))
    }

    fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn KvTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        MemoryStore::view(self, |tx| f(tx))
    }
}

impl KvTx for MemoryTx {
    fn bucket_exists(&self, bucket: &[u8]) -> Result<bool, StoreError> {
        Ok(self.buckets.contains_key(bucket))
    }

    fn buckets(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.buckets.keys().cloned().collect())
    }

    fn create_bucket(&mut self, bucket: &[u8]) -> Result<(), StoreError> {
        if !self.writable {
            return Err(StoreError::ReadOnly);
        }
        self.buckets.entry(bucket.to_vec()).or_default();
        Ok(())
    }

    fn entries(&self, bucket: &[u8]) -> Result<Vec<Entry>, StoreError> {
        Ok(self
            .bucket(bucket)?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.bucket(bucket)?.get(key).cloned().flatten())
    }

    fn put(&mut self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.stage(bucket, key, Some(value.to_vec()))
    }

    fn put_nil(&mut self, bucket: &[u8], key: &[u8]) -> Result<(), StoreError> {
        self.stage(bucket, key, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .update(|tx| {
                tx.create_bucket(b"b")?;
                tx.put(b"b", b"k2", b"two")?;
                tx.put(b"b", b"k1", b"one")?;
                tx.put_nil(b"b", b"k3")
            })
            .unwrap();
        store
    }

    #[test]
    fn entries_are_key_ordered() {
        let store = seeded();
        let keys: Vec<Vec<u8>> = store.view(|tx| {
            tx.entries(b"b").unwrap().into_iter().map(|(k, _)| k).collect()
        });
        assert_eq!(keys, vec![b"k1".to_vec(), b"k2".to_vec(), b"k3".to_vec()]);
    }

    #[test]
    fn nil_values_read_as_none() {
        let store = seeded();
        store.view(|tx| {
            assert_eq!(tx.get(b"b", b"k3").unwrap(), None);
            assert_eq!(tx.entries(b"b").unwrap()[2].1, None);
        });
    }

    #[test]
    fn error_discards_all_writes() {
        let store = seeded();
        let result: Result<(), StoreError> = store.update(|tx| {
            tx.put(b"b", b"k1", b"changed")?;
            tx.put(b"b", b"k9", b"new")?;
            assert_eq!(tx.puts().len(), 2);
            Err(StoreError::Backend("boom".to_string()))
        });
        assert!(result.is_err());

        store.view(|tx| {
            assert_eq!(tx.get(b"b", b"k1").unwrap(), Some(b"one".to_vec()));
            assert_eq!(tx.get(b"b", b"k9").unwrap(), None);
        });
    }

    #[test]
    fn missing_bucket_is_an_error() {
        let store = MemoryStore::new();
        store.view(|tx| {
            assert!(!tx.bucket_exists(b"nope").unwrap());
            assert!(matches!(tx.entries(b"nope"), Err(StoreError::BucketNotFound(_))));
        });
    }

    #[test]
    fn view_is_read_only() {
        let store = seeded();
        let mut tx = store.view(|tx| MemoryTx::begin(tx.buckets.clone(), tx.writable));
        assert!(matches!(tx.put(b"b", b"k1", b"x"), Err(StoreError::ReadOnly)));
    }

    #[test]
    fn trait_update_rolls_back_on_error() {
        fn write_then_fail<S: KvStore>(store: &S) -> Result<(), StoreError> {
            store.update(|tx| {
                tx.put(b"b", b"k1", b"changed")?;
                Err(StoreError::Backend("boom".to_string()))
            })
        }

        let store = seeded();
        assert!(write_then_fail(&store).is_err());
        let value = KvStore::view(&store, |tx| tx.get(b"b", b"k1")).unwrap();
        assert_eq!(value, Some(b"one".to_vec()));
        assert_eq!(
            KvStore::view(&store, |tx| tx.buckets()).unwrap(),
            vec![b"b".to_vec()]
        );
    }

    #[test]
    fn empty_key_rejected() {
        let store = seeded();
        let result = store.update(|tx| tx.put(b"b", b"", b"x"));
        assert!(matches!(result, Err(StoreError::KeyRequired)));
    }

    #[test]
    fn entries_snapshot_is_stable_across_puts() {
        let store = seeded();
        store
            .update(|tx| {
                let before = tx.entries(b"b")?;
                tx.put(b"b", b"k1", b"rewritten")?;
                assert_eq!(before[0].1.as_deref(), Some(&b"one"[..]));
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }
}

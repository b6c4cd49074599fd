//! Transaction seam
//!
//! [`KvTx`] is the narrow interface migrations run against. Everything a
//! migration writes goes through one `KvTx`; atomic commit or rollback is
//! the engine's job, decided by whoever opened the transaction through
//! [`KvStore`].

use crate::error::StoreError;

/// One key/value pair as stored; `None` marks a nil placeholder value
pub type Entry = (Vec<u8>, Option<Vec<u8>>);

/// Read-write transaction over named buckets
pub trait KvTx {
    /// Check if bucket exists
    ///
    /// # Errors
    /// Returns engine failures
    fn bucket_exists(&self, bucket: &[u8]) -> Result<bool, StoreError>;

    /// Names of every bucket, in byte order
    ///
    /// # Errors
    /// Returns engine failures
    fn buckets(&self) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Create bucket if missing
    ///
    /// # Errors
    /// Returns [`StoreError::ReadOnly`] from read-only transactions
    fn create_bucket(&mut self, bucket: &[u8]) -> Result<(), StoreError>;

    /// Every pair of the bucket, in the engine's native (key) order
    ///
    /// The returned list is a view as of the call; later puts in the same
    /// transaction do not alter it.
    ///
    /// # Errors
    /// Returns [`StoreError::BucketNotFound`] if the bucket is absent
    fn entries(&self, bucket: &[u8]) -> Result<Vec<Entry>, StoreError>;

    /// Value under key, `None` if absent or nil
    ///
    /// # Errors
    /// Returns [`StoreError::BucketNotFound`] if the bucket is absent
    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Overwrite the value under key
    ///
    /// # Errors
    /// Returns [`StoreError::BucketNotFound`] if the bucket is absent,
    /// [`StoreError::KeyRequired`] for empty keys
    fn put(&mut self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Store a nil placeholder under key
    ///
    /// # Errors
    /// Same as [`KvTx::put`]
    fn put_nil(&mut self, bucket: &[u8], key: &[u8]) -> Result<(), StoreError>;
}

/// Engine that hands out closure-scoped transactions
pub trait KvStore {
    /// Run `f` in an exclusive read-write transaction
    ///
    /// Commits when `f` returns `Ok`. Any `Err` discards every write made
    /// through the transaction and is returned unchanged.
    ///
    /// # Errors
    /// Whatever `f` returns, or engine failures converted into `E`
    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn KvTx) -> Result<T, E>,
        E: From<StoreError>;

    /// Run `f` against a read-only view of committed state
    ///
    /// # Errors
    /// Whatever `f` returns, or engine failures converted into `E`
    fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn KvTx) -> Result<T, E>,
        E: From<StoreError>;
}

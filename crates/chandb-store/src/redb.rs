//! File-backed engine on redb
//!
//! Each bucket is a redb table named by the hex of the bucket name. Stored
//! values carry a one-byte tag so nil placeholders survive the trip: `0` is
//! nil, `1` precedes the value bytes.

use crate::error::StoreError;
use crate::tx::{Entry, KvStore, KvTx};
use ::redb::{
    Database, ReadTransaction, ReadableTable, TableDefinition, TableHandle, WriteTransaction,
};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const NIL_TAG: u8 = 0;
const VALUE_TAG: u8 = 1;

type BucketTable<'a> = TableDefinition<'a, &'static [u8], &'static [u8]>;

fn table_name(bucket: &[u8]) -> String {
    hex::encode(bucket)
}

fn definition(name: &str) -> BucketTable<'_> {
    TableDefinition::new(name)
}

fn has_table<H: TableHandle>(mut tables: impl Iterator<Item = H>, name: &str) -> bool {
    tables.any(|t| t.name() == name)
}

fn bucket_names<H: TableHandle>(tables: impl Iterator<Item = H>) -> Result<Vec<Vec<u8>>, StoreError> {
    let mut names = tables
        .map(|t| hex::decode(t.name()).map_err(|source| StoreError::InvalidHex { what: "bucket", source }))
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();
    Ok(names)
}

fn tag_value(value: Option<&[u8]>) -> Vec<u8> {
    match value {
        None => vec![NIL_TAG],
        Some(bytes) => {
            let mut tagged = Vec::with_capacity(bytes.len() + 1);
            tagged.push(VALUE_TAG);
            tagged.extend_from_slice(bytes);
            tagged
        }
    }
}

fn untag_value(raw: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
    match raw.split_first() {
        Some((&NIL_TAG, [])) => Ok(None),
        Some((&VALUE_TAG, bytes)) => Ok(Some(bytes.to_vec())),
        _ => Err(StoreError::Backend(format!(
            "malformed stored value: {}",
            hex::encode(raw)
        ))),
    }
}

fn read_entries<T: ReadableTable<&'static [u8], &'static [u8]>>(table: &T) -> Result<Vec<Entry>, StoreError> {
    let mut entries = Vec::new();
    for item in table.iter()? {
        let (key, value) = item?;
        entries.push((key.value().to_vec(), untag_value(value.value())?));
    }
    Ok(entries)
}

fn read_value<T: ReadableTable<&'static [u8], &'static [u8]>>(
    table: &T,
    key: &[u8],
) -> Result<Option<Vec<u8>>, StoreError> {
    match table.get(key)? {
        Some(value) => untag_value(value.value()),
        None => Ok(None),
    }
}

/// Channel database file
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbStore").field("path", &self.path).finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open the database at `path`, creating an empty one if missing
    ///
    /// # Errors
    /// Returns [`StoreError::Redb`] if the file cannot be opened or is locked
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = Database::create(path)?;
        debug!(path = %path.display(), "database created");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing database
    ///
    /// # Errors
    /// Returns [`StoreError::Redb`] if the file is missing, locked or not a
    /// database
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = Database::open(path)?;
        debug!(path = %path.display(), "database opened");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }
}

impl KvStore for RedbStore {
    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn KvTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut tx = RedbWriteTx {
            txn: self.db.begin_write().map_err(StoreError::from)?,
        };
        match f(&mut tx) {
            Ok(out) => {
                tx.txn.commit().map_err(StoreError::from)?;
                debug!(path = %self.path.display(), "transaction committed");
                Ok(out)
            }
            Err(err) => {
                if let Err(abort) = tx.txn.abort() {
                    warn!(path = %self.path.display(), error = %abort, "abort failed");
                }
                debug!(path = %self.path.display(), "transaction rolled back");
                Err(err)
            }
        }
    }

    fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn KvTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let tx = RedbReadTx {
            txn: self.db.begin_read().map_err(StoreError::from)?,
        };
        f(&tx)
    }
}

struct RedbWriteTx {
    txn: WriteTransaction,
}

impl RedbWriteTx {
    // Opening a table in a write transaction creates it, so existence is
    // checked first.
    fn existing(&self, bucket: &[u8]) -> Result<String, StoreError> {
        let name = table_name(bucket);
        if has_table(self.txn.list_tables()?, &name) {
            Ok(name)
        } else {
            Err(StoreError::bucket_not_found(bucket))
        }
    }

    fn stage(&mut self, bucket: &[u8], key: &[u8], value: Option<&[u8]>) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::KeyRequired);
        }
        let name = self.existing(bucket)?;
        let mut table = self.txn.open_table(definition(&name))?;
        table.insert(key, tag_value(value).as_slice())?;
        Ok(())
    }
}

impl KvTx for RedbWriteTx {
    fn bucket_exists(&self, bucket: &[u8]) -> Result<bool, StoreError> {
        Ok(has_table(self.txn.list_tables()?, &table_name(bucket)))
    }

    fn buckets(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        bucket_names(self.txn.list_tables()?)
    }

    fn create_bucket(&mut self, bucket: &[u8]) -> Result<(), StoreError> {
        let name = table_name(bucket);
        self.txn.open_table(definition(&name))?;
        Ok(())
    }

    fn entries(&self, bucket: &[u8]) -> Result<Vec<Entry>, StoreError> {
        let name = self.existing(bucket)?;
        read_entries(&self.txn.open_table(definition(&name))?)
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let name = self.existing(bucket)?;
        read_value(&self.txn.open_table(definition(&name))?, key)
    }

    fn put(&mut self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.stage(bucket, key, Some(value))
    }

    fn put_nil(&mut self, bucket: &[u8], key: &[u8]) -> Result<(), StoreError> {
        self.stage(bucket, key, None)
    }
}

struct RedbReadTx {
    txn: ReadTransaction,
}

impl RedbReadTx {
    fn existing(&self, bucket: &[u8]) -> Result<String, StoreError> {
        let name = table_name(bucket);
        if has_table(self.txn.list_tables()?, &name) {
            Ok(name)
        } else {
            Err(StoreError::bucket_not_found(bucket))
        }
    }
}

impl KvTx for RedbReadTx {
    fn bucket_exists(&self, bucket: &[u8]) -> Result<bool, StoreError> {
        Ok(has_table(self.txn.list_tables()?, &table_name(bucket)))
    }

    fn buckets(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        bucket_names(self.txn.list_tables()?)
    }

    fn create_bucket(&mut self, _bucket: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn entries(&self, bucket: &[u8]) -> Result<Vec<Entry>, StoreError> {
        let name = self.existing(bucket)?;
        read_entries(&self.txn.open_table(definition(&name))?)
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let name = self.existing(bucket)?;
        read_value(&self.txn.open_table(definition(&name))?, key)
    }

    fn put(&mut self, _bucket: &[u8], _key: &[u8], _value: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn put_nil(&mut self, _bucket: &[u8], _key: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seeded(path: &Path) -> RedbStore {
        let store = RedbStore::create(path).unwrap();
        store
            .update(|tx| {
                tx.create_bucket(b"b")?;
                tx.put(b"b", b"k2", b"two")?;
                tx.put(b"b", b"k1", b"one")?;
                tx.put_nil(b"b", b"k3")?;
                tx.put(b"b", b"k4", b"")
            })
            .unwrap();
        store
    }

    #[test]
    fn entries_are_key_ordered_with_nil_and_empty_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded(&dir.path().join("chan.db"));

        let entries = store.view(|tx| tx.entries(b"b")).unwrap();

        assert_eq!(entries, vec![
            (b"k1".to_vec(), Some(b"one".to_vec())),
            (b"k2".to_vec(), Some(b"two".to_vec())),
            (b"k3".to_vec(), None),
            (b"k4".to_vec(), Some(Vec::new())),
        ]);
    }

    #[test]
    fn error_discards_all_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded(&dir.path().join("chan.db"));

        let result: Result<(), StoreError> = store.update(|tx| {
            tx.put(b"b", b"k1", b"changed")?;
            tx.create_bucket(b"fresh")?;
            Err(StoreError::Backend("boom".to_string()))
        });
        assert!(result.is_err());

        store
            .view(|tx| {
                assert_eq!(tx.get(b"b", b"k1")?, Some(b"one".to_vec()));
                assert!(!tx.bucket_exists(b"fresh")?);
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    #[test]
    fn commits_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chan.db");
        drop(seeded(&path));

        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.view(|tx| tx.buckets()).unwrap(), vec![b"b".to_vec()]);
        assert_eq!(store.view(|tx| tx.get(b"b", b"k2")).unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn missing_bucket_is_not_created_by_reads() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::create(dir.path().join("chan.db")).unwrap();

        let result: Result<(), StoreError> = store.update(|tx| {
            assert!(!tx.bucket_exists(b"nib")?);
            assert!(matches!(tx.entries(b"nib"), Err(StoreError::BucketNotFound(_))));
            assert!(matches!(tx.put(b"nib", b"k", b"v"), Err(StoreError::BucketNotFound(_))));
            Ok(())
        });
        result.unwrap();

        assert!(store.view(|tx| tx.buckets()).unwrap().is_empty());
    }

    #[test]
    fn view_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded(&dir.path().join("chan.db"));
        let mut tx = RedbReadTx {
            txn: store.db.begin_read().unwrap(),
        };

        assert!(matches!(tx.put(b"b", b"k1", b"x"), Err(StoreError::ReadOnly)));
        assert!(matches!(tx.create_bucket(b"other"), Err(StoreError::ReadOnly)));
        assert_eq!(tx.get(b"b", b"k1").unwrap(), Some(b"one".to_vec()));
    }

    #[test]
    fn empty_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded(&dir.path().join("chan.db"));
        let result = store.update(|tx| tx.put(b"b", b"", b"x"));
        assert!(matches!(result, Err(StoreError::KeyRequired)));
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = RedbStore::open(dir.path().join("absent.db")).unwrap_err();
        assert!(matches!(err, StoreError::Redb(_)));
    }

    #[test]
    fn unknown_value_tag_rejected() {
        assert!(matches!(untag_value(&[7, 1]), Err(StoreError::Backend(_))));
        assert!(matches!(untag_value(&[]), Err(StoreError::Backend(_))));
        assert!(matches!(untag_value(&[NIL_TAG, 1]), Err(StoreError::Backend(_))));
    }
}

//! chandb store seam
//!
//! The key-value transaction engine migrations run inside.
//!
//! # Core Concepts
//!
//! - [`KvTx`]: bucket lookup, ordered iteration and in-place put, scoped to
//!   one transaction
//! - [`KvStore`]: closure-scoped `update`/`view` transactions over an engine
//! - [`RedbStore`]: the database file, one redb table per bucket
//! - [`MemoryStore`]: ordered in-memory engine for dry runs and tests
//! - [`StoreSnapshot`]: hex-encoded JSON image of a store

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod memory;
mod redb;
mod snapshot;
mod tx;

pub use crate::redb::RedbStore;
pub use error::StoreError;
pub use memory::{MemoryStore, MemoryTx};
pub use snapshot::StoreSnapshot;
pub use tx::{Entry, KvStore, KvTx};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

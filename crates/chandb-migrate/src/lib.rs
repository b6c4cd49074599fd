//! chandb migrations
//!
//! Upgrades stored records between schema versions, one bucket per
//! migration, atomically.
//!
//! # Core Concepts
//!
//! - [`MigrationRunner`]: decode → enrich → encode → write over one bucket
//! - [`Migrator`]: ordered, resumable migration list keyed by a store-wide
//!   version marker
//! - [`Enricher`]: injected step that fills fields the old version lacks
//! - [`RunState`]: validated runner state machine
//!
//! # Example
//!
//! ```rust,ignore
//! use chandb_chain::{ChainApiConfig, HttpChannelLookup};
//! use chandb_migrate::Migrator;
//! use chandb_store::RedbStore;
//! use std::sync::Arc;
//!
//! let store = RedbStore::open("channel.db")?;
//! let lookup = HttpChannelLookup::new(ChainApiConfig::default())?;
//! let reports = Migrator::new(Arc::new(lookup)).run(&store)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod enrich;
mod error;
mod migrator;
mod runner;

pub mod state;
pub mod version;

pub use config::{ChainApiSection, MigrateConfig};
pub use enrich::{Enricher, ShortChanIdEnricher};
pub use error::{ConfigError, MigrationError};
pub use chandb_wire::{CLOSED_CHANNEL_BUCKET, LINK_NODE_BUCKET};
pub use migrator::{pending_migrations, Migration, MigrationReport, Migrator, MIGRATIONS};
pub use runner::{BucketMigration, BucketReport, MigrationRunner};
pub use state::RunState;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Ordered migration registry
//!
//! Each [`Migration`] bumps the store version by one. [`Migrator::run`]
//! applies every migration above the stored marker, each in its own write
//! transaction together with its marker bump, so an interrupted run resumes
//! at the first migration that did not commit.

use crate::enrich::{Enricher, ShortChanIdEnricher};
use crate::error::MigrationError;
use crate::runner::{BucketMigration, BucketReport, MigrationRunner};
use crate::version::{read_version, write_version};
use chandb_chain::ChannelLookup;
use chandb_store::{KvStore, KvTx};
use chandb_wire::{AddressResolver, CodecTable, DecodeContext, RecordKind, SchemaVersion, SystemResolver};
use std::sync::Arc;
use tracing::info;

/// One step of the store's schema history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    /// Store version after this migration commits
    pub version: u32,
    pub name: &'static str,
    pub bucket: &'static [u8],
    pub kind: RecordKind,
    pub from: SchemaVersion,
    pub to: SchemaVersion,
    /// Whether records need a short channel id lookup
    pub enrich: bool,
}

impl Migration {
    #[must_use]
    pub fn plan(&self) -> BucketMigration<'static> {
        BucketMigration::new(self.bucket, self.kind, self.from, self.to)
    }
}

/// Every known migration, in version order
pub const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        name: "link-node-addresses",
        bucket: RecordKind::LinkNode.bucket(),
        kind: RecordKind::LinkNode,
        from: SchemaVersion::V0,
        to: SchemaVersion::V1,
        enrich: false,
    },
    Migration {
        version: 2,
        name: "close-summary-short-chan-id",
        bucket: RecordKind::CloseSummary.bucket(),
        kind: RecordKind::CloseSummary,
        from: SchemaVersion::V0,
        to: SchemaVersion::V1,
        enrich: true,
    },
];

/// Migrations of `migrations` above version `current`
///
/// # Errors
/// Returns [`MigrationError::UnknownVersion`] if `current` is above the last
/// listed version
pub fn pending_migrations(migrations: &[Migration], current: u32) -> Result<Vec<Migration>, MigrationError> {
    let latest = migrations.last().map_or(0, |m| m.version);
    if current > latest {
        return Err(MigrationError::UnknownVersion {
            stored: current,
            latest,
        });
    }
    Ok(migrations
        .iter()
        .filter(|m| m.version > current)
        .copied()
        .collect())
}

/// Result of one committed migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub version: u32,
    pub name: &'static str,
    pub bucket: BucketReport,
}

/// Applies pending migrations to a store
#[derive(Debug, Clone)]
pub struct Migrator {
    migrations: Vec<Migration>,
    codecs: CodecTable,
    resolver: Arc<dyn AddressResolver>,
    lookup: Arc<dyn ChannelLookup>,
}

impl Migrator {
    /// Create migrator with the built-in migrations, codecs and system resolver
    #[must_use]
    pub fn new(lookup: Arc<dyn ChannelLookup>) -> Self {
        Self {
            migrations: MIGRATIONS.to_vec(),
            codecs: CodecTable::standard(),
            resolver: Arc::new(SystemResolver),
            lookup,
        }
    }

    /// With address resolver for legacy link nodes
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn AddressResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Version the store reaches once every migration has run
    #[must_use]
    pub fn latest_version(&self) -> u32 {
        self.migrations.last().map_or(0, |m| m.version)
    }

    /// Stored version of `store`
    ///
    /// # Errors
    /// Returns error if the marker is malformed
    pub fn current_version<S: KvStore>(&self, store: &S) -> Result<u32, MigrationError> {
        store.view(|tx| read_version(tx))
    }

    /// Migrations not yet applied to `store`
    ///
    /// # Errors
    /// Returns [`MigrationError::UnknownVersion`] if the store is newer
    /// than this migrator
    pub fn pending<S: KvStore>(&self, store: &S) -> Result<Vec<Migration>, MigrationError> {
        pending_migrations(&self.migrations, self.current_version(store)?)
    }

    /// Apply every pending migration
    ///
    /// Stops at the first failure. Migrations committed before it stay
    /// committed in `store`; the failing one leaves no trace.
    ///
    /// # Errors
    /// The failing migration's error
    pub fn run<S: KvStore>(&self, store: &S) -> Result<Vec<MigrationReport>, MigrationError> {
        let pending = self.pending(store)?;
        if pending.is_empty() {
            info!(version = self.latest_version(), "store is up to date");
            return Ok(Vec::new());
        }

        let mut reports = Vec::with_capacity(pending.len());
        for migration in pending {
            info!(version = migration.version, name = migration.name, "applying migration");
            let report = store.update(|tx| self.apply(tx, &migration))?;
            info!(
                version = migration.version,
                name = migration.name,
                migrated = report.bucket.migrated,
                "migration committed"
            );
            reports.push(report);
        }
        Ok(reports)
    }

    /// Apply one migration and bump the marker through `tx`
    ///
    /// # Errors
    /// Any runner or store failure; the caller must discard `tx`
    pub fn apply<T: KvTx + ?Sized>(
        &self,
        tx: &mut T,
        migration: &Migration,
    ) -> Result<MigrationReport, MigrationError> {
        let enricher = ShortChanIdEnricher::new(self.lookup.as_ref());
        let mut runner = MigrationRunner::new(&self.codecs, DecodeContext::new(self.resolver.as_ref()));
        if migration.enrich {
            runner = runner.with_enricher(&enricher as &dyn Enricher);
        }

        let bucket = runner.run(tx, &migration.plan())?;
        write_version(tx, migration.version)?;
        Ok(MigrationReport {
            version: migration.version,
            name: migration.name,
            bucket,
        })
    }
}

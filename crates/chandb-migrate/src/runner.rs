//! Bucket migration runner
//!
//! Rewrites every record of one bucket from a source schema version to a
//! target version, in place, inside a caller-supplied transaction:
//!
//! ```text
//! Start → Iterating → { Decoding → Enriching? → Encoding → Writing } → Done
//!                              ↘ any failure → Aborted
//! ```
//!
//! The runner never commits. The first failure is returned unchanged and the
//! caller's transaction discards whatever was staged before it.

use crate::enrich::Enricher;
use crate::error::MigrationError;
use crate::state::{validate_transition, RunState};
use chandb_store::KvTx;
use chandb_wire::{CodecTable, DecodeContext, DecodeFn, EncodeFn, RecordKind, SchemaVersion};
use std::fmt::{self, Display, Formatter};
use tracing::{debug, info, warn};

/// Which bucket to rewrite and between which versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketMigration<'a> {
    pub bucket: &'a [u8],
    pub kind: RecordKind,
    pub from: SchemaVersion,
    pub to: SchemaVersion,
}

impl<'a> BucketMigration<'a> {
    #[inline]
    #[must_use]
    pub fn new(bucket: &'a [u8], kind: RecordKind, from: SchemaVersion, to: SchemaVersion) -> Self {
        Self {
            bucket,
            kind,
            from,
            to,
        }
    }

    fn bucket_name(&self) -> String {
        String::from_utf8_lossy(self.bucket).into_owned()
    }
}

/// Outcome of a completed bucket migration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketReport {
    pub bucket: String,
    /// Pairs seen, including skipped ones
    pub visited: usize,
    /// Pairs rewritten
    pub migrated: usize,
    /// Nil or empty values left untouched
    pub skipped: usize,
}

impl Display for BucketReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: visited {}, migrated {}, skipped {}",
            self.bucket, self.visited, self.migrated, self.skipped
        )
    }
}

/// Drives one bucket through decode, optional enrichment, encode and write
#[derive(Debug)]
pub struct MigrationRunner<'a> {
    codecs: &'a CodecTable,
    ctx: DecodeContext<'a>,
    enricher: Option<&'a dyn Enricher>,
    state: RunState,
    history: Vec<RunState>,
}

impl<'a> MigrationRunner<'a> {
    #[must_use]
    pub fn new(codecs: &'a CodecTable, ctx: DecodeContext<'a>) -> Self {
        Self {
            codecs,
            ctx,
            enricher: None,
            state: RunState::Start,
            history: vec![RunState::Start],
        }
    }

    /// With an enrichment step between decode and encode
    #[must_use]
    pub fn with_enricher(mut self, enricher: &'a dyn Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every phase entered so far, starting with `Start`
    #[must_use]
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    /// Migrate every record of `plan.bucket` through `tx`
    ///
    /// # Errors
    /// - [`MigrationError::MissingBucket`] if the bucket is absent
    /// - [`MigrationError::Codec`] if either codec is unregistered
    /// - the first decode, enrich, encode or store failure
    pub fn run<T: KvTx + ?Sized>(
        &mut self,
        tx: &mut T,
        plan: &BucketMigration<'_>,
    ) -> Result<BucketReport, MigrationError> {
        let result = self.run_inner(tx, plan);
        if let Err(err) = &result {
            if !self.state.is_terminal() {
                self.advance(RunState::Aborted)?;
            }
            warn!(
                bucket = %plan.bucket_name(),
                key = err.key().unwrap_or("-"),
                error = %err,
                "bucket migration aborted"
            );
        }
        result
    }

    fn run_inner<T: KvTx + ?Sized>(
        &mut self,
        tx: &mut T,
        plan: &BucketMigration<'_>,
    ) -> Result<BucketReport, MigrationError> {
        if !tx.bucket_exists(plan.bucket)? {
            return Err(MigrationError::MissingBucket(plan.bucket_name()));
        }
        let decode = self.codecs.decoder(plan.kind, plan.from)?;
        let encode = self.codecs.encoder(plan.kind, plan.to)?;

        info!(
            bucket = %plan.bucket_name(),
            kind = %plan.kind,
            from = %plan.from,
            to = %plan.to,
            "migrating bucket"
        );
        self.advance(RunState::Iterating)?;

        let mut report = BucketReport {
            bucket: plan.bucket_name(),
            ..BucketReport::default()
        };

        for (key, value) in tx.entries(plan.bucket)? {
            report.visited += 1;
            let value = match value {
                Some(v) if !v.is_empty() => v,
                _ => {
                    debug!(key = %hex::encode(&key), "skipping empty value");
                    report.skipped += 1;
                    continue;
                }
            };

            let bytes = self.convert(&key, &value, decode, encode)?;

            self.advance(RunState::Writing)?;
            tx.put(plan.bucket, &key, &bytes)?;
            report.migrated += 1;
            self.advance(RunState::Iterating)?;
        }

        self.advance(RunState::Done)?;
        info!(%report, "bucket migrated");
        Ok(report)
    }

    fn convert(
        &mut self,
        key: &[u8],
        value: &[u8],
        decode: DecodeFn,
        encode: EncodeFn,
    ) -> Result<Vec<u8>, MigrationError> {
        let key_hex = || hex::encode(key);

        self.advance(RunState::Decoding)?;
        let mut record = decode(value, &self.ctx).map_err(|source| MigrationError::Decode {
            key: key_hex(),
            source,
        })?;

        if let Some(enricher) = self.enricher {
            self.advance(RunState::Enriching)?;
            record = enricher.enrich(record).map_err(|source| MigrationError::Enrich {
                key: key_hex(),
                source,
            })?;
        }

        self.advance(RunState::Encoding)?;
        let bytes = encode(&record).map_err(|source| MigrationError::Encode {
            key: key_hex(),
            source,
        })?;
        debug!(key = %key_hex(), old_len = value.len(), new_len = bytes.len(), "record converted");
        Ok(bytes)
    }

    fn advance(&mut self, to: RunState) -> Result<(), MigrationError> {
        validate_transition(self.state, to)?;
        self.state = to;
        self.history.push(to);
        Ok(())
    }
}

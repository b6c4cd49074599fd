//! Record enrichment between decode and encode

use chandb_chain::{ChannelLookup, LookupError};
use chandb_wire::Record;
use std::fmt::Debug;

/// Adds data a target version requires but the source version lacks
pub trait Enricher: Debug {
    /// Return the record with the missing fields filled in
    ///
    /// # Errors
    /// Any failure of the external source
    fn enrich(&self, record: Record) -> Result<Record, LookupError>;
}

/// Fills a close summary's short channel id from a [`ChannelLookup`]
///
/// Summaries already carrying an id and records of other kinds pass through
/// without a lookup.
#[derive(Debug, Clone, Copy)]
pub struct ShortChanIdEnricher<'a> {
    lookup: &'a dyn ChannelLookup,
}

impl<'a> ShortChanIdEnricher<'a> {
    #[inline]
    #[must_use]
    pub fn new(lookup: &'a dyn ChannelLookup) -> Self {
        Self { lookup }
    }
}

impl Enricher for ShortChanIdEnricher<'_> {
    fn enrich(&self, record: Record) -> Result<Record, LookupError> {
        match record {
            Record::CloseSummary(mut summary) if summary.short_chan_id.is_none() => {
                let scid = self.lookup.lookup(&summary.chan_point)?;
                tracing::debug!(chan_point = %summary.chan_point, %scid, "enriched close summary");
                summary.short_chan_id = Some(scid);
                Ok(Record::CloseSummary(summary))
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chandb_test_utils::{sample_close_summary, sample_link_node, StubLookup};
    use chandb_wire::ShortChannelId;

    #[test]
    fn fills_missing_short_chan_id() {
        let summary = sample_close_summary(7, 1);
        let lookup = StubLookup::new().with_location(summary.chan_point, 500_000, 12);
        let enricher = ShortChanIdEnricher::new(&lookup);

        let Record::CloseSummary(out) = enricher.enrich(Record::CloseSummary(summary)).unwrap() else {
            panic!("kind changed");
        };
        assert_eq!(out.short_chan_id, Some(ShortChannelId::new(500_000, 12, 1).unwrap()));
        assert_eq!(lookup.calls(), 1);
    }

    #[test]
    fn link_nodes_pass_through() {
        let lookup = StubLookup::new();
        let enricher = ShortChanIdEnricher::new(&lookup);
        let record = Record::LinkNode(sample_link_node());

        assert_eq!(enricher.enrich(record.clone()).unwrap(), record);
        assert_eq!(lookup.calls(), 0);
    }

    #[test]
    fn lookup_failure_is_returned() {
        let summary = sample_close_summary(3, 0);
        let lookup = StubLookup::new().with_remote_failure(summary.chan_point, "unknown tx");
        let enricher = ShortChanIdEnricher::new(&lookup);

        let err = enricher.enrich(Record::CloseSummary(summary)).unwrap_err();
        assert!(matches!(err, LookupError::Remote { .. }));
    }
}

//! Codec table keyed by record kind and schema version
//!
//! Provides [`CodecTable`], which maps `(RecordKind, SchemaVersion)` to a
//! decode function and to an encode function. Migrations look up the pair
//! they need instead of calling per-version functions directly, so the
//! runner stays generic over record kinds.

use crate::close_summary::{self, ChannelCloseSummary};
use crate::error::{CodecDirection, CodecError, DecodeError, EncodeError};
use crate::link_node::{self, LinkNode};
use crate::resolve::AddressResolver;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// Bucket holding peer link records
pub const LINK_NODE_BUCKET: &[u8] = b"nib";

/// Bucket holding channel close summaries
pub const CLOSED_CHANNEL_BUCKET: &[u8] = b"closed-chan-bucket";

/// Record families stored in the channel database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Peer link records
    LinkNode,
    /// Channel close summaries
    CloseSummary,
}

impl RecordKind {
    /// Bucket the records of this kind live in
    #[inline]
    #[must_use]
    pub const fn bucket(self) -> &'static [u8] {
        match self {
            Self::LinkNode => LINK_NODE_BUCKET,
            Self::CloseSummary => CLOSED_CHANNEL_BUCKET,
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkNode => f.write_str("link-node"),
            Self::CloseSummary => f.write_str("close-summary"),
        }
    }
}

/// On-disk encoding version of a record kind
///
/// Versions are per kind: v1 of link nodes is unrelated to v1 of close
/// summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion(pub u16);

impl SchemaVersion {
    pub const V0: Self = Self(0);
    pub const V1: Self = Self(1);
}

impl Display for SchemaVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A decoded record of any kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    LinkNode(LinkNode),
    CloseSummary(ChannelCloseSummary),
}

impl Record {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::LinkNode(_) => RecordKind::LinkNode,
            Self::CloseSummary(_) => RecordKind::CloseSummary,
        }
    }
}

/// Collaborators a decoder may need
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub resolver: &'a dyn AddressResolver,
}

impl<'a> DecodeContext<'a> {
    #[inline]
    #[must_use]
    pub fn new(resolver: &'a dyn AddressResolver) -> Self {
        Self { resolver }
    }
}

/// Decode stored bytes of one (kind, version)
pub type DecodeFn = fn(&[u8], &DecodeContext<'_>) -> Result<Record, DecodeError>;

/// Encode a record into one (kind, version)
pub type EncodeFn = fn(&Record) -> Result<Vec<u8>, EncodeError>;

/// Registry of per-version codecs
#[derive(Debug, Default, Clone)]
pub struct CodecTable {
    decoders: HashMap<(RecordKind, SchemaVersion), DecodeFn>,
    encoders: HashMap<(RecordKind, SchemaVersion), EncodeFn>,
}

impl CodecTable {
    /// Create new empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create table with every built-in codec
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register_decoder(RecordKind::LinkNode, SchemaVersion::V0, decode_link_node_v0);
        table.register_encoder(RecordKind::LinkNode, SchemaVersion::V0, encode_link_node_v0);
        table.register_decoder(RecordKind::LinkNode, SchemaVersion::V1, decode_link_node_v1);
        table.register_encoder(RecordKind::LinkNode, SchemaVersion::V1, encode_link_node_v1);
        table.register_decoder(RecordKind::CloseSummary, SchemaVersion::V0, decode_close_summary_v0);
        table.register_encoder(RecordKind::CloseSummary, SchemaVersion::V0, encode_close_summary_v0);
        table.register_decoder(RecordKind::CloseSummary, SchemaVersion::V1, decode_close_summary_v1);
        table.register_encoder(RecordKind::CloseSummary, SchemaVersion::V1, encode_close_summary_v1);
        table
    }

    /// Register (or replace) a decoder
    pub fn register_decoder(&mut self, kind: RecordKind, version: SchemaVersion, f: DecodeFn) {
        self.decoders.insert((kind, version), f);
    }

    /// Register (or replace) an encoder
    pub fn register_encoder(&mut self, kind: RecordKind, version: SchemaVersion, f: EncodeFn) {
        self.encoders.insert((kind, version), f);
    }

    /// Look up a decoder
    ///
    /// # Errors
    /// Returns [`CodecError::Unregistered`] if none is registered
    pub fn decoder(&self, kind: RecordKind, version: SchemaVersion) -> Result<DecodeFn, CodecError> {
        self.decoders
            .get(&(kind, version))
            .copied()
            .ok_or(CodecError::Unregistered {
                kind,
                version,
                direction: CodecDirection::Decode,
            })
    }

    /// Look up an encoder
    ///
    /// # Errors
    /// Returns [`CodecError::Unregistered`] if none is registered
    pub fn encoder(&self, kind: RecordKind, version: SchemaVersion) -> Result<EncodeFn, CodecError> {
        self.encoders
            .get(&(kind, version))
            .copied()
            .ok_or(CodecError::Unregistered {
                kind,
                version,
                direction: CodecDirection::Encode,
            })
    }

    /// Check if both directions exist for (kind, version)
    #[must_use]
    pub fn supports(&self, kind: RecordKind, version: SchemaVersion) -> bool {
        self.decoders.contains_key(&(kind, version)) && self.encoders.contains_key(&(kind, version))
    }

    /// Number of registered decoders
    #[inline]
    #[must_use]
    pub fn decoder_count(&self) -> usize {
        self.decoders.len()
    }

    /// Number of registered encoders
    #[inline]
    #[must_use]
    pub fn encoder_count(&self) -> usize {
        self.encoders.len()
    }
}

fn decode_link_node_v0(bytes: &[u8], ctx: &DecodeContext<'_>) -> Result<Record, DecodeError> {
    link_node::decode_v0(bytes, ctx.resolver).map(Record::LinkNode)
}

fn decode_link_node_v1(bytes: &[u8], _ctx: &DecodeContext<'_>) -> Result<Record, DecodeError> {
    link_node::decode_v1(bytes).map(Record::LinkNode)
}

fn decode_close_summary_v0(bytes: &[u8], _ctx: &DecodeContext<'_>) -> Result<Record, DecodeError> {
    close_summary::decode_v0(bytes).map(Record::CloseSummary)
}

fn decode_close_summary_v1(bytes: &[u8], _ctx: &DecodeContext<'_>) -> Result<Record, DecodeError> {
    close_summary::decode_v1(bytes).map(Record::CloseSummary)
}

fn as_link_node(record: &Record) -> Result<&LinkNode, EncodeError> {
    match record {
        Record::LinkNode(node) => Ok(node),
        other => Err(EncodeError::KindMismatch {
            expected: RecordKind::LinkNode,
            actual: other.kind(),
        }),
    }
}

fn as_close_summary(record: &Record) -> Result<&ChannelCloseSummary, EncodeError> {
    match record {
        Record::CloseSummary(summary) => Ok(summary),
        other => Err(EncodeError::KindMismatch {
            expected: RecordKind::CloseSummary,
            actual: other.kind(),
        }),
    }
}

fn encode_link_node_v0(record: &Record) -> Result<Vec<u8>, EncodeError> {
    link_node::encode_v0(as_link_node(record)?)
}

fn encode_link_node_v1(record: &Record) -> Result<Vec<u8>, EncodeError> {
    link_node::encode_v1(as_link_node(record)?)
}

fn encode_close_summary_v0(record: &Record) -> Result<Vec<u8>, EncodeError> {
    close_summary::encode_v0(as_close_summary(record)?)
}

fn encode_close_summary_v1(record: &Record) -> Result<Vec<u8>, EncodeError> {
    close_summary::encode_v1(as_close_summary(record)?)
}

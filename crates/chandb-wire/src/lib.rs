//! chandb wire codecs
//!
//! Versioned binary encodings for records stored in the channel database.
//!
//! # Core Concepts
//!
//! - [`WireReader`] / [`WireWriter`]: big-endian byte-stream primitives with
//!   field-named truncation errors
//! - [`LinkNode`]: peer link record (v0 string addresses, v1 structured addresses)
//! - [`ChannelCloseSummary`]: close summary (v1 appends a [`ShortChannelId`])
//! - [`CodecTable`]: `(RecordKind, SchemaVersion)` → decode / encode functions
//! - [`AddressResolver`]: name resolution seam used by legacy decoding
//!
//! # Example
//!
//! ```rust,ignore
//! use chandb_wire::{CodecTable, DecodeContext, RecordKind, SchemaVersion, SystemResolver};
//!
//! let table = CodecTable::standard();
//! let ctx = DecodeContext::new(&SystemResolver);
//! let record = table.decoder(RecordKind::LinkNode, SchemaVersion::V0)?(&stored, &ctx)?;
//! let upgraded = table.encoder(RecordKind::LinkNode, SchemaVersion::V1)?(&record)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod hash;
mod primitives;
mod resolve;
mod types;

pub mod close_summary;
pub mod codec;
pub mod link_node;

// Re-exports
pub use close_summary::ChannelCloseSummary;
pub use codec::{
    CodecTable, DecodeContext, DecodeFn, EncodeFn, Record, RecordKind, SchemaVersion,
    CLOSED_CHANNEL_BUCKET, LINK_NODE_BUCKET,
};
pub use error::{CodecDirection, CodecError, DecodeError, EncodeError, ResolveError};
pub use hash::{Hash256, HashParseError};
pub use link_node::LinkNode;
pub use primitives::{WireReader, WireWriter};
pub use resolve::{AddressResolver, SystemResolver};
pub use types::{
    CloseType, CompressedPubKey, Network, OutPoint, ShortChannelId, ShortChannelIdError,
    COMPRESSED_PUBKEY_LEN, MAX_SCID_BLOCK_HEIGHT, MAX_SCID_TX_INDEX,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! chandb chain lookups
//!
//! Enrichment source for close summaries: finds where a channel's funding
//! transaction was mined and turns that into a short channel id.
//!
//! # Core Concepts
//!
//! - [`ChannelLookup`]: injected capability with one blocking lookup
//! - [`HttpChannelLookup`]: HTTP implementation with a mandatory timeout
//! - [`ChainApiConfig`]: service root and timeout

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod lookup;

pub use config::{ChainApiConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::LookupError;
pub use lookup::{parse_tx_response, ChannelLookup, HttpChannelLookup, TxLocation};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error types for chain lookups
//!
//! Every failure mode is a distinct tagged error. A lookup never yields a
//! default short channel id, since a zero id is indistinguishable from a
//! real channel at height 0.

use chandb_wire::ShortChannelIdError;

/// Errors from a [`ChannelLookup`](crate::ChannelLookup)
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Client configuration rejected
    #[error("invalid chain api configuration: {0}")]
    Config(String),

    /// Request could not be completed (connect, timeout, body read)
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Service answered with a non-success HTTP status
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Response body is not the expected JSON shape
    #[error("malformed lookup response: {0}")]
    Decode(String),

    /// Service reported the lookup as failed
    #[error("lookup of {txid} failed remotely: {message}")]
    Remote { txid: String, message: String },

    /// Location cannot be expressed as a short channel id
    #[error("location out of range: {0}")]
    OutOfRange(#[from] ShortChannelIdError),

    /// No answer is known for this channel point
    #[error("no location known for {0}")]
    NotFound(String),
}

impl LookupError {
    /// Create transport error for url
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Check if the request hit the client timeout
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

//! Channel point → short channel id lookups

use crate::config::ChainApiConfig;
use crate::error::LookupError;
use chandb_wire::{OutPoint, ShortChannelId};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fmt::Debug;

/// Locates the funding output of a channel on chain
///
/// Implementations must be read-only: looking up the same channel point
/// twice yields the same answer.
pub trait ChannelLookup: Send + Sync + Debug {
    /// Resolve a channel point to its short channel id
    ///
    /// # Errors
    /// Returns a tagged [`LookupError`]; never a placeholder id
    fn lookup(&self, chan_point: &OutPoint) -> Result<ShortChannelId, LookupError>;
}

/// Where a transaction was mined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxLocation {
    pub block_height: u32,
    /// Position of the transaction inside its block
    pub tx_index: u32,
}

impl TxLocation {
    /// Combine with the channel point's output index
    ///
    /// # Errors
    /// Returns [`LookupError::OutOfRange`] if any component does not fit
    pub fn short_channel_id(&self, chan_point: &OutPoint) -> Result<ShortChannelId, LookupError> {
        Ok(ShortChannelId::for_channel_point(
            self.block_height,
            self.tx_index,
            chan_point,
        )?)
    }
}

#[derive(Debug, Deserialize)]
struct TxLookupResponse {
    success: bool,
    #[serde(default)]
    block_height: Option<u32>,
    #[serde(default)]
    block_index: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse a lookup response body
///
/// `block_index` is the transaction's position inside the block and becomes
/// the short channel id's transaction index.
///
/// # Errors
/// - [`LookupError::Decode`] for malformed JSON or missing fields
/// - [`LookupError::Remote`] when the service reports `success: false`
pub fn parse_tx_response(txid: &str, body: &str) -> Result<TxLocation, LookupError> {
    let parsed: TxLookupResponse = serde_json::from_str(body)?;
    if !parsed.success {
        return Err(LookupError::Remote {
            txid: txid.to_string(),
            message: parsed.error.unwrap_or_else(|| "success flag false".to_string()),
        });
    }
    let block_height = parsed
        .block_height
        .ok_or_else(|| LookupError::Decode("missing block_height".to_string()))?;
    let tx_index = parsed
        .block_index
        .ok_or_else(|| LookupError::Decode("missing block_index".to_string()))?;
    Ok(TxLocation {
        block_height,
        tx_index,
    })
}

/// Lookup client for an HTTP transaction index
///
/// Issues `GET {base_url}/tx/{txid}` and blocks for at most the configured
/// timeout.
#[derive(Debug, Clone)]
pub struct HttpChannelLookup {
    client: Client,
    config: ChainApiConfig,
}

impl HttpChannelLookup {
    /// Create client from configuration
    ///
    /// # Errors
    /// Returns [`LookupError::Config`] if the configuration is invalid or
    /// the HTTP client cannot be built
    pub fn new(config: ChainApiConfig) -> Result<Self, LookupError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| LookupError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Fetch where a transaction was mined
    ///
    /// # Errors
    /// Transport, status, decode or remote failures as [`LookupError`]
    pub fn locate_tx(&self, txid_hex: &str) -> Result<TxLocation, LookupError> {
        let url = self.config.tx_url(txid_hex);
        tracing::debug!(%url, "looking up transaction");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| LookupError::transport(&url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = resp.text().map_err(|e| LookupError::transport(&url, e))?;
        parse_tx_response(txid_hex, &body)
    }
}

impl ChannelLookup for HttpChannelLookup {
    fn lookup(&self, chan_point: &OutPoint) -> Result<ShortChannelId, LookupError> {
        let txid = chan_point.txid.to_string();
        let location = self.locate_tx(&txid)?;
        let scid = location.short_channel_id(chan_point)?;
        tracing::debug!(%chan_point, %scid, "located channel");
        Ok(scid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chandb_wire::Hash256;

    #[test]
    fn parse_success() {
        let body = r#"{"success": true, "block_height": 500000, "block_index": 12}"#;
        let location = parse_tx_response("ab", body).unwrap();
        assert_eq!(
            location,
            TxLocation {
                block_height: 500_000,
                tx_index: 12
            }
        );
    }

    #[test]
    fn parse_remote_failure() {
        let body = r#"{"success": false, "error": "unknown transaction"}"#;
        let err = parse_tx_response("ab", body).unwrap_err();
        assert!(matches!(err, LookupError::Remote { ref message, .. } if message == "unknown transaction"));
    }

    #[test]
    fn parse_missing_fields() {
        let body = r#"{"success": true, "block_height": 1}"#;
        assert!(matches!(parse_tx_response("ab", body), Err(LookupError::Decode(_))));
    }

    #[test]
    fn parse_malformed_json() {
        assert!(matches!(parse_tx_response("ab", "<html>"), Err(LookupError::Decode(_))));
    }

    #[test]
    fn location_uses_outpoint_index() {
        let chan_point = OutPoint::new(Hash256::new([1; 32]), 1);
        let location = TxLocation {
            block_height: 500_000,
            tx_index: 12,
        };
        let scid = location.short_channel_id(&chan_point).unwrap();
        assert_eq!(
            (scid.block_height(), scid.tx_index(), scid.output_index()),
            (500_000, 12, 1)
        );
    }

    #[test]
    fn location_out_of_range() {
        let chan_point = OutPoint::new(Hash256::new([1; 32]), 0);
        let location = TxLocation {
            block_height: 1 << 25,
            tx_index: 0,
        };
        assert!(matches!(
            location.short_channel_id(&chan_point),
            Err(LookupError::OutOfRange(_))
        ));
    }

    #[test]
    fn client_rejects_zero_timeout() {
        let config = ChainApiConfig::default().with_timeout(std::time::Duration::ZERO);
        assert!(matches!(HttpChannelLookup::new(config), Err(LookupError::Config(_))));
    }
}

//! Channel close summaries
//!
//! v1 is v0 with the packed short channel id appended, so every v1 value
//! starts with the exact v0 bytes of the same record.

use crate::error::{DecodeError, EncodeError};
use crate::hash::Hash256;
use crate::primitives::{WireReader, WireWriter};
use crate::types::{CloseType, CompressedPubKey, OutPoint, ShortChannelId, COMPRESSED_PUBKEY_LEN};

/// Encoded length of a v0 summary
pub const V0_LEN: usize = (32 + 4) + 32 + 32 + 4 + COMPRESSED_PUBKEY_LEN + 8 + 8 + 8 + 1 + 1;

/// Encoded length of a v1 summary
pub const V1_LEN: usize = V0_LEN + 8;

/// Final state of a closed channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCloseSummary {
    pub chan_point: OutPoint,
    pub chain_hash: Hash256,
    pub closing_txid: Hash256,
    pub close_height: u32,
    pub remote_pub: CompressedPubKey,
    /// Satoshis
    pub capacity: u64,
    pub settled_balance: u64,
    pub time_locked_balance: u64,
    pub close_type: CloseType,
    pub is_pending: bool,
    /// Absent until the record is enriched; required by v1
    pub short_chan_id: Option<ShortChannelId>,
}

fn read_body(r: &mut WireReader<'_>) -> Result<ChannelCloseSummary, DecodeError> {
    Ok(ChannelCloseSummary {
        chan_point: OutPoint::read(r)?,
        chain_hash: Hash256::new(r.read_array("chain_hash")?),
        closing_txid: Hash256::new(r.read_array("closing_txid")?),
        close_height: r.read_u32("close_height")?,
        remote_pub: CompressedPubKey::read(r, "remote_pub")?,
        capacity: r.read_u64("capacity")?,
        settled_balance: r.read_u64("settled_balance")?,
        time_locked_balance: r.read_u64("time_locked_balance")?,
        close_type: CloseType::from_u8(r.read_u8("close_type")?)?,
        is_pending: r.read_bool("is_pending")?,
        short_chan_id: None,
    })
}

fn write_body(w: &mut WireWriter, s: &ChannelCloseSummary) {
    s.chan_point.write(w);
    w.put_bytes(s.chain_hash.as_bytes());
    w.put_bytes(s.closing_txid.as_bytes());
    w.put_u32(s.close_height);
    s.remote_pub.write(w);
    w.put_u64(s.capacity);
    w.put_u64(s.settled_balance);
    w.put_u64(s.time_locked_balance);
    w.put_u8(s.close_type.as_u8());
    w.put_bool(s.is_pending);
}

/// Decode a summary stored without a short channel id
///
/// # Errors
/// Fails on truncation, trailing bytes or invalid enumerated fields
pub fn decode_v0(bytes: &[u8]) -> Result<ChannelCloseSummary, DecodeError> {
    let mut r = WireReader::new(bytes);
    let summary = read_body(&mut r)?;
    r.finish()?;
    Ok(summary)
}

/// Encode without the short channel id
///
/// Any short channel id on the record is dropped.
///
/// # Errors
/// Infallible today; kept fallible to match the codec table signature
pub fn encode_v0(summary: &ChannelCloseSummary) -> Result<Vec<u8>, EncodeError> {
    let mut w = WireWriter::with_capacity(V0_LEN);
    write_body(&mut w, summary);
    Ok(w.into_bytes())
}

/// Decode a summary carrying a short channel id
///
/// # Errors
/// Fails on truncation, trailing bytes or invalid enumerated fields
pub fn decode_v1(bytes: &[u8]) -> Result<ChannelCloseSummary, DecodeError> {
    let mut r = WireReader::new(bytes);
    let mut summary = read_body(&mut r)?;
    summary.short_chan_id = Some(ShortChannelId::from_u64(r.read_u64("short_chan_id")?));
    r.finish()?;
    Ok(summary)
}

/// Encode with the short channel id appended
///
/// # Errors
/// Returns [`EncodeError::MissingField`] if the record was never enriched
pub fn encode_v1(summary: &ChannelCloseSummary) -> Result<Vec<u8>, EncodeError> {
    let scid = summary
        .short_chan_id
        .ok_or(EncodeError::MissingField("short_chan_id"))?;
    let mut w = WireWriter::with_capacity(V1_LEN);
    write_body(&mut w, summary);
    w.put_u64(scid.to_u64());
    Ok(w.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_pubkey;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn summary() -> ChannelCloseSummary {
        ChannelCloseSummary {
            chan_point: OutPoint::new(Hash256::new([0xaa; 32]), 1),
            chain_hash: Hash256::new([0x06; 32]),
            closing_txid: Hash256::new([0xbb; 32]),
            close_height: 500_100,
            remote_pub: test_pubkey(0x44),
            capacity: 1_000_000,
            settled_balance: 400_000,
            time_locked_balance: 600_000,
            close_type: CloseType::Force,
            is_pending: true,
            short_chan_id: None,
        }
    }

    #[test]
    fn lengths_match_layout() {
        assert_eq!(V0_LEN, 163);
        assert_eq!(encode_v0(&summary()).unwrap().len(), V0_LEN);
    }

    #[test]
    fn v1_is_v0_plus_one_field() {
        let mut s = summary();
        let old = encode_v0(&s).unwrap();
        s.short_chan_id = Some(ShortChannelId::new(500_000, 12, 1).unwrap());
        let new = encode_v1(&s).unwrap();

        assert_eq!(new.len(), V1_LEN);
        assert_eq!(&new[..V0_LEN], old.as_slice());
        assert_eq!(decode_v0(&new[..V0_LEN]).unwrap(), summary());
        assert_eq!(decode_v1(&new).unwrap(), s);
    }

    #[test]
    fn v1_requires_short_chan_id() {
        assert!(matches!(
            encode_v1(&summary()),
            Err(EncodeError::MissingField("short_chan_id"))
        ));
    }

    #[test]
    fn truncated_summary_fails() {
        let bytes = encode_v0(&summary()).unwrap();
        let err = decode_v0(&bytes[..V0_LEN - 1]).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { field: "is_pending", .. }));
    }

    #[test]
    fn v0_decoder_rejects_v1_bytes() {
        let mut s = summary();
        s.short_chan_id = Some(ShortChannelId::new(1, 2, 3).unwrap());
        let new = encode_v1(&s).unwrap();
        assert!(matches!(decode_v0(&new), Err(DecodeError::TrailingBytes(8))));
    }

    #[test]
    fn invalid_close_type_rejected() {
        let mut bytes = encode_v0(&summary()).unwrap();
        bytes[V0_LEN - 2] = 42;
        assert!(matches!(decode_v0(&bytes), Err(DecodeError::UnknownCloseType(42))));
    }

    proptest! {
        #[test]
        fn prop_v0_reencodes_identically(
            index in any::<u32>(),
            close_height in any::<u32>(),
            capacity in any::<u64>(),
            settled in any::<u64>(),
            locked in any::<u64>(),
            close_type in 0u8..4,
            is_pending in any::<bool>(),
        ) {
            let mut s = summary();
            s.chan_point.index = index;
            s.close_height = close_height;
            s.capacity = capacity;
            s.settled_balance = settled;
            s.time_locked_balance = locked;
            s.close_type = CloseType::from_u8(close_type).unwrap();
            s.is_pending = is_pending;

            let bytes = encode_v0(&s).unwrap();
            prop_assert_eq!(encode_v0(&decode_v0(&bytes).unwrap()).unwrap(), bytes);
        }
    }
}

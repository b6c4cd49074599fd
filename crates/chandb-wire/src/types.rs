//! Fixed-layout domain types carried by channel database records

use crate::error::DecodeError;
use crate::hash::Hash256;
use crate::primitives::{WireReader, WireWriter};
use std::fmt::{self, Display, Formatter};

/// Protocol network magic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Network(pub u32);

impl Network {
    pub const SIMNET: Self = Self(0x1214_1c16);
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Serialized length of a compressed public key
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Compressed secp256k1 public key
///
/// Construction checks that the bytes decode to a point on the curve; the
/// serialized form is kept as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressedPubKey([u8; COMPRESSED_PUBKEY_LEN]);

impl CompressedPubKey {
    /// Create key from serialized bytes
    ///
    /// # Errors
    /// Returns [`DecodeError::InvalidPubKey`] unless `bytes` is a compressed
    /// point on the curve
    pub fn from_bytes(bytes: [u8; COMPRESSED_PUBKEY_LEN]) -> Result<Self, DecodeError> {
        secp256k1::PublicKey::from_slice(&bytes).map_err(|source| DecodeError::InvalidPubKey {
            key: hex::encode(bytes),
            source,
        })?;
        Ok(Self(bytes))
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; COMPRESSED_PUBKEY_LEN] {
        &self.0
    }

    pub(crate) fn read(r: &mut WireReader<'_>, field: &'static str) -> Result<Self, DecodeError> {
        Self::from_bytes(r.read_array(field)?)
    }

    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.put_bytes(&self.0);
    }
}

impl Display for CompressedPubKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Transaction outpoint: the funding output that identifies a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: Hash256,
    pub index: u32,
}

impl OutPoint {
    #[inline]
    #[must_use]
    pub const fn new(txid: Hash256, index: u32) -> Self {
        Self { txid, index }
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let txid = Hash256::new(r.read_array("chan_point.txid")?);
        let index = r.read_u32("chan_point.index")?;
        Ok(Self { txid, index })
    }

    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.put_bytes(self.txid.as_bytes());
        w.put_u32(self.index);
    }
}

impl Display for OutPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// Largest block height representable in a short channel id
pub const MAX_SCID_BLOCK_HEIGHT: u32 = (1 << 24) - 1;

/// Largest transaction index representable in a short channel id
pub const MAX_SCID_TX_INDEX: u32 = (1 << 24) - 1;

/// Compact locator of a funding output
///
/// Packs into a u64 as 3 bytes block height, 3 bytes transaction index
/// within the block, 2 bytes output index within the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortChannelId {
    block_height: u32,
    tx_index: u32,
    output_index: u16,
}

impl ShortChannelId {
    /// Create a short channel id
    ///
    /// # Errors
    /// Returns error if height or transaction index exceed 24 bits
    pub fn new(block_height: u32, tx_index: u32, output_index: u16) -> Result<Self, ShortChannelIdError> {
        if block_height > MAX_SCID_BLOCK_HEIGHT {
            return Err(ShortChannelIdError::out_of_range(
                "block_height",
                block_height.into(),
                MAX_SCID_BLOCK_HEIGHT.into(),
            ));
        }
        if tx_index > MAX_SCID_TX_INDEX {
            return Err(ShortChannelIdError::out_of_range(
                "tx_index",
                tx_index.into(),
                MAX_SCID_TX_INDEX.into(),
            ));
        }
        Ok(Self {
            block_height,
            tx_index,
            output_index,
        })
    }

    /// Locate a channel point given where its funding transaction was mined
    ///
    /// # Errors
    /// Returns error if any component is not representable; the outpoint
    /// index is never truncated
    pub fn for_channel_point(
        block_height: u32,
        tx_index: u32,
        chan_point: &OutPoint,
    ) -> Result<Self, ShortChannelIdError> {
        let output_index = u16::try_from(chan_point.index).map_err(|_| {
            ShortChannelIdError::out_of_range("output_index", chan_point.index.into(), u16::MAX.into())
        })?;
        Self::new(block_height, tx_index, output_index)
    }

    /// Unpack from the on-disk u64 form
    #[must_use]
    pub const fn from_u64(v: u64) -> Self {
        Self {
            block_height: (v >> 40) as u32,
            tx_index: ((v >> 16) & 0xff_ffff) as u32,
            output_index: v as u16,
        }
    }

    /// Pack into the on-disk u64 form
    #[must_use]
    pub const fn to_u64(&self) -> u64 {
        ((self.block_height as u64) << 40) | ((self.tx_index as u64) << 16) | self.output_index as u64
    }

    #[inline]
    #[must_use]
    pub const fn block_height(&self) -> u32 {
        self.block_height
    }

    #[inline]
    #[must_use]
    pub const fn tx_index(&self) -> u32 {
        self.tx_index
    }

    #[inline]
    #[must_use]
    pub const fn output_index(&self) -> u16 {
        self.output_index
    }
}

impl Display for ShortChannelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.block_height, self.tx_index, self.output_index)
    }
}

/// Errors constructing a [`ShortChannelId`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortChannelIdError {
    #[error("{field} {value} exceeds maximum {max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

impl ShortChannelIdError {
    fn out_of_range(field: &'static str, value: u64, max: u64) -> Self {
        Self::OutOfRange { field, value, max }
    }
}

/// How a channel was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseType {
    Cooperative,
    Force,
    Breach,
    FundingCanceled,
}

impl CloseType {
    /// Wire value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Cooperative => 0,
            Self::Force => 1,
            Self::Breach => 2,
            Self::FundingCanceled => 3,
        }
    }

    /// Parse wire value
    ///
    /// # Errors
    /// Returns [`DecodeError::UnknownCloseType`] for unassigned values
    pub fn from_u8(v: u8) -> Result<Self, DecodeError> {
        match v {
            0 => Ok(Self::Cooperative),
            1 => Ok(Self::Force),
            2 => Ok(Self::Breach),
            3 => Ok(Self::FundingCanceled),
            other => Err(DecodeError::UnknownCloseType(other)),
        }
    }
}

/// Compressed generator point of secp256k1
#[cfg(test)]
pub(crate) const GENERATOR: [u8; COMPRESSED_PUBKEY_LEN] = [
    0x02, 0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87, 0x0b,
    0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16, 0xf8, 0x17,
    0x98,
];

/// Public key of the secret `[seed; 32]`; `seed` must be non-zero
#[cfg(test)]
pub(crate) fn test_pubkey(seed: u8) -> CompressedPubKey {
    let secret = secp256k1::SecretKey::from_slice(&[seed; 32]).unwrap();
    let public = secp256k1::PublicKey::from_secret_key(&secp256k1::Secp256k1::new(), &secret);
    CompressedPubKey::from_bytes(public.serialize()).unwrap()
}

//! Testing utilities for chandb workspace
//!
//! Shared fixtures, deterministic collaborators and fault injection.

#![allow(missing_docs)]

use chandb_chain::{ChannelLookup, LookupError};
use chandb_store::{Entry, KvTx, MemoryStore, StoreError};
use chandb_wire::{
    AddressResolver, ChannelCloseSummary, CloseType, CompressedPubKey, Hash256, LinkNode, Network,
    OutPoint, ResolveError, ShortChannelId, WireWriter,
};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

pub use chandb_wire::{CLOSED_CHANNEL_BUCKET, LINK_NODE_BUCKET};

/// Public key of the secret `[seed; 32]`
///
/// # Panics
/// If `seed` is zero
pub fn sample_pubkey(seed: u8) -> CompressedPubKey {
    let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
    let public = PublicKey::from_secret_key(&Secp256k1::new(), &secret);
    CompressedPubKey::from_bytes(public.serialize()).unwrap()
}

/// Txid with every byte set to `seed`
pub fn sample_txid(seed: u8) -> Hash256 {
    Hash256::new([seed; 32])
}

pub fn sample_link_node() -> LinkNode {
    LinkNode {
        network: Network(0x0000_0001),
        identity_key: sample_pubkey(0x11),
        last_seen: 1_700_000_000,
        addresses: vec![
            "10.0.0.1:9735".parse().unwrap(),
            "10.0.0.2:9735".parse().unwrap(),
        ],
    }
}

/// Legacy (v0) encoding of `node`'s header followed by `addresses` verbatim
///
/// `node.addresses` is ignored, so hostnames can be stored.
pub fn legacy_link_node_bytes(node: &LinkNode, addresses: &[&str]) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_u32(node.network.0);
    w.put_bytes(node.identity_key.as_bytes());
    w.put_u64(node.last_seen);
    w.put_u32(u32::try_from(addresses.len()).unwrap());
    for addr in addresses {
        w.put_var_string(addr);
    }
    w.into_bytes()
}

/// Unenriched summary whose funding outpoint is `sample_txid(seed):output_index`
pub fn sample_close_summary(seed: u8, output_index: u32) -> ChannelCloseSummary {
    ChannelCloseSummary {
        chan_point: OutPoint::new(sample_txid(seed), output_index),
        chain_hash: Hash256::new([0x6f; 32]),
        closing_txid: sample_txid(seed.wrapping_add(0x80)),
        close_height: 600_000 + u32::from(seed),
        remote_pub: sample_pubkey(seed),
        capacity: 1_000_000,
        settled_balance: 400_000,
        time_locked_balance: 100_000,
        close_type: CloseType::Cooperative,
        is_pending: false,
        short_chan_id: None,
    }
}

/// Store with one bucket holding `entries`
pub fn seeded_store(bucket: &[u8], entries: &[Entry]) -> MemoryStore {
    let store = MemoryStore::new();
    store
        .update(|tx| {
            tx.create_bucket(bucket)?;
            for (key, value) in entries {
                match value {
                    Some(value) => tx.put(bucket, key, value)?,
                    None => tx.put_nil(bucket, key)?,
                }
            }
            Ok::<_, StoreError>(())
        })
        .unwrap();
    store
}

/// Every pair of a bucket in committed state
pub fn bucket_contents(store: &MemoryStore, bucket: &[u8]) -> Vec<Entry> {
    store.view(|tx| tx.entries(bucket)).unwrap()
}

/// Resolver answering from a fixed table, then literal endpoints
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    table: HashMap<String, SocketAddr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, addr: SocketAddr) -> Self {
        self.table.insert(name.to_string(), addr);
        self
    }
}

impl AddressResolver for StaticResolver {
    fn resolve(&self, addr: &str) -> Result<SocketAddr, ResolveError> {
        if let Some(found) = self.table.get(addr) {
            return Ok(*found);
        }
        addr.parse()
            .map_err(|_| ResolveError::NoEndpoint(addr.to_string()))
    }
}

#[derive(Debug, Clone)]
enum StubAnswer {
    Located { block_height: u32, tx_index: u32 },
    Remote(String),
}

/// Deterministic [`ChannelLookup`] keyed by channel point
///
/// Unknown channel points yield [`LookupError::NotFound`].
#[derive(Debug, Default)]
pub struct StubLookup {
    answers: HashMap<OutPoint, StubAnswer>,
    calls: AtomicUsize,
}

impl StubLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, chan_point: OutPoint, block_height: u32, tx_index: u32) -> Self {
        self.answers.insert(
            chan_point,
            StubAnswer::Located {
                block_height,
                tx_index,
            },
        );
        self
    }

    pub fn with_remote_failure(mut self, chan_point: OutPoint, message: &str) -> Self {
        self.answers
            .insert(chan_point, StubAnswer::Remote(message.to_string()));
        self
    }

    /// Number of lookups served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChannelLookup for StubLookup {
    fn lookup(&self, chan_point: &OutPoint) -> Result<ShortChannelId, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(chan_point) {
            Some(StubAnswer::Located {
                block_height,
                tx_index,
            }) => Ok(ShortChannelId::for_channel_point(
                *block_height,
                *tx_index,
                chan_point,
            )?),
            Some(StubAnswer::Remote(message)) => Err(LookupError::Remote {
                txid: chan_point.txid.to_string(),
                message: message.clone(),
            }),
            None => Err(LookupError::NotFound(chan_point.to_string())),
        }
    }
}

/// Transaction wrapper whose `fail_on`-th put (1-based) returns a backend error
#[derive(Debug)]
pub struct FailingTx<'a, T: KvTx + ?Sized> {
    inner: &'a mut T,
    fail_on: usize,
    puts: usize,
}

impl<'a, T: KvTx + ?Sized> FailingTx<'a, T> {
    pub fn new(inner: &'a mut T, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            puts: 0,
        }
    }
}

impl<T: KvTx + ?Sized> KvTx for FailingTx<'_, T> {
    fn bucket_exists(&self, bucket: &[u8]) -> Result<bool, StoreError> {
        self.inner.bucket_exists(bucket)
    }

    fn buckets(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        self.inner.buckets()
    }

    fn create_bucket(&mut self, bucket: &[u8]) -> Result<(), StoreError> {
        self.inner.create_bucket(bucket)
    }

    fn entries(&self, bucket: &[u8]) -> Result<Vec<Entry>, StoreError> {
        self.inner.entries(bucket)
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(bucket, key)
    }

    fn put(&mut self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.puts += 1;
        if self.puts == self.fail_on {
            return Err(StoreError::Backend("injected put failure".to_string()));
        }
        self.inner.put(bucket, key, value)
    }

    fn put_nil(&mut self, bucket: &[u8], key: &[u8]) -> Result<(), StoreError> {
        self.inner.put_nil(bucket, key)
    }
}

//! Peer link records
//!
//! Both schema versions share the prefix `network | identity key | last seen
//! | address count`. They differ only in how each address is stored:
//!
//! - v0: CompactSize-prefixed `host:port` string, resolved on decode
//! - v1: type byte, raw IP (4 or 16 bytes), big-endian port

use crate::error::{DecodeError, EncodeError};
use crate::primitives::{WireReader, WireWriter};
use crate::resolve::AddressResolver;
use crate::types::{CompressedPubKey, Network, COMPRESSED_PUBKEY_LEN};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Address descriptor for a TCP endpoint over IPv4
pub const ADDR_TYPE_TCP4: u8 = 0;

/// Address descriptor for a TCP endpoint over IPv6
pub const ADDR_TYPE_TCP6: u8 = 1;

/// Length of the shared prefix before the address list
pub const HEADER_LEN: usize = 4 + COMPRESSED_PUBKEY_LEN + 8 + 4;

/// A peer we have an open or historical channel with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNode {
    /// Network the peer was seen on
    pub network: Network,
    /// Peer identity
    pub identity_key: CompressedPubKey,
    /// Unix seconds of last contact
    pub last_seen: u64,
    /// Known endpoints, in stored order
    pub addresses: Vec<SocketAddr>,
}

struct Header {
    network: Network,
    identity_key: CompressedPubKey,
    last_seen: u64,
    num_addrs: u32,
}

fn read_header(r: &mut WireReader<'_>) -> Result<Header, DecodeError> {
    Ok(Header {
        network: Network(r.read_u32("network")?),
        identity_key: CompressedPubKey::read(r, "identity_key")?,
        last_seen: r.read_u64("last_seen")?,
        num_addrs: r.read_u32("num_addrs")?,
    })
}

fn write_header(w: &mut WireWriter, node: &LinkNode) -> Result<(), EncodeError> {
    let num_addrs = u32::try_from(node.addresses.len())
        .map_err(|_| EncodeError::TooManyAddresses(node.addresses.len()))?;
    w.put_u32(node.network.0);
    node.identity_key.write(w);
    w.put_u64(node.last_seen);
    w.put_u32(num_addrs);
    Ok(())
}

// Cap preallocation by what the input could possibly hold.
fn address_capacity(num_addrs: u32, remaining: usize) -> usize {
    usize::try_from(num_addrs).map_or(remaining, |n| n.min(remaining))
}

/// Decode the legacy string-address layout
///
/// # Errors
/// Fails on truncation, trailing bytes, an invalid key, or if any address
/// cannot be resolved. No partial address list is ever returned.
pub fn decode_v0(bytes: &[u8], resolver: &dyn AddressResolver) -> Result<LinkNode, DecodeError> {
    let mut r = WireReader::new(bytes);
    let header = read_header(&mut r)?;

    let mut addresses = Vec::with_capacity(address_capacity(header.num_addrs, r.remaining()));
    for _ in 0..header.num_addrs {
        let addr = r.read_var_string("address")?;
        addresses.push(resolver.resolve(addr)?);
    }
    r.finish()?;

    Ok(LinkNode {
        network: header.network,
        identity_key: header.identity_key,
        last_seen: header.last_seen,
        addresses,
    })
}

/// Encode the legacy string-address layout
///
/// # Errors
/// Returns [`EncodeError::TooManyAddresses`] if the count overflows u32
pub fn encode_v0(node: &LinkNode) -> Result<Vec<u8>, EncodeError> {
    let mut w = WireWriter::with_capacity(HEADER_LEN + node.addresses.len() * 24);
    write_header(&mut w, node)?;
    for addr in &node.addresses {
        w.put_var_string(&addr.to_string());
    }
    Ok(w.into_bytes())
}

fn read_addr(r: &mut WireReader<'_>) -> Result<SocketAddr, DecodeError> {
    let ip = match r.read_u8("address.type")? {
        ADDR_TYPE_TCP4 => IpAddr::V4(Ipv4Addr::from(r.read_array::<4>("address.ip")?)),
        ADDR_TYPE_TCP6 => IpAddr::V6(Ipv6Addr::from(r.read_array::<16>("address.ip")?)),
        other => return Err(DecodeError::UnknownAddressType(other)),
    };
    let port = r.read_u16("address.port")?;
    Ok(SocketAddr::new(ip, port))
}

fn write_addr(w: &mut WireWriter, addr: &SocketAddr) {
    match addr.ip() {
        IpAddr::V4(ip) => {
            w.put_u8(ADDR_TYPE_TCP4);
            w.put_bytes(&ip.octets());
        }
        IpAddr::V6(ip) => {
            w.put_u8(ADDR_TYPE_TCP6);
            w.put_bytes(&ip.octets());
        }
    }
    w.put_u16(addr.port());
}

/// Decode the structured-address layout
///
/// # Errors
/// Fails on truncation, trailing bytes, an invalid key or an unknown
/// address type
pub fn decode_v1(bytes: &[u8]) -> Result<LinkNode, DecodeError> {
    let mut r = WireReader::new(bytes);
    let header = read_header(&mut r)?;

    let mut addresses = Vec::with_capacity(address_capacity(header.num_addrs, r.remaining()));
    for _ in 0..header.num_addrs {
        addresses.push(read_addr(&mut r)?);
    }
    r.finish()?;

    Ok(LinkNode {
        network: header.network,
        identity_key: header.identity_key,
        last_seen: header.last_seen,
        addresses,
    })
}

/// Encode the structured-address layout
///
/// IPv6 flow info and scope id are not part of the format.
///
/// # Errors
/// Returns [`EncodeError::TooManyAddresses`] if the count overflows u32
pub fn encode_v1(node: &LinkNode) -> Result<Vec<u8>, EncodeError> {
    let mut w = WireWriter::with_capacity(HEADER_LEN + node.addresses.len() * 19);
    write_header(&mut w, node)?;
    for addr in &node.addresses {
        write_addr(&mut w, addr);
    }
    Ok(w.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::resolve::SystemResolver;
    use crate::types::test_pubkey;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn key() -> CompressedPubKey {
        test_pubkey(0x11)
    }

    fn node(addresses: Vec<SocketAddr>) -> LinkNode {
        LinkNode {
            network: Network(1),
            identity_key: key(),
            last_seen: 1_700_000_000,
            addresses,
        }
    }

    #[derive(Debug)]
    struct RefusingResolver;

    impl AddressResolver for RefusingResolver {
        fn resolve(&self, addr: &str) -> Result<SocketAddr, ResolveError> {
            Err(ResolveError::NoEndpoint(addr.to_string()))
        }
    }

    #[test]
    fn v0_layout_is_exact() {
        let n = node(vec!["10.0.0.1:9735".parse().unwrap()]);
        let bytes = encode_v0(&n).unwrap();

        assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[4..37], key().as_bytes());
        assert_eq!(&bytes[37..45], &1_700_000_000u64.to_be_bytes());
        assert_eq!(&bytes[45..49], &[0, 0, 0, 1]);
        assert_eq!(bytes[49] as usize, "10.0.0.1:9735".len());
        assert_eq!(&bytes[50..], b"10.0.0.1:9735");
    }

    #[test]
    fn v1_layout_is_exact() {
        let n = node(vec!["10.0.0.2:9735".parse().unwrap()]);
        let bytes = encode_v1(&n).unwrap();
        assert_eq!(&bytes[HEADER_LEN..], &[ADDR_TYPE_TCP4, 10, 0, 0, 2, 0x26, 0x07]);
    }

    #[test]
    fn empty_address_list_round_trips() {
        let n = node(Vec::new());
        let old = encode_v0(&n).unwrap();
        assert_eq!(old.len(), HEADER_LEN);
        let decoded = decode_v0(&old, &SystemResolver).unwrap();
        assert!(decoded.addresses.is_empty());
        assert_eq!(decode_v1(&encode_v1(&decoded).unwrap()).unwrap(), n);
    }

    #[test]
    fn fewer_addresses_than_declared_fails() {
        let n = node(vec!["10.0.0.1:9735".parse().unwrap(), "10.0.0.2:9735".parse().unwrap()]);
        let mut bytes = encode_v0(&n).unwrap();
        // Claim three addresses while only two follow.
        bytes[45..49].copy_from_slice(&3u32.to_be_bytes());
        let err = decode_v0(&bytes, &SystemResolver).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { field: "address", .. }));
    }

    #[test]
    fn more_addresses_than_declared_fails() {
        let n = node(vec!["10.0.0.1:9735".parse().unwrap(), "10.0.0.2:9735".parse().unwrap()]);
        let mut bytes = encode_v0(&n).unwrap();
        bytes[45..49].copy_from_slice(&1u32.to_be_bytes());
        assert!(matches!(
            decode_v0(&bytes, &SystemResolver),
            Err(DecodeError::TrailingBytes(_))
        ));
    }

    #[test]
    fn truncated_header_fails() {
        let bytes = encode_v0(&node(Vec::new())).unwrap();
        let err = decode_v0(&bytes[..20], &SystemResolver).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { field: "identity_key", .. }));
    }

    #[test]
    fn resolution_failure_aborts_record() {
        let bytes = encode_v0(&node(vec!["10.0.0.1:9735".parse().unwrap()])).unwrap();
        let err = decode_v0(&bytes, &RefusingResolver).unwrap_err();
        assert!(matches!(err, DecodeError::Resolve(ResolveError::NoEndpoint(_))));
    }

    #[derive(Debug)]
    struct TableResolver(Vec<(&'static str, SocketAddr)>);

    impl AddressResolver for TableResolver {
        fn resolve(&self, addr: &str) -> Result<SocketAddr, ResolveError> {
            self.0
                .iter()
                .find(|(name, _)| *name == addr)
                .map(|(_, found)| *found)
                .ok_or_else(|| ResolveError::NoEndpoint(addr.to_string()))
        }
    }

    fn legacy_bytes(addresses: &[&str]) -> Vec<u8> {
        let mut bytes = encode_v0(&node(Vec::new())).unwrap();
        bytes[45..49].copy_from_slice(&u32::try_from(addresses.len()).unwrap().to_be_bytes());
        let mut w = WireWriter::new();
        for addr in addresses {
            w.put_var_string(addr);
        }
        bytes.extend(w.into_bytes());
        bytes
    }

    #[test]
    fn hostnames_resolve_in_stored_order() {
        let a: SocketAddr = "192.0.2.7:9735".parse().unwrap();
        let b: SocketAddr = "[2001:db8::1]:9736".parse().unwrap();
        let resolver = TableResolver(vec![("beta.example:9736", b), ("alpha.example:9735", a)]);

        let decoded = decode_v0(&legacy_bytes(&["alpha.example:9735", "beta.example:9736"]), &resolver).unwrap();

        assert_eq!(decoded.addresses, vec![a, b]);
        let v1 = encode_v1(&decoded).unwrap();
        assert_eq!(v1[HEADER_LEN], ADDR_TYPE_TCP4);
        assert_eq!(decode_v1(&v1).unwrap().addresses, vec![a, b]);
    }

    #[test]
    fn unknown_hostname_fails_whole_record() {
        let resolver = TableResolver(vec![("alpha.example:9735", "192.0.2.7:9735".parse().unwrap())]);
        let err = decode_v0(&legacy_bytes(&["alpha.example:9735", "gone.example:9735"]), &resolver).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Resolve(ResolveError::NoEndpoint(ref name)) if name == "gone.example:9735"
        ));
    }

    #[test]
    fn off_curve_identity_key_rejected() {
        let mut bytes = encode_v0(&node(Vec::new())).unwrap();
        bytes[4] = 0x02;
        bytes[5..37].fill(0xff);
        assert!(matches!(
            decode_v0(&bytes, &SystemResolver),
            Err(DecodeError::InvalidPubKey { .. })
        ));
        assert!(matches!(decode_v1(&bytes), Err(DecodeError::InvalidPubKey { .. })));
    }

    #[test]
    fn unknown_address_type_rejected() {
        let mut bytes = encode_v1(&node(vec!["10.0.0.1:9735".parse().unwrap()])).unwrap();
        bytes[HEADER_LEN] = 7;
        assert!(matches!(decode_v1(&bytes), Err(DecodeError::UnknownAddressType(7))));
    }

    fn arb_addr() -> impl Strategy<Value = SocketAddr> {
        prop_oneof![
            (any::<[u8; 4]>(), any::<u16>()).prop_map(|(ip, port)| SocketAddr::new(Ipv4Addr::from(ip).into(), port)),
            (any::<[u8; 16]>(), any::<u16>()).prop_map(|(ip, port)| SocketAddr::new(Ipv6Addr::from(ip).into(), port)),
        ]
    }

    proptest! {
        #[test]
        fn prop_shared_prefix_survives_migration(
            network in any::<u32>(),
            last_seen in any::<u64>(),
            addresses in proptest::collection::vec(arb_addr(), 0..8),
        ) {
            let n = LinkNode { network: Network(network), identity_key: key(), last_seen, addresses };
            let old = encode_v0(&n).unwrap();
            let new = encode_v1(&decode_v0(&old, &SystemResolver).unwrap()).unwrap();
            prop_assert_eq!(&old[..HEADER_LEN], &new[..HEADER_LEN]);
            prop_assert_eq!(decode_v1(&new).unwrap(), n);
        }
    }
}

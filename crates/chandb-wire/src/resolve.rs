//! Name resolution for legacy peer addresses
//!
//! Legacy link node records store endpoints as `host:port` strings. Decoding
//! them materializes a concrete [`SocketAddr`] through an [`AddressResolver`],
//! so tests can inject a deterministic table instead of the system resolver.

use crate::error::ResolveError;
use std::fmt::Debug;
use std::net::{SocketAddr, ToSocketAddrs};

/// Resolves `host:port` strings into endpoints
pub trait AddressResolver: Send + Sync + Debug {
    /// Resolve a single address string
    ///
    /// # Errors
    /// Returns [`ResolveError`] if the string cannot be resolved; failures
    /// are never swallowed into a default endpoint
    fn resolve(&self, addr: &str) -> Result<SocketAddr, ResolveError>;
}

/// Resolver backed by the platform's name service
///
/// Literal IP endpoints never touch the network. Host names go through
/// [`ToSocketAddrs`] and the first returned endpoint wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl AddressResolver for SystemResolver {
    fn resolve(&self, addr: &str) -> Result<SocketAddr, ResolveError> {
        if let Ok(literal) = addr.parse::<SocketAddr>() {
            return Ok(literal);
        }
        addr.to_socket_addrs()
            .map_err(|e| ResolveError::lookup(addr, e))?
            .next()
            .ok_or_else(|| ResolveError::NoEndpoint(addr.to_string()))
    }
}

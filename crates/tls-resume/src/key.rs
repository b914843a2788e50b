//! Session key derivation.
//!
//! A key binds one endpoint to one peer: `"<endpoint-name>.<address>:<port>"`.
//! The address is always rendered numerically, so building a key never
//! touches the resolver.

use std::fmt::{self, Write};
use std::net::{IpAddr, SocketAddr};

/// Bytes reserved for the endpoint name.
const NAME_BUDGET: usize = 16;

/// Bytes reserved for the numeric address (an IPv6 text form is at most 45).
const ADDR_BUDGET: usize = 48;

/// Bytes reserved for `":<port>"`.
const PORT_BUDGET: usize = 8;

/// Fixed key buffer size: name, address, separator, port and terminator.
pub const KEY_CAPACITY: usize = NAME_BUDGET + ADDR_BUDGET + 1 + PORT_BUDGET + 1;

/// Longest key text that fits in [`KEY_CAPACITY`].
pub const MAX_KEY_LEN: usize = KEY_CAPACITY - 1;

/// The remote side of a connection, as used for key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerIdentity {
    pub addr: IpAddr,
    pub port: u16,
}

impl PeerIdentity {
    pub fn new(addr: IpAddr, port: u16) -> Self {
        Self { addr, port }
    }
}

impl From<SocketAddr> for PeerIdentity {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Textual identity of a cached session, unique within one endpoint.
///
/// The text never exceeds [`MAX_KEY_LEN`] bytes. The address and port are
/// always written in full; an endpoint name too long to fit is truncated
/// on a character boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(String);

impl SessionKey {
    /// Build the key for `peer` as seen from endpoint `endpoint_name`.
    pub fn new(endpoint_name: &str, peer: &PeerIdentity) -> Self {
        let mut addr = String::with_capacity(ADDR_BUDGET);
        let _ = write!(addr, "{}", peer.addr);
        let mut port = String::with_capacity(PORT_BUDGET);
        let _ = write!(port, ":{}", peer.port);
        debug_assert!(addr.len() <= ADDR_BUDGET && port.len() <= PORT_BUDGET);

        let name_room = MAX_KEY_LEN - 1 - addr.len() - port.len();
        let name = truncate_on_char_boundary(endpoint_name, name_room);

        let mut key = String::with_capacity(KEY_CAPACITY);
        key.push_str(name);
        key.push('.');
        key.push_str(&addr);
        key.push_str(&port);
        debug_assert!(key.len() <= MAX_KEY_LEN);

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

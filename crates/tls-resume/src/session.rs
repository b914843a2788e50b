//! Boundary with the TLS engine.
//!
//! The cache never looks inside a session. It asks the connection for the
//! current resumable session after a handshake and hands a cached one back
//! before the next handshake.

use std::fmt;

/// Opaque resumable session state produced by a TLS engine.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionPayload(Vec<u8>);

impl SessionPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for SessionPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

// Session secrets stay out of logs.
impl fmt::Debug for SessionPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPayload")
            .field("len", &self.0.len())
            .finish()
    }
}

/// Failure reported by the TLS engine when no resumable session exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SessionError(String);

impl SessionError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// A TLS connection as seen by the session cache.
///
/// Implemented by the glue between the cache and a concrete TLS engine.
pub trait TlsConnection {
    /// Snapshot the session negotiated by the completed handshake.
    fn extract_session(&mut self) -> std::result::Result<SessionPayload, SessionError>;

    /// Offer a cached session for the handshake about to start.
    ///
    /// The engine copies what it needs; the cache keeps ownership of
    /// `session`. Whether the server honors resumption is up to the engine.
    fn install_session(&mut self, session: &SessionPayload);

    /// Record that this connection attempted resumption.
    fn mark_resumption_attempted(&mut self);
}

//! Error types for session cache operations.

/// Error type for session cache operations.
///
/// The lifecycle operations on [`crate::EndpointCache`] never return these
/// to the connection layer; they are logged and reduced to a `bool`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The TLS engine could not hand back a resumable session.
    #[error("Session extraction failed: {0}")]
    SessionExtraction(#[from] crate::session::SessionError),

    /// An endpoint with this name is already registered.
    #[error("Endpoint already registered: {0}")]
    DuplicateEndpoint(String),

    /// No async runtime is available to drive expiry timers.
    #[error("No runtime available: {0}")]
    Runtime(String),
}

/// Result type for session cache operations.
pub type Result<T> = std::result::Result<T, Error>;

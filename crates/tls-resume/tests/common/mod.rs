//! Shared test helpers.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};

use tls_resume::{PeerIdentity, SessionError, SessionPayload, TlsConnection};

/// Connection double that negotiates `session` and records what it is offered.
#[derive(Debug, Default)]
pub struct MockConnection {
    pub session: Option<Vec<u8>>,
    pub offered: Option<SessionPayload>,
    pub resumption_attempted: bool,
}

impl MockConnection {
    pub fn negotiated(bytes: &[u8]) -> Self {
        Self {
            session: Some(bytes.to_vec()),
            ..Default::default()
        }
    }

    pub fn fresh() -> Self {
        Self::default()
    }
}

impl TlsConnection for MockConnection {
    fn extract_session(&mut self) -> Result<SessionPayload, SessionError> {
        self.session
            .clone()
            .map(SessionPayload::new)
            .ok_or_else(|| SessionError::new("handshake produced no session"))
    }

    fn install_session(&mut self, session: &SessionPayload) {
        self.offered = Some(session.clone());
    }

    fn mark_resumption_attempted(&mut self) {
        self.resumption_attempted = true;
    }
}

pub fn peer(n: u8) -> PeerIdentity {
    PeerIdentity::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, n)), 443)
}

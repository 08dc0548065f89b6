//! TLS session management and resumption.
//!
//! A [`Session`] records what was negotiated on a full handshake. It can be
//! resumed by session ID ([`store`]), by an encrypted ticket
//! ([`ticket_keys`]), or as a TLS 1.3 PSK ([`psk`], with 0-RTT data handled
//! by [`early_data`]).

pub mod binder;
pub mod early_data;
pub mod psk;
pub mod store;
pub mod ticket;
pub mod ticket_keys;
pub mod validator;

use hitls_types::{ProtocolVersion, SessionError};
use zeroize::Zeroize;

/// Maximum session ID length (RFC 5246 §7.4.1.2).
pub const MAX_SESSION_ID_LEN: usize = 32;

/// Default session lifetime in seconds (1 hour).
pub const DEFAULT_SESSION_LIFETIME: u64 = 3600;

/// Seconds since the UNIX epoch.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// TLS 1.3 PSK resumption state carried by a [`SessionKind::Psk`] session.
#[derive(Clone, PartialEq, Eq)]
pub struct PskState {
    identity: Vec<u8>,
    ticket_age_add: u32,
    ticket_nonce: Vec<u8>,
    resumption_master_secret: Vec<u8>,
    early_data_allowed: bool,
    max_early_data_size: u32,
}

impl Drop for PskState {
    fn drop(&mut self) {
        self.resumption_master_secret.zeroize();
    }
}

impl PskState {
    pub fn new(
        identity: Vec<u8>,
        ticket_age_add: u32,
        ticket_nonce: Vec<u8>,
        resumption_master_secret: Vec<u8>,
    ) -> Self {
        Self {
            identity,
            ticket_age_add,
            ticket_nonce,
            resumption_master_secret,
            early_data_allowed: false,
            max_early_data_size: 0,
        }
    }

    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    pub fn set_identity(&mut self, identity: Vec<u8>) {
        self.identity = identity;
    }

    pub fn ticket_age_add(&self) -> u32 {
        self.ticket_age_add
    }

    pub fn set_ticket_age_add(&mut self, ticket_age_add: u32) {
        self.ticket_age_add = ticket_age_add;
    }

    pub fn ticket_nonce(&self) -> &[u8] {
        &self.ticket_nonce
    }

    pub fn set_ticket_nonce(&mut self, nonce: Vec<u8>) {
        self.ticket_nonce = nonce;
    }

    pub fn resumption_master_secret(&self) -> &[u8] {
        &self.resumption_master_secret
    }

    pub fn set_resumption_master_secret(&mut self, secret: Vec<u8>) {
        self.resumption_master_secret.zeroize();
        self.resumption_master_secret = secret;
    }

    pub fn early_data_allowed(&self) -> bool {
        self.early_data_allowed
    }

    pub fn set_early_data_allowed(&mut self, allowed: bool) {
        self.early_data_allowed = allowed;
    }

    pub fn max_early_data_size(&self) -> u32 {
        self.max_early_data_size
    }

    /// Set the 0-RTT limit. A nonzero limit enables early data, zero disables it.
    pub fn set_max_early_data_size(&mut self, max: u32) {
        self.max_early_data_size = max;
        self.early_data_allowed = max > 0;
    }

    /// `obfuscated_ticket_age = (ticket_age_ms + ticket_age_add) mod 2^32`
    /// (RFC 8446 §4.2.11.1).
    pub fn obfuscated_ticket_age(&self, ticket_age_ms: u32) -> u32 {
        ticket_age_ms.wrapping_add(self.ticket_age_add)
    }

    /// Recover the client's view of the ticket age from the obfuscated value.
    pub fn ticket_age_from_obfuscated(&self, obfuscated_age: u32) -> u32 {
        obfuscated_age.wrapping_sub(self.ticket_age_add)
    }
}

impl std::fmt::Debug for PskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PskState")
            .field("identity", &String::from_utf8_lossy(&self.identity))
            .field("ticket_age_add", &self.ticket_age_add)
            .field("early_data_allowed", &self.early_data_allowed)
            .field("max_early_data_size", &self.max_early_data_size)
            .finish_non_exhaustive()
    }
}

/// Which resumption mechanism a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKind {
    /// Session-ID or ticket resumption.
    Standard,
    /// TLS 1.3 PSK resumption.
    Psk(PskState),
}

/// A TLS session that can be used for resumption.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    id: Vec<u8>,
    cipher_suite: String,
    master_secret: Vec<u8>,
    version: u16,
    created_at: u64,
    lifetime: u64,
    kind: SessionKind,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.master_secret.zeroize();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &hex::encode(&self.id))
            .field("cipher_suite", &self.cipher_suite)
            .field("version", &format_args!("0x{:04x}", self.version))
            .field("created_at", &self.created_at)
            .field("lifetime", &self.lifetime)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a standard session. `created_at` of 0 means "now".
    pub fn new(
        id: Vec<u8>,
        cipher_suite: impl Into<String>,
        master_secret: Vec<u8>,
        version: u16,
        created_at: u64,
    ) -> Result<Self, SessionError> {
        check_session_id(&id)?;
        Ok(Self {
            id,
            cipher_suite: cipher_suite.into(),
            master_secret,
            version,
            created_at: if created_at != 0 { created_at } else { unix_now() },
            lifetime: DEFAULT_SESSION_LIFETIME,
            kind: SessionKind::Standard,
        })
    }

    /// Create a TLS 1.3 PSK session; the version is fixed to TLS 1.3.
    pub fn new_psk(
        id: Vec<u8>,
        cipher_suite: impl Into<String>,
        master_secret: Vec<u8>,
        created_at: u64,
        psk: PskState,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(
            id,
            cipher_suite,
            master_secret,
            ProtocolVersion::TLS1_3.0,
            created_at,
        )?;
        session.kind = SessionKind::Psk(psk);
        Ok(session)
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// Replace the session ID. IDs longer than 32 bytes are rejected.
    pub fn set_id(&mut self, id: Vec<u8>) -> Result<(), SessionError> {
        check_session_id(&id)?;
        self.id = id;
        Ok(())
    }

    pub fn cipher_suite(&self) -> &str {
        &self.cipher_suite
    }

    pub fn set_cipher_suite(&mut self, cipher_suite: impl Into<String>) {
        self.cipher_suite = cipher_suite.into();
    }

    pub fn master_secret(&self) -> &[u8] {
        &self.master_secret
    }

    pub fn set_master_secret(&mut self, master_secret: Vec<u8>) {
        self.master_secret.zeroize();
        self.master_secret = master_secret;
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn set_version(&mut self, version: u16) {
        self.version = version;
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn set_created_at(&mut self, created_at: u64) {
        self.created_at = created_at;
    }

    /// Lifetime in seconds.
    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }

    pub fn set_lifetime(&mut self, lifetime: u64) {
        self.lifetime = lifetime;
    }

    pub fn kind(&self) -> &SessionKind {
        &self.kind
    }

    /// PSK state, if this is a TLS 1.3 PSK session.
    pub fn psk(&self) -> Option<&PskState> {
        match &self.kind {
            SessionKind::Psk(psk) => Some(psk),
            SessionKind::Standard => None,
        }
    }

    pub fn psk_mut(&mut self) -> Option<&mut PskState> {
        match &mut self.kind {
            SessionKind::Psk(psk) => Some(psk),
            SessionKind::Standard => None,
        }
    }

    pub fn is_psk(&self) -> bool {
        matches!(self.kind, SessionKind::Psk(_))
    }

    /// Whether the session is still usable at `now` (unix seconds).
    ///
    /// Valid iff `now < created_at + lifetime`.
    pub fn is_valid_at(&self, now: u64) -> bool {
        now < self.created_at.saturating_add(self.lifetime)
    }

    /// [`is_valid_at`](Self::is_valid_at) against the system clock.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(unix_now())
    }
}

fn check_session_id(id: &[u8]) -> Result<(), SessionError> {
    if id.len() > MAX_SESSION_ID_LEN {
        return Err(SessionError::SessionIdTooLong(id.len()));
    }
    Ok(())
}

//! TLS 1.3 PSK session management (RFC 8446 §4.6.1).

use std::collections::HashMap;

use hitls_types::SessionError;

use super::{unix_now, PskState, Session, DEFAULT_SESSION_LIFETIME};
use crate::config::ResumptionConfig;
use crate::crypt::hkdf::HkdfLabelExpander;
use crate::crypt::{fill_random, random_bytes, random_hex, SuiteKeyParams};
use crate::CipherSuite;

/// Issues TLS 1.3 PSK sessions and indexes them by PSK identity.
#[derive(Debug)]
pub struct PskSessionManager {
    sessions: HashMap<Vec<u8>, Session>,
    ticket_age_add: u32,
    early_data_allowed: bool,
    max_early_data_size: u32,
    session_lifetime: u64,
}

impl PskSessionManager {
    /// Create a manager with a random non-zero `ticket_age_add`.
    pub fn new() -> Result<Self, SessionError> {
        Self::with_ticket_age_add(random_ticket_age_add()?)
    }

    /// Create a manager with a fixed `ticket_age_add`. Zero is rejected since
    /// it leaves ticket ages unobfuscated.
    pub fn with_ticket_age_add(ticket_age_add: u32) -> Result<Self, SessionError> {
        if ticket_age_add == 0 {
            return Err(SessionError::InvalidInput(
                "ticket_age_add must be nonzero".into(),
            ));
        }
        Ok(Self {
            sessions: HashMap::new(),
            ticket_age_add,
            early_data_allowed: false,
            max_early_data_size: 0,
            session_lifetime: DEFAULT_SESSION_LIFETIME,
        })
    }

    pub fn from_config(config: &ResumptionConfig) -> Result<Self, SessionError> {
        let ticket_age_add = match config.ticket_age_add {
            Some(v) => v,
            None => random_ticket_age_add()?,
        };
        let mut mgr = Self::with_ticket_age_add(ticket_age_add)?;
        mgr.session_lifetime = config.session_lifetime;
        mgr.early_data_allowed = config.early_data_enabled;
        if config.max_early_data_size > 0 {
            mgr.set_max_early_data_size(config.max_early_data_size);
        }
        Ok(mgr)
    }

    pub fn ticket_age_add(&self) -> u32 {
        self.ticket_age_add
    }

    /// Create and index a PSK session for a completed TLS 1.3 handshake.
    ///
    /// A random 16-byte nonce is generated when `ticket_nonce` is `None` or
    /// empty. Returns a copy of the stored session.
    pub fn create_psk_session(
        &mut self,
        cipher_suite: &str,
        master_secret: &[u8],
        resumption_master_secret: &[u8],
        ticket_nonce: Option<&[u8]>,
    ) -> Result<Session, SessionError> {
        let identity = random_hex(16)?.into_bytes();
        let nonce = match ticket_nonce {
            Some(n) if !n.is_empty() => n.to_vec(),
            _ => random_bytes(16)?,
        };

        let mut psk = PskState::new(
            identity.clone(),
            self.ticket_age_add,
            nonce,
            resumption_master_secret.to_vec(),
        );
        if self.early_data_allowed {
            psk.set_early_data_allowed(true);
            psk.set_max_early_data_size(self.max_early_data_size);
        }

        let mut session = Session::new_psk(
            random_hex(16)?.into_bytes(),
            cipher_suite,
            master_secret.to_vec(),
            unix_now(),
            psk,
        )?;
        session.set_lifetime(self.session_lifetime);

        self.sessions.insert(identity, session.clone());
        Ok(session)
    }

    pub fn get_session_by_psk_identity(&mut self, identity: &[u8]) -> Option<Session> {
        self.get_session_by_psk_identity_at(identity, unix_now())
    }

    /// Lookup against an explicit clock; an expired session is evicted.
    pub fn get_session_by_psk_identity_at(
        &mut self,
        identity: &[u8],
        now: u64,
    ) -> Option<Session> {
        let session = self.sessions.get(identity)?;
        if !session.is_valid_at(now) {
            log::debug!("evicting expired psk session");
            self.sessions.remove(identity);
            return None;
        }
        Some(session.clone())
    }

    pub fn remove_psk_session(&mut self, identity: &[u8]) -> bool {
        self.sessions.remove(identity).is_some()
    }

    pub fn clean_expired_psk_sessions(&mut self) -> usize {
        self.clean_expired_psk_sessions_at(unix_now())
    }

    pub fn clean_expired_psk_sessions_at(&mut self, now: u64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.is_valid_at(now));
        let removed = before - self.sessions.len();
        if removed > 0 {
            log::debug!("swept {removed} expired psk sessions");
        }
        removed
    }

    /// Drop every PSK session.
    pub fn clean_all_sessions(&mut self) {
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
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

    /// Set the 0-RTT limit for new sessions. Nonzero enables early data.
    pub fn set_max_early_data_size(&mut self, max: u32) {
        self.max_early_data_size = max;
        self.early_data_allowed = max > 0;
    }
}

/// `resumption_psk = HKDF-Expand-Label(rms, "resumption", ticket_nonce, Hash.length)`
///
/// The hash comes from the session's cipher suite.
pub fn derive_resumption_psk(
    session: &Session,
    hkdf: &dyn HkdfLabelExpander,
) -> Result<Vec<u8>, SessionError> {
    let psk = session
        .psk()
        .ok_or_else(|| SessionError::InvalidInput("not a PSK session".into()))?;
    let suite = CipherSuite::from_name(session.cipher_suite()).ok_or_else(|| {
        SessionError::InvalidInput(format!("unknown cipher suite {}", session.cipher_suite()))
    })?;
    let hash = SuiteKeyParams::from_suite(suite)?.hash;
    hkdf.expand_label(
        hash,
        psk.resumption_master_secret(),
        b"resumption",
        psk.ticket_nonce(),
        hash.output_size(),
    )
}

fn random_ticket_age_add() -> Result<u32, SessionError> {
    let mut buf = [0u8; 4];
    loop {
        fill_random(&mut buf)?;
        let v = u32::from_be_bytes(buf);
        if v != 0 {
            return Ok(v);
        }
    }
}

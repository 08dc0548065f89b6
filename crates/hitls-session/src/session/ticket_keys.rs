//! Ticket key ring and RFC 5077 ticket sealing/opening.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hitls_types::{ProtocolVersion, SessionError};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::ticket::SessionTicket;
use super::{unix_now, Session};
use crate::config::ResumptionConfig;
use crate::crypt::ticket_cipher::{
    ticket_hmac, verify_ticket_hmac, Aes256CbcCipher, TicketCipher, TICKET_IV_LEN, TICKET_KEY_LEN,
};
use crate::crypt::{fill_random, random_hex};

/// Default number of keys kept by [`TicketKeyManager::rotate`].
pub const DEFAULT_MAX_TICKET_KEYS: usize = 3;

/// Default ticket lifetime hint in seconds (24 hours).
pub const DEFAULT_TICKET_LIFETIME: u64 = 86400;

/// A named ticket encryption/HMAC key pair.
pub struct TicketKey {
    name: String,
    encryption_key: [u8; TICKET_KEY_LEN],
    hmac_key: [u8; TICKET_KEY_LEN],
    created_at: u64,
    generation: u64,
}

impl Drop for TicketKey {
    fn drop(&mut self) {
        self.encryption_key.zeroize();
        self.hmac_key.zeroize();
    }
}

impl std::fmt::Debug for TicketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketKey")
            .field("name", &self.name)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl TicketKey {
    /// 16 lowercase hex characters.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    pub fn hmac_key(&self) -> &[u8] {
        &self.hmac_key
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }
}

/// Plaintext carried inside a ticket.
#[derive(Serialize, Deserialize)]
struct TicketState {
    session_id: String,
    cipher_suite: String,
    master_secret: String,
    creation_time: u64,
}

impl Drop for TicketState {
    fn drop(&mut self) {
        self.master_secret.zeroize();
    }
}

/// Issues and redeems session tickets under a rotating key ring.
///
/// Exactly one key is active for new tickets; older keys stay available for
/// decryption until rotated out.
pub struct TicketKeyManager {
    keys: HashMap<String, TicketKey>,
    active: Option<String>,
    next_generation: u64,
    ticket_lifetime: u64,
    max_keys: usize,
    cipher: Box<dyn TicketCipher>,
}

impl std::fmt::Debug for TicketKeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketKeyManager")
            .field("keys", &self.keys.len())
            .field("active", &self.active)
            .field("ticket_lifetime", &self.ticket_lifetime)
            .field("max_keys", &self.max_keys)
            .finish()
    }
}

impl TicketKeyManager {
    /// Create a manager with one freshly generated active key.
    pub fn new() -> Result<Self, SessionError> {
        let mut mgr = Self::empty();
        mgr.generate_new_key()?;
        Ok(mgr)
    }

    /// Create a manager with an empty key ring.
    pub fn empty() -> Self {
        Self {
            keys: HashMap::new(),
            active: None,
            next_generation: 0,
            ticket_lifetime: DEFAULT_TICKET_LIFETIME,
            max_keys: DEFAULT_MAX_TICKET_KEYS,
            cipher: Box::new(Aes256CbcCipher),
        }
    }

    pub fn from_config(config: &ResumptionConfig) -> Result<Self, SessionError> {
        let mut mgr = Self::new()?;
        mgr.ticket_lifetime = config.ticket_lifetime;
        mgr.max_keys = config.max_ticket_keys;
        Ok(mgr)
    }

    /// Replace the state cipher.
    pub fn with_cipher(mut self, cipher: Box<dyn TicketCipher>) -> Self {
        self.cipher = cipher;
        self
    }

    /// Generate a key and make it active. Returns its name.
    pub fn generate_new_key(&mut self) -> Result<String, SessionError> {
        let name = random_hex(8)?;
        let mut key = TicketKey {
            name: name.clone(),
            encryption_key: [0u8; TICKET_KEY_LEN],
            hmac_key: [0u8; TICKET_KEY_LEN],
            created_at: unix_now(),
            generation: self.next_generation,
        };
        fill_random(&mut key.encryption_key)?;
        fill_random(&mut key.hmac_key)?;
        self.next_generation += 1;

        self.keys.insert(name.clone(), key);
        self.active = Some(name.clone());
        log::debug!("generated ticket key {name}");
        Ok(name)
    }

    /// Generate a new active key and keep only the `max_keys` newest.
    ///
    /// Returns the active key name afterwards.
    pub fn rotate_keys(&mut self, max_keys: usize) -> Result<String, SessionError> {
        if max_keys == 0 {
            return Err(SessionError::InvalidInput(
                "rotate_keys: max_keys must be at least 1".into(),
            ));
        }
        self.generate_new_key()?;

        let mut order: Vec<(u64, u64, String)> = self
            .keys
            .values()
            .map(|k| (k.created_at, k.generation, k.name.clone()))
            .collect();
        order.sort_unstable_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
        let dropped: Vec<String> = order.iter().skip(max_keys).map(|e| e.2.clone()).collect();
        for name in &dropped {
            self.keys.remove(name);
        }

        let active_kept = self
            .active
            .as_ref()
            .is_some_and(|name| self.keys.contains_key(name));
        if !active_kept {
            self.active = order.first().map(|e| e.2.clone());
        }
        log::debug!(
            "rotated ticket keys: {} retained, {} dropped",
            self.keys.len(),
            dropped.len()
        );
        self.active.clone().ok_or(SessionError::NoTicketKey)
    }

    /// [`rotate_keys`](Self::rotate_keys) with the configured ring size.
    pub fn rotate(&mut self) -> Result<String, SessionError> {
        self.rotate_keys(self.max_keys)
    }

    pub fn active_key(&self) -> Option<&TicketKey> {
        self.keys.get(self.active.as_deref()?)
    }

    pub fn key_by_name(&self, name: &str) -> Option<&TicketKey> {
        self.keys.get(name)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Lifetime hint in seconds advertised with new tickets.
    pub fn ticket_lifetime(&self) -> u64 {
        self.ticket_lifetime
    }

    pub fn set_ticket_lifetime(&mut self, lifetime: u64) {
        self.ticket_lifetime = lifetime;
    }

    /// Seal `session` into a ticket under the active key.
    pub fn create_ticket(&self, session: &Session) -> Result<SessionTicket, SessionError> {
        let key = self.active_key().ok_or(SessionError::NoTicketKey)?;

        let mut iv = vec![0u8; TICKET_IV_LEN];
        fill_random(&mut iv)?;

        let state = TicketState {
            session_id: hex::encode(session.id()),
            cipher_suite: session.cipher_suite().to_string(),
            master_secret: BASE64.encode(session.master_secret()),
            creation_time: session.created_at(),
        };
        let mut plaintext =
            serde_json::to_vec(&state).map_err(|e| SessionError::Serialization(e.to_string()))?;
        let encrypted = self.cipher.encrypt(&plaintext, &key.encryption_key, &iv);
        plaintext.zeroize();
        let encrypted_state = encrypted?;

        let hmac = ticket_hmac(&key.hmac_key, key.name.as_bytes(), &iv, &encrypted_state)?;
        Ok(SessionTicket::new(
            key.name.as_bytes().to_vec(),
            iv,
            encrypted_state,
            hmac,
        ))
    }

    /// Authenticate and open a ticket.
    ///
    /// Returns `None` for unknown keys, bad MACs, or undecodable state; the
    /// caller falls back to a full handshake.
    pub fn decrypt_ticket(&self, ticket: &SessionTicket) -> Option<Session> {
        let name = std::str::from_utf8(&ticket.key_name).ok()?;
        let Some(key) = self.keys.get(name) else {
            log::warn!("ticket for unknown key {name}");
            return None;
        };

        if !verify_ticket_hmac(
            &key.hmac_key,
            &ticket.key_name,
            &ticket.iv,
            &ticket.encrypted_state,
            &ticket.hmac,
        ) {
            log::warn!("ticket hmac mismatch for key {name}");
            return None;
        }

        let mut plaintext = self
            .cipher
            .decrypt(&ticket.encrypted_state, &key.encryption_key, &ticket.iv)
            .ok()?;
        let parsed = serde_json::from_slice::<TicketState>(&plaintext);
        plaintext.zeroize();
        let state = match parsed {
            Ok(state) => state,
            Err(e) => {
                log::warn!("ticket state rejected: {e}");
                return None;
            }
        };

        let id = hex::decode(&state.session_id).ok()?;
        let master_secret = BASE64.decode(&state.master_secret).ok()?;
        Session::new(
            id,
            state.cipher_suite.as_str(),
            master_secret,
            ProtocolVersion::TLS1_2.0,
            state.creation_time,
        )
        .ok()
    }

    /// Parse wire bytes and open the ticket. Malformed input yields `None`.
    pub fn decode_and_decrypt(&self, data: &[u8]) -> Option<Session> {
        let ticket = SessionTicket::decode(data).ok()?;
        self.decrypt_ticket(&ticket)
    }
}

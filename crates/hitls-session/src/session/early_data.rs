//! TLS 1.3 0-RTT early data storage with single-use anti-replay.

use std::collections::{HashMap, HashSet};

use hitls_types::SessionError;

use super::{unix_now, Session, DEFAULT_SESSION_LIFETIME};
use crate::config::ResumptionConfig;
use crate::crypt::random_hex;

#[derive(Debug)]
struct EarlyDataRecord {
    data: Vec<u8>,
    psk_identity: Vec<u8>,
    timestamp: u64,
}

/// Holds 0-RTT payloads until the handshake confirms them.
///
/// Each record can be released at most once; a released payload is dropped
/// and only its ID is kept to refuse replays. Wrap the manager in
/// `Arc<Mutex<_>>` when several connections share it.
#[derive(Debug)]
pub struct EarlyDataManager {
    records: HashMap<String, EarlyDataRecord>,
    used: HashSet<String>,
    session_lifetime: u64,
}

impl Default for EarlyDataManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EarlyDataManager {
    pub fn new() -> Self {
        Self::with_session_lifetime(DEFAULT_SESSION_LIFETIME)
    }

    /// `session_lifetime` bounds how long after session creation early data
    /// may be released, independent of the session's own lifetime.
    pub fn with_session_lifetime(session_lifetime: u64) -> Self {
        Self {
            records: HashMap::new(),
            used: HashSet::new(),
            session_lifetime,
        }
    }

    pub fn from_config(config: &ResumptionConfig) -> Self {
        Self::with_session_lifetime(config.early_data_session_lifetime)
    }

    /// Store a 0-RTT payload for a PSK session and return its ID.
    pub fn store_early_data(
        &mut self,
        session: &Session,
        data: &[u8],
    ) -> Result<String, SessionError> {
        let psk = session.psk().ok_or_else(|| {
            SessionError::InvalidInput("early data requires a PSK session".into())
        })?;
        let max = psk.max_early_data_size();
        if data.len() > max as usize {
            return Err(SessionError::EarlyDataTooLarge {
                size: data.len(),
                max,
            });
        }

        let id = random_hex(16)?;
        self.records.insert(
            id.clone(),
            EarlyDataRecord {
                data: data.to_vec(),
                psk_identity: psk.identity().to_vec(),
                timestamp: unix_now(),
            },
        );
        Ok(id)
    }

    pub fn get_and_validate_early_data(&mut self, session: &Session, id: &str) -> Option<Vec<u8>> {
        self.get_and_validate_early_data_at(session, id, unix_now())
    }

    /// Release a payload once. Returns `None` if the ID is unknown, already
    /// consumed, bound to another PSK identity, or the session is past the
    /// manager's lifetime.
    pub fn get_and_validate_early_data_at(
        &mut self,
        session: &Session,
        id: &str,
        now: u64,
    ) -> Option<Vec<u8>> {
        if self.used.contains(id) {
            log::warn!("replayed early data {id}");
            return None;
        }
        let record = self.records.get(id)?;
        let psk = session.psk()?;
        if record.psk_identity != psk.identity() {
            return None;
        }
        if now > session.created_at().saturating_add(self.session_lifetime) {
            return None;
        }
        if !self.used.insert(id.to_string()) {
            return None;
        }
        let record = self.records.remove(id)?;
        log::debug!(
            "released early data {id} ({} bytes, held {}s)",
            record.data.len(),
            now.saturating_sub(record.timestamp)
        );
        Some(record.data)
    }

    /// Number of stored payloads not yet released.
    pub fn pending_count(&self) -> usize {
        self.records.len()
    }

    pub fn clear_all_early_data(&mut self) {
        self.records.clear();
        self.used.clear();
    }
}

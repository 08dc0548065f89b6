//! Server-side session caches for session-ID resumption.

use std::collections::HashMap;

use hitls_types::{ProtocolVersion, SessionError};

use super::{unix_now, Session, DEFAULT_SESSION_LIFETIME};
use crate::crypt::{random_bytes, random_hex};

/// Session cache interface.
///
/// Lookups hand out copies; the store keeps the authoritative entry.
/// An expired entry is evicted when it is looked up and reported as absent.
pub trait SessionStore: Send + Sync {
    /// Create a fresh session for a completed full handshake and store it.
    fn create(
        &mut self,
        cipher_suite: &str,
        master_secret: &[u8],
    ) -> Result<Session, SessionError>;

    /// Look up a session by ID.
    fn get(&mut self, id: &[u8]) -> Option<Session>;

    /// Insert or replace a session keyed by its ID.
    ///
    /// Returns `false` only for a session with an empty ID.
    fn store(&mut self, session: Session) -> bool;

    /// Remove a session. Returns `false` if it was not present.
    fn remove(&mut self, id: &[u8]) -> bool;

    /// Sweep expired sessions; returns how many were removed.
    fn clean_expired(&mut self) -> usize;

    /// Number of stored sessions, expired or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// InMemorySessionStore
// ---------------------------------------------------------------------------

/// In-memory store that expires each session by its own lifetime.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: HashMap<Vec<u8>, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// [`SessionStore::get`] against an explicit clock.
    pub fn get_at(&mut self, id: &[u8], now: u64) -> Option<Session> {
        let session = self.sessions.get(id)?;
        if !session.is_valid_at(now) {
            log::debug!("evicting expired session {}", hex::encode(id));
            self.sessions.remove(id);
            return None;
        }
        Some(session.clone())
    }

    /// [`SessionStore::clean_expired`] against an explicit clock.
    pub fn clean_expired_at(&mut self, now: u64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.is_valid_at(now));
        let removed = before - self.sessions.len();
        if removed > 0 {
            log::debug!("swept {removed} expired sessions");
        }
        removed
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(
        &mut self,
        cipher_suite: &str,
        master_secret: &[u8],
    ) -> Result<Session, SessionError> {
        let id = random_hex(16)?.into_bytes();
        let session = Session::new(
            id,
            cipher_suite,
            master_secret.to_vec(),
            ProtocolVersion::TLS1_2.0,
            unix_now(),
        )?;
        self.sessions.insert(session.id().to_vec(), session.clone());
        Ok(session)
    }

    fn get(&mut self, id: &[u8]) -> Option<Session> {
        self.get_at(id, unix_now())
    }

    fn store(&mut self, session: Session) -> bool {
        if session.id().is_empty() {
            return false;
        }
        self.sessions.insert(session.id().to_vec(), session);
        true
    }

    fn remove(&mut self, id: &[u8]) -> bool {
        self.sessions.remove(id).is_some()
    }

    fn clean_expired(&mut self) -> usize {
        self.clean_expired_at(unix_now())
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

// ---------------------------------------------------------------------------
// SessionIdStore
// ---------------------------------------------------------------------------

/// Session-ID cache for TLS 1.2 and earlier.
///
/// Expiry uses the store's lifetime rather than the session's: an entry is
/// kept while `now <= created_at + lifetime`.
#[derive(Debug)]
pub struct SessionIdStore {
    sessions: HashMap<Vec<u8>, Session>,
    lifetime: u64,
}

impl Default for SessionIdStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIdStore {
    pub fn new() -> Self {
        Self::with_lifetime(DEFAULT_SESSION_LIFETIME)
    }

    /// Create a store with a custom lifetime in seconds.
    pub fn with_lifetime(lifetime: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            lifetime,
        }
    }

    pub fn from_config(config: &crate::config::ResumptionConfig) -> Self {
        Self::with_lifetime(config.session_id_lifetime)
    }

    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }

    fn is_expired(&self, session: &Session, now: u64) -> bool {
        now > session.created_at().saturating_add(self.lifetime)
    }

    pub fn get_at(&mut self, id: &[u8], now: u64) -> Option<Session> {
        let session = self.sessions.get(id)?;
        if self.is_expired(session, now) {
            log::debug!("evicting expired session {}", hex::encode(id));
            self.sessions.remove(id);
            return None;
        }
        Some(session.clone())
    }

    pub fn clean_expired_at(&mut self, now: u64) -> usize {
        let lifetime = self.lifetime;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| now <= s.created_at().saturating_add(lifetime));
        let removed = before - self.sessions.len();
        if removed > 0 {
            log::debug!("swept {removed} expired session ids");
        }
        removed
    }

    /// Drop every cached session.
    pub fn clear_all(&mut self) {
        self.sessions.clear();
    }
}

impl SessionStore for SessionIdStore {
    fn create(
        &mut self,
        cipher_suite: &str,
        master_secret: &[u8],
    ) -> Result<Session, SessionError> {
        let mut session = Session::new(
            random_bytes(32)?,
            cipher_suite,
            master_secret.to_vec(),
            ProtocolVersion::TLS1_2.0,
            unix_now(),
        )?;
        session.set_lifetime(self.lifetime);
        self.sessions.insert(session.id().to_vec(), session.clone());
        Ok(session)
    }

    fn get(&mut self, id: &[u8]) -> Option<Session> {
        self.get_at(id, unix_now())
    }

    fn store(&mut self, session: Session) -> bool {
        if session.id().is_empty() {
            return false;
        }
        self.sessions.insert(session.id().to_vec(), session);
        true
    }

    fn remove(&mut self, id: &[u8]) -> bool {
        self.sessions.remove(id).is_some()
    }

    fn clean_expired(&mut self) -> usize {
        self.clean_expired_at(unix_now())
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn session_at(id: &[u8], created_at: u64) -> Session {
        Session::new(
            id.to_vec(),
            "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
            vec![0x5A; 48],
            0x0303,
            created_at,
        )
        .unwrap()
    }

    // -----------------------------------------------------------------------
    // InMemorySessionStore
    // -----------------------------------------------------------------------

    #[test]
    fn test_create_stores_hex_id() {
        let mut store = InMemorySessionStore::new();
        let s = store.create("TLS_AES_128_GCM_SHA256", &[1; 48]).unwrap();
        assert_eq!(s.id().len(), 32);
        assert!(s.id().iter().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(s.version(), 0x0303);
        assert_eq!(s.lifetime(), DEFAULT_SESSION_LIFETIME);
        assert_eq!(store.len(), 1);

        let fetched = store.get(s.id()).unwrap();
        assert_eq!(fetched, s);
    }

    #[test]
    fn test_store_is_idempotent_upsert() {
        let mut store = InMemorySessionStore::new();
        let mut s = session_at(b"abc", unix_now());
        assert!(store.store(s.clone()));
        assert!(store.store(s.clone()));
        assert_eq!(store.len(), 1);

        s.set_cipher_suite("TLS_AES_256_GCM_SHA384");
        assert!(store.store(s));
        assert_eq!(
            store.get(b"abc").unwrap().cipher_suite(),
            "TLS_AES_256_GCM_SHA384"
        );
    }

    #[test]
    fn test_store_rejects_empty_id() {
        let mut store = InMemorySessionStore::new();
        assert!(!store.store(session_at(b"", unix_now())));
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut store = InMemorySessionStore::new();
        store.store(session_at(b"k", unix_now()));
        assert!(store.remove(b"k"));
        assert!(!store.remove(b"k"));
        assert!(store.get(b"k").is_none());
    }

    #[test]
    fn test_lazy_eviction_on_get() {
        let mut store = InMemorySessionStore::new();
        store.store(session_at(b"old", 1000));
        assert!(store.get_at(b"old", 1000 + 3599).is_some());
        assert_eq!(store.len(), 1);
        assert!(store.get_at(b"old", 1000 + 3600).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_clean_expired_respects_session_lifetime() {
        let mut store = InMemorySessionStore::new();
        let mut short = session_at(b"short", 1000);
        short.set_lifetime(10);
        store.store(short);
        store.store(session_at(b"long", 1000));

        assert_eq!(store.clean_expired_at(1005), 0);
        assert_eq!(store.clean_expired_at(1010), 1);
        assert!(store.get_at(b"long", 1010).is_some());
        assert!(store.get_at(b"short", 1010).is_none());
    }

    #[test]
    fn test_store_does_not_sweep() {
        let mut store = InMemorySessionStore::new();
        store.store(session_at(b"expired", 1));
        store.store(session_at(b"fresh", unix_now()));
        assert_eq!(store.len(), 2);
        assert_eq!(store.clean_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_returned_copy_is_detached() {
        let mut store = InMemorySessionStore::new();
        store.store(session_at(b"k", unix_now()));
        let mut copy = store.get(b"k").unwrap();
        copy.set_master_secret(vec![0; 4]);
        assert_eq!(store.get(b"k").unwrap().master_secret(), &[0x5A; 48][..]);
    }

    // -----------------------------------------------------------------------
    // SessionIdStore
    // -----------------------------------------------------------------------

    #[test]
    fn test_session_id_store_create() {
        let mut store = SessionIdStore::new();
        let s = store.create("TLS_RSA_WITH_AES_128_CBC_SHA", &[9; 48]).unwrap();
        assert_eq!(s.id().len(), 32);
        assert_eq!(s.version(), 0x0303);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(s.id()).unwrap(), s);
    }

    #[test]
    fn test_session_id_store_uses_store_lifetime() {
        let mut store = SessionIdStore::with_lifetime(100);
        let mut s = session_at(b"id", 1000);
        // a longer per-session lifetime does not extend the store's
        s.set_lifetime(10_000);
        store.store(s);
        assert!(store.get_at(b"id", 1100).is_some());
        assert!(store.get_at(b"id", 1101).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_session_id_store_clean_and_clear() {
        let mut store = SessionIdStore::with_lifetime(50);
        store.store(session_at(b"a", 1000));
        store.store(session_at(b"b", 2000));
        store.store(session_at(b"c", 2000));
        assert_eq!(store.clean_expired_at(2000), 1);
        assert_eq!(store.len(), 2);
        store.clear_all();
        assert!(store.is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = crate::config::ResumptionConfig::builder()
            .session_id_lifetime(120)
            .build()
            .unwrap();
        assert_eq!(SessionIdStore::from_config(&config).lifetime(), 120);
    }

    #[test]
    fn test_store_trait_object() {
        let mut stores: Vec<Box<dyn SessionStore>> = vec![
            Box::new(InMemorySessionStore::new()),
            Box::new(SessionIdStore::new()),
        ];
        for store in &mut stores {
            let s = store.create("TLS_AES_128_GCM_SHA256", &[0; 32]).unwrap();
            assert!(store.get(s.id()).is_some());
            assert!(store.remove(s.id()));
            assert!(store.is_empty());
        }
    }

    #[test]
    fn test_concurrent_store_access() {
        let store = Arc::new(Mutex::new(InMemorySessionStore::new()));
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let id = [b'a' + i; 8];
                    let mut guard = store.lock().unwrap();
                    guard.store(session_at(&id, unix_now()));
                    guard.get(&id).is_some()
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(store.lock().unwrap().len(), 8);
    }
}

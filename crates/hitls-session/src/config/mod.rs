//! Resumption configuration.

use hitls_types::SessionError;

use crate::session::ticket_keys::{DEFAULT_MAX_TICKET_KEYS, DEFAULT_TICKET_LIFETIME};
use crate::session::DEFAULT_SESSION_LIFETIME;

/// Tunables shared by the session managers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumptionConfig {
    /// Lifetime given to new PSK sessions, in seconds.
    pub session_lifetime: u64,
    /// Store-level lifetime of the session-ID cache.
    pub session_id_lifetime: u64,
    /// Ticket lifetime hint for NewSessionTicket.
    pub ticket_lifetime: u64,
    /// Ticket keys kept across rotations.
    pub max_ticket_keys: usize,
    pub early_data_enabled: bool,
    /// 0-RTT limit for new PSK sessions. Nonzero enables early data.
    pub max_early_data_size: u32,
    /// How long after session creation early data may be released.
    pub early_data_session_lifetime: u64,
    /// Fixed `ticket_age_add`; random when `None`.
    pub ticket_age_add: Option<u32>,
}

impl Default for ResumptionConfig {
    fn default() -> Self {
        Self {
            session_lifetime: DEFAULT_SESSION_LIFETIME,
            session_id_lifetime: DEFAULT_SESSION_LIFETIME,
            ticket_lifetime: DEFAULT_TICKET_LIFETIME,
            max_ticket_keys: DEFAULT_MAX_TICKET_KEYS,
            early_data_enabled: false,
            max_early_data_size: 0,
            early_data_session_lifetime: DEFAULT_SESSION_LIFETIME,
            ticket_age_add: None,
        }
    }
}

impl ResumptionConfig {
    pub fn builder() -> ResumptionConfigBuilder {
        ResumptionConfigBuilder::default()
    }
}

/// Builder for `ResumptionConfig`.
#[derive(Debug, Default)]
pub struct ResumptionConfigBuilder {
    config: ResumptionConfig,
}

impl ResumptionConfigBuilder {
    pub fn session_lifetime(mut self, secs: u64) -> Self {
        self.config.session_lifetime = secs;
        self
    }

    pub fn session_id_lifetime(mut self, secs: u64) -> Self {
        self.config.session_id_lifetime = secs;
        self
    }

    pub fn ticket_lifetime(mut self, secs: u64) -> Self {
        self.config.ticket_lifetime = secs;
        self
    }

    pub fn max_ticket_keys(mut self, n: usize) -> Self {
        self.config.max_ticket_keys = n;
        self
    }

    pub fn early_data_enabled(mut self, enabled: bool) -> Self {
        self.config.early_data_enabled = enabled;
        self
    }

    /// Also enables or disables early data, like the PSK setter.
    pub fn max_early_data_size(mut self, size: u32) -> Self {
        self.config.max_early_data_size = size;
        self.config.early_data_enabled = size > 0;
        self
    }

    pub fn early_data_session_lifetime(mut self, secs: u64) -> Self {
        self.config.early_data_session_lifetime = secs;
        self
    }

    /// Fixed `ticket_age_add`; must be nonzero.
    pub fn ticket_age_add(mut self, value: u32) -> Self {
        self.config.ticket_age_add = Some(value);
        self
    }

    pub fn build(self) -> Result<ResumptionConfig, SessionError> {
        let c = &self.config;
        if c.max_ticket_keys == 0 {
            return Err(SessionError::InvalidInput(
                "max_ticket_keys must be at least 1".into(),
            ));
        }
        if c.ticket_age_add == Some(0) {
            return Err(SessionError::InvalidInput(
                "ticket_age_add must be nonzero".into(),
            ));
        }
        for (name, value) in [
            ("session_lifetime", c.session_lifetime),
            ("session_id_lifetime", c.session_id_lifetime),
            ("ticket_lifetime", c.ticket_lifetime),
            ("early_data_session_lifetime", c.early_data_session_lifetime),
        ] {
            if value == 0 {
                return Err(SessionError::InvalidInput(format!("{name} must be nonzero")));
            }
        }
        Ok(self.config)
    }
}

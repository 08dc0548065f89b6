//! Resumption security checks: cipher-suite and version downgrade guards.

use hitls_types::{ProtocolVersion, SessionError};
use serde_json::{Map, Value};

use super::Session;

/// Server-side policy applied to a session before it is resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub allow_downgrade: bool,
    pub require_exact_match: bool,
    pub minimum_tls_version: u16,
    /// Empty means any suite is accepted.
    pub allowed_cipher_suites: Vec<String>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            allow_downgrade: false,
            require_exact_match: true,
            minimum_tls_version: ProtocolVersion::TLS1_2.0,
            allowed_cipher_suites: Vec::new(),
        }
    }
}

impl ServerOptions {
    /// Parse options from a loosely typed map.
    ///
    /// Recognized keys are `allowDowngrade`, `requireExactMatch`,
    /// `minimumTlsVersion` and `allowedCipherSuites`; missing keys take their
    /// defaults and unknown keys are ignored. A value of the wrong type is an
    /// error naming the option.
    pub fn from_values(values: &Map<String, Value>) -> Result<Self, SessionError> {
        let mut opts = Self::default();
        if let Some(v) = values.get("allowDowngrade") {
            opts.allow_downgrade = v.as_bool().ok_or(SessionError::InvalidOption {
                name: "allowDowngrade",
                expected: "bool",
            })?;
        }
        if let Some(v) = values.get("requireExactMatch") {
            opts.require_exact_match = v.as_bool().ok_or(SessionError::InvalidOption {
                name: "requireExactMatch",
                expected: "bool",
            })?;
        }
        if let Some(v) = values.get("minimumTlsVersion") {
            opts.minimum_tls_version = v
                .as_u64()
                .and_then(|n| u16::try_from(n).ok())
                .ok_or(SessionError::InvalidOption {
                    name: "minimumTlsVersion",
                    expected: "integer in 0..=65535",
                })?;
        }
        if let Some(v) = values.get("allowedCipherSuites") {
            let invalid = SessionError::InvalidOption {
                name: "allowedCipherSuites",
                expected: "array of strings",
            };
            let Some(items) = v.as_array() else {
                return Err(invalid);
            };
            let mut suites = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) => suites.push(s.to_string()),
                    None => return Err(invalid),
                }
            }
            opts.allowed_cipher_suites = suites;
        }
        Ok(opts)
    }
}

/// Stateless checks run before a cached session is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSecurityValidator;

impl SessionSecurityValidator {
    pub fn new() -> Self {
        Self
    }

    /// The client must propose the session's exact suite, and may not
    /// propose a lower version unless `allow_downgrade` is set.
    pub fn validate_tls12_session(
        &self,
        session: &Session,
        proposed_cipher_suite: &str,
        proposed_version: u16,
        allow_downgrade: bool,
    ) -> bool {
        if session.cipher_suite() != proposed_cipher_suite {
            return false;
        }
        allow_downgrade || proposed_version >= session.version()
    }

    /// Suite check for a TLS 1.3 PSK. `fuzzy_match` compares ASCII
    /// case-insensitively.
    pub fn validate_tls13_psk(
        &self,
        session: &Session,
        proposed_cipher_suite: &str,
        fuzzy_match: bool,
    ) -> bool {
        if !session.is_psk() {
            return false;
        }
        if fuzzy_match {
            session
                .cipher_suite()
                .eq_ignore_ascii_case(proposed_cipher_suite)
        } else {
            session.cipher_suite() == proposed_cipher_suite
        }
    }

    pub fn validate_session_against_server_options(
        &self,
        session: &Session,
        options: &ServerOptions,
    ) -> bool {
        if !options.allow_downgrade && session.version() < options.minimum_tls_version {
            return false;
        }
        if options.allowed_cipher_suites.is_empty() {
            return true;
        }
        let suite = session.cipher_suite();
        if options.require_exact_match {
            options.allowed_cipher_suites.iter().any(|s| s == suite)
        } else {
            options
                .allowed_cipher_suites
                .iter()
                .any(|s| s.eq_ignore_ascii_case(suite))
        }
    }

    /// Parse `values` with [`ServerOptions::from_values`] and validate.
    pub fn validate_session_against_raw_options(
        &self,
        session: &Session,
        values: &Map<String, Value>,
    ) -> Result<bool, SessionError> {
        let options = ServerOptions::from_values(values)?;
        Ok(self.validate_session_against_server_options(session, &options))
    }
}

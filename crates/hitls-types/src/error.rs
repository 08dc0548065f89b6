/// Session resumption errors.
///
/// Only malformed input and operational failures are errors. Lookup and
/// validation misses (unknown session, expired session, bad ticket MAC,
/// replayed early data) are reported as `None` / `false` by the callers.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    // Invalid input: rejected before any state is touched
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("session id too long: {0} bytes (max 32)")]
    SessionIdTooLong(usize),
    #[error("malformed session ticket: {0}")]
    MalformedTicket(String),
    #[error("early data too large: {size} bytes exceeds limit of {max}")]
    EarlyDataTooLarge { size: usize, max: u32 },
    #[error("invalid option `{name}`: expected {expected}")]
    InvalidOption {
        name: &'static str,
        expected: &'static str,
    },

    // Operational failures: fatal to the current operation
    #[error("no ticket key available")]
    NoTicketKey,
    #[error("unsupported cipher suite: 0x{0:04x}")]
    UnsupportedCipherSuite(u16),
    #[error("random generation failed: {0}")]
    RandomFailure(String),
    #[error("crypto failure: {0}")]
    CryptoFailure(String),
    #[error("session state serialization failed: {0}")]
    Serialization(String),
}

impl SessionError {
    /// Whether this error was caused by caller-supplied input rather than an
    /// operational failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidInput(_)
                | SessionError::SessionIdTooLong(_)
                | SessionError::MalformedTicket(_)
                | SessionError::EarlyDataTooLarge { .. }
                | SessionError::InvalidOption { .. }
        )
    }
}

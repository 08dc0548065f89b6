#![forbid(unsafe_code)]
#![doc = "TLS session resumption for openHiTLS servers: session-ID caching, RFC 5077 tickets, TLS 1.3 PSK and 0-RTT anti-replay."]

pub mod config;
pub mod crypt;
pub mod session;

pub use config::ResumptionConfig;
pub use hitls_types::{ProtocolVersion, SessionError};
pub use session::early_data::EarlyDataManager;
pub use session::psk::PskSessionManager;
pub use session::store::{InMemorySessionStore, SessionIdStore, SessionStore};
pub use session::ticket::SessionTicket;
pub use session::ticket_keys::TicketKeyManager;
pub use session::{PskState, Session, SessionKind};

/// TLS cipher suite identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherSuite(pub u16);

macro_rules! cipher_suites {
    ($($name:ident = $code:expr;)*) => {
        impl CipherSuite {
            $(pub const $name: Self = Self($code);)*

            /// IANA name of a known suite.
            pub fn name(&self) -> Option<&'static str> {
                match *self {
                    $(Self::$name => Some(stringify!($name)),)*
                    _ => None,
                }
            }

            /// Look up a suite by its IANA name (exact match).
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($name) => Some(Self::$name),)*
                    _ => None,
                }
            }
        }
    };
}

cipher_suites! {
    // TLS 1.2 CBC suites (HMAC-SHA1)
    TLS_RSA_WITH_AES_128_CBC_SHA = 0x002F;
    TLS_DHE_RSA_WITH_AES_128_CBC_SHA = 0x0033;
    TLS_RSA_WITH_AES_256_CBC_SHA = 0x0035;
    TLS_DHE_RSA_WITH_AES_256_CBC_SHA = 0x0039;
    TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA = 0xC009;
    TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA = 0xC00A;
    TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA = 0xC013;
    TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA = 0xC014;

    // TLS 1.2 GCM suites
    TLS_RSA_WITH_AES_128_GCM_SHA256 = 0x009C;
    TLS_RSA_WITH_AES_256_GCM_SHA384 = 0x009D;
    TLS_DHE_RSA_WITH_AES_128_GCM_SHA256 = 0x009E;
    TLS_DHE_RSA_WITH_AES_256_GCM_SHA384 = 0x009F;
    TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 = 0xC02B;
    TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 = 0xC02C;
    TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 = 0xC02F;
    TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 = 0xC030;

    // TLS 1.2 ChaCha20-Poly1305 suites
    TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256 = 0xCCA8;
    TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256 = 0xCCA9;
    TLS_DHE_RSA_WITH_CHACHA20_POLY1305_SHA256 = 0xCCAA;

    // TLS 1.3 cipher suites
    TLS_AES_128_GCM_SHA256 = 0x1301;
    TLS_AES_256_GCM_SHA384 = 0x1302;
    TLS_CHACHA20_POLY1305_SHA256 = 0x1303;
}

impl CipherSuite {
    /// Whether this is a TLS 1.3 suite (`TLS_AES_*` / `TLS_CHACHA20_*` in the 0x13 range).
    pub fn is_tls13(&self) -> bool {
        self.0 >> 8 == 0x13
    }
}

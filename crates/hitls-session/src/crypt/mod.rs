//! Cryptographic support for session resumption.
//!
//! Bridges the resumption logic with the PRF/HKDF/cipher primitives and
//! holds the per-suite key-length table.

pub mod hkdf;
pub mod keys;
pub mod prf;
pub mod ticket_cipher;

use crate::CipherSuite;
use hitls_types::{CipherMode, HashAlgId, SessionError};

/// Key material sizes for a cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteKeyParams {
    /// The cipher suite identifier.
    pub suite: CipherSuite,
    /// Bulk encryption key length in bytes (16 for AES-128, 32 for AES-256/ChaCha20).
    pub key_len: usize,
    /// Write IV length from the key block (16 for CBC, 4 for TLS 1.2 GCM, 12 otherwise).
    pub iv_len: usize,
    /// MAC key length (20 for HMAC-SHA1 CBC suites, 0 for AEAD).
    pub mac_key_len: usize,
    /// PRF / HKDF hash.
    pub hash: HashAlgId,
    /// Record protection mode.
    pub mode: CipherMode,
}

impl SuiteKeyParams {
    const fn cbc(suite: CipherSuite, key_len: usize) -> Self {
        Self {
            suite,
            key_len,
            iv_len: 16,
            mac_key_len: 20,
            hash: HashAlgId::Sha256,
            mode: CipherMode::Cbc,
        }
    }

    const fn aead(suite: CipherSuite, key_len: usize, iv_len: usize, hash: HashAlgId) -> Self {
        Self {
            suite,
            key_len,
            iv_len,
            mac_key_len: 0,
            hash,
            mode: CipherMode::Aead,
        }
    }

    /// Look up key sizes for a cipher suite.
    ///
    /// Unknown suites are rejected rather than mapped to a default size.
    pub fn from_suite(suite: CipherSuite) -> Result<Self, SessionError> {
        use HashAlgId::{Sha256, Sha384};
        let params = match suite {
            // --- CBC (MAC-then-encrypt, HMAC-SHA1) ---
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA
            | CipherSuite::TLS_DHE_RSA_WITH_AES_128_CBC_SHA
            | CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA
            | CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA => Self::cbc(suite, 16),
            CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA
            | CipherSuite::TLS_DHE_RSA_WITH_AES_256_CBC_SHA
            | CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA
            | CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA => Self::cbc(suite, 32),

            // --- TLS 1.2 GCM: 4-byte implicit nonce part ---
            CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256
            | CipherSuite::TLS_DHE_RSA_WITH_AES_128_GCM_SHA256
            | CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
            | CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 => {
                Self::aead(suite, 16, 4, Sha256)
            }
            CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384
            | CipherSuite::TLS_DHE_RSA_WITH_AES_256_GCM_SHA384
            | CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384
            | CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 => {
                Self::aead(suite, 32, 4, Sha384)
            }

            // --- ChaCha20-Poly1305 (TLS 1.2): 12-byte IV ---
            CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256
            | CipherSuite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256
            | CipherSuite::TLS_DHE_RSA_WITH_CHACHA20_POLY1305_SHA256 => {
                Self::aead(suite, 32, 12, Sha256)
            }

            // --- TLS 1.3 AEAD ---
            CipherSuite::TLS_AES_128_GCM_SHA256 => Self::aead(suite, 16, 12, Sha256),
            CipherSuite::TLS_AES_256_GCM_SHA384 => Self::aead(suite, 32, 12, Sha384),
            CipherSuite::TLS_CHACHA20_POLY1305_SHA256 => Self::aead(suite, 32, 12, Sha256),

            _ => return Err(SessionError::UnsupportedCipherSuite(suite.0)),
        };
        Ok(params)
    }

    /// Total TLS 1.2 key block length: `2 * (mac_key_len + key_len + iv_len)`.
    pub fn key_block_len(&self) -> usize {
        2 * (self.mac_key_len + self.key_len + self.iv_len)
    }
}

/// Fill `buf` from the OS random source.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<(), SessionError> {
    getrandom::getrandom(buf).map_err(|e| SessionError::RandomFailure(e.to_string()))
}

/// `n` random bytes.
pub(crate) fn random_bytes(n: usize) -> Result<Vec<u8>, SessionError> {
    let mut buf = vec![0u8; n];
    fill_random(&mut buf)?;
    Ok(buf)
}

/// `n` random bytes rendered as `2n` lowercase hex characters.
pub(crate) fn random_hex(n: usize) -> Result<String, SessionError> {
    Ok(hex::encode(random_bytes(n)?))
}

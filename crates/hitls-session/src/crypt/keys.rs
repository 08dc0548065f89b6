//! Session key derivation.
//!
//! TLS 1.2 expands the master secret into a key block (RFC 5246 §6.3);
//! TLS 1.3 derives key + IV from a traffic secret with HKDF-Expand-Label
//! (RFC 8446 §7.3).

use super::hkdf::{HkdfLabelExpander, Tls13Hkdf};
use super::prf::{KeyBlockPrf, Tls12Prf};
use super::SuiteKeyParams;
use crate::CipherSuite;
use hitls_types::SessionError;
use zeroize::Zeroize;

/// TLS 1.3 record IV length.
const TLS13_IV_LEN: usize = 12;

/// Per-direction traffic keys derived for one connection.
///
/// MAC keys are present only for MAC-then-encrypt (CBC) suites.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub client_write_key: Vec<u8>,
    pub server_write_key: Vec<u8>,
    pub client_write_iv: Vec<u8>,
    pub server_write_iv: Vec<u8>,
    pub client_mac_key: Option<Vec<u8>>,
    pub server_mac_key: Option<Vec<u8>>,
}

impl Drop for SessionKeys {
    fn drop(&mut self) {
        self.client_write_key.zeroize();
        self.server_write_key.zeroize();
        self.client_write_iv.zeroize();
        self.server_write_iv.zeroize();
        if let Some(k) = self.client_mac_key.as_mut() {
            k.zeroize();
        }
        if let Some(k) = self.server_mac_key.as_mut() {
            k.zeroize();
        }
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("key_len", &self.client_write_key.len())
            .field("iv_len", &self.client_write_iv.len())
            .field("has_mac_keys", &self.client_mac_key.is_some())
            .finish_non_exhaustive()
    }
}

/// Borrowed key/IV/MAC-key triple for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionKeys<'a> {
    pub key: &'a [u8],
    pub iv: &'a [u8],
    pub mac_key: Option<&'a [u8]>,
}

impl SessionKeys {
    /// Keys protecting client-to-server records.
    pub fn client_keys(&self) -> DirectionKeys<'_> {
        DirectionKeys {
            key: &self.client_write_key,
            iv: &self.client_write_iv,
            mac_key: self.client_mac_key.as_deref(),
        }
    }

    /// Keys protecting server-to-client records.
    pub fn server_keys(&self) -> DirectionKeys<'_> {
        DirectionKeys {
            key: &self.server_write_key,
            iv: &self.server_write_iv,
            mac_key: self.server_mac_key.as_deref(),
        }
    }

    /// Server perspective: keys used to write.
    pub fn write_keys(&self) -> DirectionKeys<'_> {
        self.server_keys()
    }

    /// Server perspective: keys used to read.
    pub fn read_keys(&self) -> DirectionKeys<'_> {
        self.client_keys()
    }
}

/// Turns master or traffic secrets into [`SessionKeys`].
pub struct SessionKeysDeriver {
    prf: Box<dyn KeyBlockPrf>,
    hkdf: Box<dyn HkdfLabelExpander>,
}

impl Default for SessionKeysDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionKeysDeriver {
    /// Deriver backed by the RFC 5246 PRF and RFC 8446 HKDF.
    pub fn new() -> Self {
        Self::with_primitives(Box::new(Tls12Prf), Box::new(Tls13Hkdf))
    }

    /// Deriver backed by caller-supplied primitives.
    pub fn with_primitives(prf: Box<dyn KeyBlockPrf>, hkdf: Box<dyn HkdfLabelExpander>) -> Self {
        Self { prf, hkdf }
    }

    /// Derive TLS 1.2 connection keys from the master secret.
    ///
    /// Key block layout (RFC 5246 §6.3):
    /// ```text
    /// client_write_MAC_key[mac_key_len] || server_write_MAC_key[mac_key_len] ||
    /// client_write_key[key_len] || server_write_key[key_len] ||
    /// client_write_IV[iv_len] || server_write_IV[iv_len]
    /// ```
    pub fn derive_tls12_keys(
        &self,
        master_secret: &[u8],
        client_random: &[u8],
        server_random: &[u8],
        suite: CipherSuite,
    ) -> Result<SessionKeys, SessionError> {
        let params = SuiteKeyParams::from_suite(suite)?;
        let total_len = params.key_block_len();
        let mut key_block = self.prf.generate_key_block(
            params.hash,
            master_secret,
            client_random,
            server_random,
            total_len,
        )?;
        if key_block.len() != total_len {
            key_block.zeroize();
            return Err(SessionError::CryptoFailure(format!(
                "key block: expected {total_len} bytes, got {}",
                key_block.len()
            )));
        }

        let mut offset = 0;
        let mut take = |len: usize| {
            let out = key_block[offset..offset + len].to_vec();
            offset += len;
            out
        };

        let (client_mac_key, server_mac_key) = if params.mac_key_len > 0 {
            (Some(take(params.mac_key_len)), Some(take(params.mac_key_len)))
        } else {
            (None, None)
        };
        let client_write_key = take(params.key_len);
        let server_write_key = take(params.key_len);
        let client_write_iv = take(params.iv_len);
        let server_write_iv = take(params.iv_len);
        key_block.zeroize();

        Ok(SessionKeys {
            client_write_key,
            server_write_key,
            client_write_iv,
            server_write_iv,
            client_mac_key,
            server_mac_key,
        })
    }

    /// Derive TLS 1.3 handshake keys from one handshake traffic secret.
    ///
    /// ```text
    /// key = HKDF-Expand-Label(secret, "key", "", key_length)
    /// iv  = HKDF-Expand-Label(secret, "iv", "", 12)
    /// ```
    ///
    /// Both directions are filled from the same secret; use
    /// [`derive_tls13_traffic_keys`](Self::derive_tls13_traffic_keys) when the
    /// client and server secrets are both at hand.
    pub fn derive_tls13_handshake_keys(
        &self,
        traffic_secret: &[u8],
        suite: CipherSuite,
    ) -> Result<SessionKeys, SessionError> {
        let params = SuiteKeyParams::from_suite(suite)?;
        let (key, iv) = self.expand_traffic_secret(&params, traffic_secret)?;
        Ok(SessionKeys {
            client_write_key: key.clone(),
            server_write_key: key,
            client_write_iv: iv.clone(),
            server_write_iv: iv,
            client_mac_key: None,
            server_mac_key: None,
        })
    }

    /// Derive TLS 1.3 application keys; same schedule as the handshake keys.
    pub fn derive_tls13_application_keys(
        &self,
        traffic_secret: &[u8],
        suite: CipherSuite,
    ) -> Result<SessionKeys, SessionError> {
        self.derive_tls13_handshake_keys(traffic_secret, suite)
    }

    /// Derive TLS 1.3 keys for both directions from distinct client and
    /// server traffic secrets.
    pub fn derive_tls13_traffic_keys(
        &self,
        client_traffic_secret: &[u8],
        server_traffic_secret: &[u8],
        suite: CipherSuite,
    ) -> Result<SessionKeys, SessionError> {
        let params = SuiteKeyParams::from_suite(suite)?;
        let (client_write_key, client_write_iv) =
            self.expand_traffic_secret(&params, client_traffic_secret)?;
        let (server_write_key, server_write_iv) =
            self.expand_traffic_secret(&params, server_traffic_secret)?;
        Ok(SessionKeys {
            client_write_key,
            server_write_key,
            client_write_iv,
            server_write_iv,
            client_mac_key: None,
            server_mac_key: None,
        })
    }

    fn expand_traffic_secret(
        &self,
        params: &SuiteKeyParams,
        secret: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), SessionError> {
        let key = self
            .hkdf
            .expand_label(params.hash, secret, b"key", b"", params.key_len)?;
        let iv = self
            .hkdf
            .expand_label(params.hash, secret, b"iv", b"", TLS13_IV_LEN)?;
        Ok((key, iv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hitls_types::HashAlgId;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    const CLIENT_RANDOM: [u8; 32] = [0x01; 32];
    const SERVER_RANDOM: [u8; 32] = [0x02; 32];

    #[test]
    fn test_tls12_gcm_aes128_lengths() {
        let keys = SessionKeysDeriver::new()
            .derive_tls12_keys(
                &[0xAB; 48],
                &CLIENT_RANDOM,
                &SERVER_RANDOM,
                CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            )
            .unwrap();
        assert_eq!(keys.client_write_key.len(), 16);
        assert_eq!(keys.server_write_key.len(), 16);
        assert_eq!(keys.client_write_iv.len(), 4);
        assert_eq!(keys.server_write_iv.len(), 4);
        assert!(keys.client_mac_key.is_none());
        assert!(keys.server_mac_key.is_none());
    }

    #[test]
    fn test_tls12_cbc_aes256_lengths() {
        let keys = SessionKeysDeriver::new()
            .derive_tls12_keys(
                &[0xAB; 48],
                &CLIENT_RANDOM,
                &SERVER_RANDOM,
                CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
            )
            .unwrap();
        assert_eq!(keys.client_write_key.len(), 32);
        assert_eq!(keys.server_write_key.len(), 32);
        assert_eq!(keys.client_write_iv.len(), 16);
        assert_eq!(keys.server_write_iv.len(), 16);
        assert_eq!(keys.client_mac_key.as_ref().unwrap().len(), 20);
        assert_eq!(keys.server_mac_key.as_ref().unwrap().len(), 20);
    }

    #[test]
    fn test_tls12_key_block_split_order() {
        let suite = CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA;
        let ms = [0x5Au8; 48];
        let keys = SessionKeysDeriver::new()
            .derive_tls12_keys(&ms, &CLIENT_RANDOM, &SERVER_RANDOM, suite)
            .unwrap();
        let block = Tls12Prf
            .generate_key_block(HashAlgId::Sha256, &ms, &CLIENT_RANDOM, &SERVER_RANDOM, 104)
            .unwrap();
        assert_eq!(keys.client_mac_key.as_deref(), Some(&block[0..20]));
        assert_eq!(keys.server_mac_key.as_deref(), Some(&block[20..40]));
        assert_eq!(keys.client_write_key, &block[40..56]);
        assert_eq!(keys.server_write_key, &block[56..72]);
        assert_eq!(keys.client_write_iv, &block[72..88]);
        assert_eq!(keys.server_write_iv, &block[88..104]);
    }

    #[test]
    fn test_tls12_deterministic() {
        let d = SessionKeysDeriver::new();
        let suite = CipherSuite::TLS_DHE_RSA_WITH_AES_256_GCM_SHA384;
        let a = d
            .derive_tls12_keys(&[9; 48], &CLIENT_RANDOM, &SERVER_RANDOM, suite)
            .unwrap();
        let b = d
            .derive_tls12_keys(&[9; 48], &CLIENT_RANDOM, &SERVER_RANDOM, suite)
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a.client_write_key, a.server_write_key);
    }

    #[test]
    fn test_tls12_unknown_suite_rejected() {
        let err = SessionKeysDeriver::new()
            .derive_tls12_keys(&[0; 48], &CLIENT_RANDOM, &SERVER_RANDOM, CipherSuite(0x0A0A))
            .unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedCipherSuite(0x0A0A)));
    }

    #[test]
    fn test_tls13_handshake_keys_rfc8448() {
        // RFC 8448 Section 3: server handshake traffic secret
        let secret = hex("b67b7d690cc16c4e75e54213cb2d37b4e9c912bcded9105d42befd59d391ad38");
        let keys = SessionKeysDeriver::new()
            .derive_tls13_handshake_keys(&secret, CipherSuite::TLS_AES_128_GCM_SHA256)
            .unwrap();
        assert_eq!(keys.server_write_key, hex("3fce516009c21727d0f2e4e86ee403bc"));
        assert_eq!(keys.server_write_iv, hex("5d313eb2671276ee13000b30"));
        assert_eq!(keys.client_write_key, keys.server_write_key);
        assert!(keys.client_mac_key.is_none());
    }

    #[test]
    fn test_tls13_application_keys_match_handshake_schedule() {
        let d = SessionKeysDeriver::new();
        let secret = [0xCC; 48];
        let hs = d
            .derive_tls13_handshake_keys(&secret, CipherSuite::TLS_AES_256_GCM_SHA384)
            .unwrap();
        let app = d
            .derive_tls13_application_keys(&secret, CipherSuite::TLS_AES_256_GCM_SHA384)
            .unwrap();
        assert_eq!(hs, app);
        assert_eq!(app.client_write_key.len(), 32);
        assert_eq!(app.client_write_iv.len(), 12);
    }

    #[test]
    fn test_tls13_traffic_keys_per_direction() {
        let client_secret =
            hex("b3eddb126e067f35a780b3abf45e2d8f3b1a950738f52e9600746a0e27a55a21");
        let server_secret =
            hex("b67b7d690cc16c4e75e54213cb2d37b4e9c912bcded9105d42befd59d391ad38");
        let keys = SessionKeysDeriver::new()
            .derive_tls13_traffic_keys(
                &client_secret,
                &server_secret,
                CipherSuite::TLS_AES_128_GCM_SHA256,
            )
            .unwrap();
        assert_eq!(keys.client_write_key, hex("dbfaa693d1762c5b666af5d950258d01"));
        assert_eq!(keys.client_write_iv, hex("5bd3c71b836e0b76bb73265f"));
        assert_eq!(keys.server_write_key, hex("3fce516009c21727d0f2e4e86ee403bc"));
        assert_eq!(keys.read_keys().key, keys.client_write_key.as_slice());
        assert_eq!(keys.write_keys().iv, keys.server_write_iv.as_slice());
    }

    #[test]
    fn test_tls13_chacha_key_len() {
        let keys = SessionKeysDeriver::new()
            .derive_tls13_application_keys(&[0xBB; 32], CipherSuite::TLS_CHACHA20_POLY1305_SHA256)
            .unwrap();
        assert_eq!(keys.client_write_key.len(), 32);
        assert_eq!(keys.client_write_iv.len(), 12);
    }

    struct ShortPrf;

    impl KeyBlockPrf for ShortPrf {
        fn generate_key_block(
            &self,
            _hash: HashAlgId,
            _master_secret: &[u8],
            _client_random: &[u8],
            _server_random: &[u8],
            length: usize,
        ) -> Result<Vec<u8>, SessionError> {
            Ok(vec![0u8; length / 2])
        }
    }

    #[test]
    fn test_injected_prf_short_output_rejected() {
        let d = SessionKeysDeriver::with_primitives(Box::new(ShortPrf), Box::new(Tls13Hkdf));
        let err = d
            .derive_tls12_keys(
                &[0; 48],
                &CLIENT_RANDOM,
                &SERVER_RANDOM,
                CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256,
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::CryptoFailure(_)));
    }

    #[test]
    fn test_direction_views() {
        let keys = SessionKeysDeriver::new()
            .derive_tls12_keys(
                &[1; 48],
                &CLIENT_RANDOM,
                &SERVER_RANDOM,
                CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
            )
            .unwrap();
        let client = keys.client_keys();
        let server = keys.server_keys();
        assert_eq!(client.key, keys.client_write_key.as_slice());
        assert_eq!(server.mac_key, keys.server_mac_key.as_deref());
        assert_eq!(keys.read_keys(), client);
        assert_eq!(keys.write_keys(), server);
    }
}

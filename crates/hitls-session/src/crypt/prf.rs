//! TLS 1.2 PRF (Pseudo-Random Function) as defined in RFC 5246 §5.
//!
//! ```text
//! PRF(secret, label, seed) = P_<hash>(secret, label + seed)
//!
//! P_hash(secret, seed) = HMAC_hash(secret, A(1) + seed) ||
//!                         HMAC_hash(secret, A(2) + seed) || ...
//! A(0) = seed
//! A(i) = HMAC_hash(secret, A(i-1))
//! ```

use super::hkdf::{hmac_hash, hmac_parts};
use hitls_types::{HashAlgId, SessionError};

/// TLS 1.2 PRF: Derive `output_len` bytes from `secret`, `label`, and `seed`.
pub fn prf(
    hash: HashAlgId,
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
) -> Result<Vec<u8>, SessionError> {
    let mut label_seed = Vec::with_capacity(label.len() + seed.len());
    label_seed.extend_from_slice(label.as_bytes());
    label_seed.extend_from_slice(seed);

    p_hash(hash, secret, &label_seed, output_len)
}

/// P_hash expansion function (RFC 5246 §5).
fn p_hash(
    hash: HashAlgId,
    secret: &[u8],
    seed: &[u8],
    output_len: usize,
) -> Result<Vec<u8>, SessionError> {
    let mut result = Vec::with_capacity(output_len);

    // A(0) = seed
    let mut a = seed.to_vec();

    while result.len() < output_len {
        a = hmac_hash(hash, secret, &a)?;
        let block = hmac_parts(hash, secret, &[&a, seed])?;
        result.extend_from_slice(&block);
    }

    result.truncate(output_len);
    Ok(result)
}

/// Key-block PRF primitive consumed by the TLS 1.2 key deriver.
pub trait KeyBlockPrf: Send + Sync {
    /// Produce `length` bytes of key block from the master secret and the
    /// hello randoms.
    fn generate_key_block(
        &self,
        hash: HashAlgId,
        master_secret: &[u8],
        client_random: &[u8],
        server_random: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, SessionError>;
}

/// RFC 5246 §6.3 key expansion:
///
/// ```text
/// key_block = PRF(master_secret, "key expansion",
///                 ServerHello.random + ClientHello.random)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Tls12Prf;

impl KeyBlockPrf for Tls12Prf {
    fn generate_key_block(
        &self,
        hash: HashAlgId,
        master_secret: &[u8],
        client_random: &[u8],
        server_random: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, SessionError> {
        // Seed order is server_random + client_random (reversed from master_secret)
        let mut seed = Vec::with_capacity(server_random.len() + client_random.len());
        seed.extend_from_slice(server_random);
        seed.extend_from_slice(client_random);
        prf(hash, master_secret, "key expansion", &seed, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_prf_sha256_known_vector() {
        // Widely used P_SHA256 test vector (IETF TLS WG mailing list)
        let secret = hex("9bbe436ba940f017b17652849a71db35");
        let seed = hex("a0ba9f936cda311827a6f796ffd5198c");
        let output = prf(HashAlgId::Sha256, &secret, "test label", &seed, 100).unwrap();
        assert_eq!(
            output,
            hex("e3f229ba727be17b8d122620557cd453c2aab21d07c3d495329b52d4e61edb5a\
                 6b301791e90d35c9c9a46b4e14baf9af0fa022f7077def17abfd3797c0564bab\
                 4fbc91666e9def9b97fce34f796789baa48082d122ee42c5a72e5a5110fff701\
                 87347b66")
        );
    }

    #[test]
    fn test_prf_deterministic_and_label_sensitive() {
        let out1 = prf(HashAlgId::Sha256, b"secret", "label", b"seed", 48).unwrap();
        let out2 = prf(HashAlgId::Sha256, b"secret", "label", b"seed", 48).unwrap();
        let out3 = prf(HashAlgId::Sha256, b"secret", "other", b"seed", 48).unwrap();
        assert_eq!(out1, out2);
        assert_ne!(out1, out3);
    }

    #[test]
    fn test_prf_prefix_consistency() {
        let short = prf(HashAlgId::Sha256, b"secret", "label", b"seed", 32).unwrap();
        let long = prf(HashAlgId::Sha256, b"secret", "label", b"seed", 100).unwrap();
        assert_eq!(&long[..32], &short[..]);
    }

    #[test]
    fn test_prf_zero_output_length() {
        let output = prf(HashAlgId::Sha256, b"secret", "label", b"seed", 0).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_prf_sha256_vs_sha384_different_output() {
        let out256 = prf(HashAlgId::Sha256, b"s", "l", b"seed", 48).unwrap();
        let out384 = prf(HashAlgId::Sha384, b"s", "l", b"seed", 48).unwrap();
        assert_ne!(out256, out384);
    }

    #[test]
    fn test_key_block_uses_server_random_first() {
        let ms = [0xABu8; 48];
        let client_random = [0x01u8; 32];
        let server_random = [0x02u8; 32];
        let block = Tls12Prf
            .generate_key_block(HashAlgId::Sha256, &ms, &client_random, &server_random, 64)
            .unwrap();

        let mut seed = server_random.to_vec();
        seed.extend_from_slice(&client_random);
        let expected = prf(HashAlgId::Sha256, &ms, "key expansion", &seed, 64).unwrap();
        assert_eq!(block, expected);
    }
}

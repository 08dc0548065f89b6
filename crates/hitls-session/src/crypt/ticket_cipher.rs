//! Session ticket protection: AES-256-CBC confidentiality plus an
//! HMAC-SHA256 tag over `key_name || iv || ciphertext` (RFC 5077 §4).

use super::hkdf::hmac_parts;
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hitls_types::{HashAlgId, SessionError};
use subtle::ConstantTimeEq;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Ticket IV length.
pub const TICKET_IV_LEN: usize = 16;
/// Ticket encryption and HMAC key length.
pub const TICKET_KEY_LEN: usize = 32;
/// HMAC-SHA256 tag length.
pub const TICKET_HMAC_LEN: usize = 32;

/// Deterministic symmetric cipher used to seal ticket state.
pub trait TicketCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, SessionError>;
    fn decrypt(&self, ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, SessionError>;
}

/// AES-256-CBC with PKCS#7 padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256CbcCipher;

impl TicketCipher for Aes256CbcCipher {
    fn encrypt(&self, plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, SessionError> {
        let enc = Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|_| SessionError::CryptoFailure("aes-256-cbc: bad key or iv length".into()))?;
        Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, SessionError> {
        let dec = Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|_| SessionError::CryptoFailure("aes-256-cbc: bad key or iv length".into()))?;
        dec.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| SessionError::CryptoFailure("aes-256-cbc: bad padding".into()))
    }
}

/// `HMAC-SHA256(hmac_key, key_name || iv || ciphertext)`.
pub fn ticket_hmac(
    hmac_key: &[u8],
    key_name: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, SessionError> {
    hmac_parts(HashAlgId::Sha256, hmac_key, &[key_name, iv, ciphertext])
}

/// Constant-time check of a ticket tag.
pub fn verify_ticket_hmac(
    hmac_key: &[u8],
    key_name: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> bool {
    match ticket_hmac(hmac_key, key_name, iv, ciphertext) {
        Ok(expected) => expected.ct_eq(tag).into(),
        Err(_) => false,
    }
}

//! TLS 1.3 HKDF primitives (RFC 8446 Section 7.1).
//!
//! HKDF-Expand comes from the `hkdf` crate; the raw HMAC helpers here also
//! back the TLS 1.2 PRF and the ticket MAC.

use hitls_types::{HashAlgId, SessionError};
use hkdf::Hkdf;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384};

fn mac_parts<M: Mac + KeyInit>(key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, SessionError> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|_| SessionError::CryptoFailure("hmac: invalid key length".into()))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

/// One-shot HMAC over the concatenation of `parts`.
pub(crate) fn hmac_parts(
    hash: HashAlgId,
    key: &[u8],
    parts: &[&[u8]],
) -> Result<Vec<u8>, SessionError> {
    match hash {
        HashAlgId::Sha256 => mac_parts::<Hmac<Sha256>>(key, parts),
        HashAlgId::Sha384 => mac_parts::<Hmac<Sha384>>(key, parts),
    }
}

/// One-shot HMAC: `HMAC(key, data)`.
pub(crate) fn hmac_hash(hash: HashAlgId, key: &[u8], data: &[u8]) -> Result<Vec<u8>, SessionError> {
    hmac_parts(hash, key, &[data])
}

/// HKDF-Expand(PRK, info, length) -> OKM (RFC 5869 §2.3).
///
/// `prk` must be at least one hash length and `length` at most 255 hash
/// lengths.
pub fn hkdf_expand(
    hash: HashAlgId,
    prk: &[u8],
    info: &[u8],
    length: usize,
) -> Result<Vec<u8>, SessionError> {
    let mut okm = vec![0u8; length];
    let expanded = match hash {
        HashAlgId::Sha256 => Hkdf::<Sha256>::from_prk(prk)
            .map_err(|_| prk_too_short())?
            .expand(info, &mut okm),
        HashAlgId::Sha384 => Hkdf::<Sha384>::from_prk(prk)
            .map_err(|_| prk_too_short())?
            .expand(info, &mut okm),
    };
    expanded
        .map_err(|_| SessionError::CryptoFailure("HKDF-Expand: output length too large".into()))?;
    Ok(okm)
}

fn prk_too_short() -> SessionError {
    SessionError::CryptoFailure("HKDF-Expand: PRK shorter than hash length".into())
}

/// Encode the HkdfLabel structure per RFC 8446 Section 7.1:
///
/// ```text
/// struct {
///     uint16 length;
///     opaque label<7..255>;   // "tls13 " + label
///     opaque context<0..255>;
/// } HkdfLabel;
/// ```
fn encode_hkdf_label(length: u16, label: &[u8], context: &[u8]) -> Result<Vec<u8>, SessionError> {
    let full_label_len = 6 + label.len(); // "tls13 " prefix = 6 bytes
    if full_label_len > 255 || context.len() > 255 {
        return Err(SessionError::InvalidInput(
            "HkdfLabel: label or context longer than 255 bytes".into(),
        ));
    }
    let mut buf = Vec::with_capacity(2 + 1 + full_label_len + 1 + context.len());
    buf.extend_from_slice(&length.to_be_bytes());
    buf.push(full_label_len as u8);
    buf.extend_from_slice(b"tls13 ");
    buf.extend_from_slice(label);
    buf.push(context.len() as u8);
    buf.extend_from_slice(context);
    Ok(buf)
}

/// HKDF-Expand-Label(Secret, Label, Context, Length).
///
/// `= HKDF-Expand(Secret, HkdfLabel, Length)`
pub fn hkdf_expand_label(
    hash: HashAlgId,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    length: usize,
) -> Result<Vec<u8>, SessionError> {
    let length16 = u16::try_from(length)
        .map_err(|_| SessionError::InvalidInput("HKDF-Expand-Label: length exceeds u16".into()))?;
    let hkdf_label = encode_hkdf_label(length16, label, context)?;
    hkdf_expand(hash, secret, &hkdf_label, length)
}

/// HKDF-Expand-Label primitive consumed by the key deriver and PSK manager.
pub trait HkdfLabelExpander: Send + Sync {
    /// `HKDF-Expand-Label(secret, label, context, length)` under `hash`.
    fn expand_label(
        &self,
        hash: HashAlgId,
        secret: &[u8],
        label: &[u8],
        context: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, SessionError>;
}

/// RFC 8446 HKDF-Expand-Label over HMAC-SHA256/384.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tls13Hkdf;

impl HkdfLabelExpander for Tls13Hkdf {
    fn expand_label(
        &self,
        hash: HashAlgId,
        secret: &[u8],
        label: &[u8],
        context: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, SessionError> {
        hkdf_expand_label(hash, secret, label, context, length)
    }
}

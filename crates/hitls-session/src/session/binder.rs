//! PSK to certificate binding.
//!
//! A resumed PSK handshake carries no certificate, so the server remembers
//! which certificate authenticated the original handshake.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

/// Stable content fingerprint of a certificate.
///
/// Two certificates with equal fingerprints are treated as the same
/// certificate.
pub trait CertificateFingerprint {
    fn fingerprint(&self) -> Vec<u8>;
}

/// A DER-encoded certificate fingerprinted by SHA-256.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerCertificate {
    der: Vec<u8>,
}

impl DerCertificate {
    pub fn new(der: Vec<u8>) -> Self {
        Self { der }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

impl CertificateFingerprint for DerCertificate {
    fn fingerprint(&self) -> Vec<u8> {
        Sha256::digest(&self.der).to_vec()
    }
}

/// Bidirectional index between PSK identities and certificates.
#[derive(Debug)]
pub struct PskCertificateBinder<C> {
    by_identity: HashMap<Vec<u8>, C>,
    by_fingerprint: HashMap<Vec<u8>, Vec<Vec<u8>>>,
}

impl<C> Default for PskCertificateBinder<C> {
    fn default() -> Self {
        Self {
            by_identity: HashMap::new(),
            by_fingerprint: HashMap::new(),
        }
    }
}

impl<C: CertificateFingerprint> PskCertificateBinder<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `identity` to `certificate`, replacing any earlier binding.
    pub fn bind(&mut self, identity: &[u8], certificate: C) -> &mut Self {
        let fingerprint = certificate.fingerprint();
        if let Some(previous) = self.by_identity.insert(identity.to_vec(), certificate) {
            let old = previous.fingerprint();
            if old != fingerprint {
                self.unlink(&old, identity);
            }
        }
        let identities = self.by_fingerprint.entry(fingerprint).or_default();
        if !identities.iter().any(|id| id == identity) {
            identities.push(identity.to_vec());
        }
        self
    }

    pub fn get_certificate_for_psk(&self, identity: &[u8]) -> Option<&C> {
        self.by_identity.get(identity)
    }

    pub fn is_psk_bound_to_certificate(&self, identity: &[u8]) -> bool {
        self.by_identity.contains_key(identity)
    }

    /// Remove the binding for `identity`. Returns `false` if none existed.
    pub fn remove_binding_for_psk(&mut self, identity: &[u8]) -> bool {
        let Some(certificate) = self.by_identity.remove(identity) else {
            return false;
        };
        self.unlink(&certificate.fingerprint(), identity);
        true
    }

    /// Identities bound to `certificate`, in binding order.
    pub fn get_psk_identities_for_certificate(&self, certificate: &C) -> &[Vec<u8>] {
        self.by_fingerprint
            .get(&certificate.fingerprint())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn unlink(&mut self, fingerprint: &[u8], identity: &[u8]) {
        if let Some(identities) = self.by_fingerprint.get_mut(fingerprint) {
            identities.retain(|id| id != identity);
            if identities.is_empty() {
                self.by_fingerprint.remove(fingerprint);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert(tag: u8) -> DerCertificate {
        DerCertificate::new(vec![0x30, 0x82, tag, tag])
    }

    #[test]
    fn test_bind_and_lookup() {
        let mut binder = PskCertificateBinder::new();
        binder.bind(b"psk-1", cert(1)).bind(b"psk-2", cert(1));
        assert!(binder.is_psk_bound_to_certificate(b"psk-1"));
        assert_eq!(binder.get_certificate_for_psk(b"psk-2"), Some(&cert(1)));
        assert_eq!(
            binder.get_psk_identities_for_certificate(&cert(1)),
            &[b"psk-1".to_vec(), b"psk-2".to_vec()]
        );
        assert!(binder.get_psk_identities_for_certificate(&cert(2)).is_empty());
    }

    #[test]
    fn test_equal_content_shares_fingerprint() {
        let mut binder = PskCertificateBinder::new();
        binder.bind(b"psk", cert(7));
        // a distinct value with the same DER finds the same bindings
        let copy = DerCertificate::new(cert(7).der().to_vec());
        assert_eq!(binder.get_psk_identities_for_certificate(&copy).len(), 1);
    }

    #[test]
    fn test_rebind_moves_identity() {
        let mut binder = PskCertificateBinder::new();
        binder.bind(b"psk", cert(1));
        binder.bind(b"psk", cert(2));
        assert_eq!(binder.get_certificate_for_psk(b"psk"), Some(&cert(2)));
        assert!(binder.get_psk_identities_for_certificate(&cert(1)).is_empty());
        assert_eq!(binder.get_psk_identities_for_certificate(&cert(2)).len(), 1);
    }

    #[test]
    fn test_rebind_same_certificate_no_duplicate() {
        let mut binder = PskCertificateBinder::new();
        binder.bind(b"psk", cert(1));
        binder.bind(b"psk", cert(1));
        assert_eq!(binder.get_psk_identities_for_certificate(&cert(1)).len(), 1);
    }

    #[test]
    fn test_remove_binding() {
        let mut binder = PskCertificateBinder::new();
        binder.bind(b"a", cert(1)).bind(b"b", cert(1));
        assert!(binder.remove_binding_for_psk(b"a"));
        assert!(!binder.remove_binding_for_psk(b"a"));
        assert!(!binder.is_psk_bound_to_certificate(b"a"));
        assert_eq!(
            binder.get_psk_identities_for_certificate(&cert(1)),
            &[b"b".to_vec()]
        );
        assert!(binder.remove_binding_for_psk(b"b"));
        assert!(binder.by_fingerprint.is_empty());
    }

    #[test]
    fn test_der_fingerprint_is_sha256() {
        let c = DerCertificate::new(b"abc".to_vec());
        assert_eq!(
            hex::encode(c.fingerprint()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

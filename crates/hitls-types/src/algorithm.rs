/// Hash algorithm identifiers used by the TLS 1.2 PRF and TLS 1.3 HKDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgId {
    Sha256,
    Sha384,
}

impl HashAlgId {
    /// Digest output size in bytes.
    pub fn output_size(&self) -> usize {
        match self {
            HashAlgId::Sha256 => 32,
            HashAlgId::Sha384 => 48,
        }
    }
}

/// Record protection mode of a cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherMode {
    /// MAC-then-encrypt block cipher (separate HMAC key per direction).
    Cbc,
    /// AEAD: GCM or ChaCha20-Poly1305 (no MAC key).
    Aead,
}

/// TLS wire protocol versions (`ProtocolVersion` in RFC 8446 §4.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(pub u16);

impl ProtocolVersion {
    pub const TLS1_0: Self = Self(0x0301);
    pub const TLS1_1: Self = Self(0x0302);
    pub const TLS1_2: Self = Self(0x0303);
    pub const TLS1_3: Self = Self(0x0304);

    /// Human-readable name, `None` for unknown code points.
    pub fn name(&self) -> Option<&'static str> {
        match *self {
            Self::TLS1_0 => Some("TLSv1.0"),
            Self::TLS1_1 => Some("TLSv1.1"),
            Self::TLS1_2 => Some("TLSv1.2"),
            Self::TLS1_3 => Some("TLSv1.3"),
            _ => None,
        }
    }
}

impl From<u16> for ProtocolVersion {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

impl From<ProtocolVersion> for u16 {
    fn from(v: ProtocolVersion) -> Self {
        v.0
    }
}

//! Session ticket wire format (RFC 5077 §4 layout).
//!
//! ```text
//! key_name(16, zero padded) || iv(16) || state_len(u16 BE) || encrypted_state || hmac(32)
//! ```

use hitls_types::SessionError;

use crate::crypt::ticket_cipher::{TICKET_HMAC_LEN, TICKET_IV_LEN};

/// Width of the key-name field on the wire.
pub const TICKET_KEY_NAME_LEN: usize = 16;

/// Shortest buffer `decode` will look at.
const MIN_TICKET_LEN: usize = TICKET_KEY_NAME_LEN + TICKET_IV_LEN + 2 + 2;

/// An encrypted session ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTicket {
    /// Name of the ticket key that sealed this ticket (at most 16 bytes).
    pub key_name: Vec<u8>,
    pub iv: Vec<u8>,
    pub encrypted_state: Vec<u8>,
    pub hmac: Vec<u8>,
}

impl SessionTicket {
    pub fn new(key_name: Vec<u8>, iv: Vec<u8>, encrypted_state: Vec<u8>, hmac: Vec<u8>) -> Self {
        Self {
            key_name,
            iv,
            encrypted_state,
            hmac,
        }
    }

    /// Serialize to the wire format.
    pub fn encode(&self) -> Result<Vec<u8>, SessionError> {
        if self.key_name.len() > TICKET_KEY_NAME_LEN {
            return Err(SessionError::InvalidInput(format!(
                "ticket key name is {} bytes (max {TICKET_KEY_NAME_LEN})",
                self.key_name.len()
            )));
        }
        if self.iv.len() != TICKET_IV_LEN {
            return Err(SessionError::InvalidInput(format!(
                "ticket iv must be {TICKET_IV_LEN} bytes, got {}",
                self.iv.len()
            )));
        }
        let state_len = u16::try_from(self.encrypted_state.len()).map_err(|_| {
            SessionError::InvalidInput(format!(
                "encrypted state too large: {} bytes",
                self.encrypted_state.len()
            ))
        })?;
        if self.hmac.len() != TICKET_HMAC_LEN {
            return Err(SessionError::InvalidInput(format!(
                "ticket hmac must be {TICKET_HMAC_LEN} bytes, got {}",
                self.hmac.len()
            )));
        }

        let mut out = Vec::with_capacity(
            TICKET_KEY_NAME_LEN + TICKET_IV_LEN + 2 + self.encrypted_state.len() + TICKET_HMAC_LEN,
        );
        out.extend_from_slice(&self.key_name);
        out.resize(TICKET_KEY_NAME_LEN, 0);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&state_len.to_be_bytes());
        out.extend_from_slice(&self.encrypted_state);
        out.extend_from_slice(&self.hmac);
        Ok(out)
    }

    /// Parse the wire format. Trailing bytes after the HMAC are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, SessionError> {
        if data.len() < MIN_TICKET_LEN {
            return Err(SessionError::MalformedTicket(format!(
                "ticket too short: {} bytes",
                data.len()
            )));
        }
        let (name_field, rest) = data.split_at(TICKET_KEY_NAME_LEN);
        let (iv, rest) = rest.split_at(TICKET_IV_LEN);
        let state_len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
        let rest = &rest[2..];
        if rest.len() < state_len + TICKET_HMAC_LEN {
            return Err(SessionError::MalformedTicket(format!(
                "declared state length {state_len} exceeds ticket size"
            )));
        }
        let (encrypted_state, rest) = rest.split_at(state_len);
        let hmac = &rest[..TICKET_HMAC_LEN];

        let name_len = name_field
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |pos| pos + 1);

        Ok(Self {
            key_name: name_field[..name_len].to_vec(),
            iv: iv.to_vec(),
            encrypted_state: encrypted_state.to_vec(),
            hmac: hmac.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(state_len: usize) -> SessionTicket {
        SessionTicket::new(
            b"0123456789abcdef".to_vec(),
            vec![0x11; 16],
            vec![0x22; state_len],
            vec![0x33; 32],
        )
    }

    #[test]
    fn test_encode_layout() {
        let t = SessionTicket::new(b"abc".to_vec(), vec![1; 16], vec![2; 3], vec![3; 32]);
        let enc = t.encode().unwrap();
        assert_eq!(enc.len(), 16 + 16 + 2 + 3 + 32);
        assert_eq!(&enc[..3], b"abc");
        assert_eq!(&enc[3..16], &[0u8; 13]);
        assert_eq!(&enc[16..32], &[1u8; 16]);
        assert_eq!(&enc[32..34], &[0x00, 0x03]);
        assert_eq!(&enc[34..37], &[2u8; 3]);
        assert_eq!(&enc[37..], &[3u8; 32]);
    }

    #[test]
    fn test_decode_strips_key_name_padding() {
        let t = SessionTicket::new(b"abc".to_vec(), vec![1; 16], vec![2; 40], vec![3; 32]);
        let decoded = SessionTicket::decode(&t.encode().unwrap()).unwrap();
        assert_eq!(decoded, t);
        assert_eq!(decoded.key_name, b"abc");
    }

    #[test]
    fn test_max_state_roundtrip() {
        let t = sample(65535);
        let decoded = SessionTicket::decode(&t.encode().unwrap()).unwrap();
        assert_eq!(decoded.encrypted_state.len(), 65535);
        assert_eq!(decoded, t);
    }

    #[test]
    fn test_encode_rejects_bad_fields() {
        let mut t = sample(4);
        t.key_name = vec![b'k'; 17];
        assert!(t.encode().unwrap_err().is_invalid_input());

        let mut t = sample(4);
        t.iv = vec![0; 12];
        assert!(t.encode().is_err());

        assert!(sample(65536).encode().is_err());

        let mut t = sample(4);
        t.hmac = vec![0; 20];
        assert!(t.encode().is_err());
    }

    #[test]
    fn test_decode_too_short() {
        let err = SessionTicket::decode(&[0u8; 35]).unwrap_err();
        assert!(matches!(err, SessionError::MalformedTicket(_)));
    }

    #[test]
    fn test_decode_length_mismatch() {
        let mut enc = sample(10).encode().unwrap();
        // drop the last HMAC byte
        enc.pop();
        assert!(SessionTicket::decode(&enc).is_err());

        let mut enc = sample(10).encode().unwrap();
        enc[32] = 0xFF;
        enc[33] = 0xFF;
        assert!(SessionTicket::decode(&enc).is_err());
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let t = sample(8);
        let mut enc = t.encode().unwrap();
        enc.extend_from_slice(b"trailer");
        assert_eq!(SessionTicket::decode(&enc).unwrap(), t);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn decode_inverts_encode(
            key_name in prop::collection::vec(1u8..=255, 0..=16),
            iv in prop::array::uniform16(any::<u8>()),
            state in prop::collection::vec(any::<u8>(), 0..2048),
            hmac in prop::array::uniform32(any::<u8>()),
        ) {
            let t = SessionTicket::new(key_name, iv.to_vec(), state, hmac.to_vec());
            let enc = t.encode().unwrap();
            prop_assert_eq!(enc.len(), 66 + t.encrypted_state.len());
            prop_assert_eq!(SessionTicket::decode(&enc).unwrap(), t);
        }

        #[test]
        fn decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..256)) {
            let _ = SessionTicket::decode(&data);
        }
    }
}

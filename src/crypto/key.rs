//! Key decoding and validation.
//!
//! Keys arrive either as standard base64 text or as raw bytes and are
//! decoded into a [`CipherKey`] before any file is touched.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::DecryptError;

/// AES-128 key size in bytes.
pub const AES128_KEY_SIZE: usize = 16;

/// AES-256 key size in bytes.
pub const AES256_KEY_SIZE: usize = 32;

/// Validated AES key material (16 or 32 bytes), wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey {
    bytes: Vec<u8>,
}

impl CipherKey {
    /// Build a key from raw bytes, rejecting any length other than 16 or 32.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecryptError> {
        match bytes.len() {
            AES128_KEY_SIZE | AES256_KEY_SIZE => Ok(Self {
                bytes: bytes.to_vec(),
            }),
            other => Err(DecryptError::InvalidKeyLength(other)),
        }
    }

    /// Decode a standard base64 key string.
    pub fn from_base64(encoded: &str) -> Result<Self, DecryptError> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| DecryptError::InvalidKeyEncoding)?,
        );
        Self::from_bytes(&decoded)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Key size in bytes (16 or 32).
    pub fn key_size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CipherKey(AES-{})", self.bytes.len() * 8)
    }
}

/// Key as supplied by a caller: base64 text or raw bytes.
pub enum KeyInput {
    Base64(Zeroizing<String>),
    Raw(Zeroizing<Vec<u8>>),
}

impl KeyInput {
    /// Decode into a validated [`CipherKey`].
    pub fn decode(&self) -> Result<CipherKey, DecryptError> {
        match self {
            KeyInput::Base64(text) => CipherKey::from_base64(text),
            KeyInput::Raw(bytes) => CipherKey::from_bytes(bytes),
        }
    }
}

impl From<&str> for KeyInput {
    fn from(value: &str) -> Self {
        KeyInput::Base64(Zeroizing::new(value.to_string()))
    }
}

impl From<String> for KeyInput {
    fn from(value: String) -> Self {
        KeyInput::Base64(Zeroizing::new(value))
    }
}

impl From<&[u8]> for KeyInput {
    fn from(value: &[u8]) -> Self {
        KeyInput::Raw(Zeroizing::new(value.to_vec()))
    }
}

impl From<Vec<u8>> for KeyInput {
    fn from(value: Vec<u8>) -> Self {
        KeyInput::Raw(Zeroizing::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_128_and_256_bit_keys() {
        assert_eq!(CipherKey::from_bytes(&[7u8; 16]).unwrap().key_size(), 16);
        assert_eq!(CipherKey::from_bytes(&[7u8; 32]).unwrap().key_size(), 32);
    }

    #[test]
    fn test_rejects_other_lengths() {
        for len in [0usize, 10, 20, 24, 33] {
            match CipherKey::from_bytes(&vec![1u8; len]) {
                Err(DecryptError::InvalidKeyLength(got)) => assert_eq!(got, len),
                other => panic!("expected InvalidKeyLength for {}, got {:?}", len, other),
            }
        }
    }

    #[test]
    fn test_base64_decoding() {
        let raw = [0xABu8; 32];
        let encoded = STANDARD.encode(raw);
        let key = CipherKey::from_base64(&encoded).unwrap();
        assert_eq!(key.as_bytes(), &raw);

        // 10 decoded bytes
        let short = STANDARD.encode([1u8; 10]);
        assert!(matches!(
            CipherKey::from_base64(&short),
            Err(DecryptError::InvalidKeyLength(10))
        ));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            CipherKey::from_base64("not base64!!"),
            Err(DecryptError::InvalidKeyEncoding)
        ));
    }

    #[test]
    fn test_key_input_conversions() {
        let raw = vec![3u8; 16];
        let from_raw = KeyInput::from(raw.clone()).decode().unwrap();
        let from_text = KeyInput::from(STANDARD.encode(&raw)).decode().unwrap();
        assert_eq!(from_raw, from_text);
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = CipherKey::from_bytes(&[0x42u8; 32]).unwrap();
        assert_eq!(format!("{:?}", key), "CipherKey(AES-256)");
    }
}

//! AES-CTR keystream with seekable counters.
//!
//! Uses a full 128-bit big-endian counter (`Ctr128BE`): the IV is the counter
//! block for block 0 and every later block adds its index modulo 2^128.
//! Because CTR keystream blocks depend only on the counter, decryption can
//! start at any block without touching preceding data.
//!
//! SECURITY NOTE: AES-CTR does NOT provide authentication.

use aes::{Aes128, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};

use super::key::{CipherKey, AES128_KEY_SIZE, AES256_KEY_SIZE};
use crate::error::DecryptError;

/// AES-CTR IV size in bytes (128-bit counter block).
pub const AES_CTR_IV_SIZE: usize = 16;

/// AES block size in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

type Aes128Ctr128BE = ctr::Ctr128BE<Aes128>;
type Aes256Ctr128BE = ctr::Ctr128BE<Aes256>;

/// Counter block for `block_index`: IV + index as 128-bit big-endian, wrapping.
pub fn counter_for_block(iv: &[u8; AES_CTR_IV_SIZE], block_index: u64) -> [u8; AES_CTR_IV_SIZE] {
    u128::from_be_bytes(*iv)
        .wrapping_add(u128::from(block_index))
        .to_be_bytes()
}

/// AES-CTR keystream for either supported key size.
pub enum CtrCipher {
    Aes128(Aes128Ctr128BE),
    Aes256(Aes256Ctr128BE),
}

impl CtrCipher {
    /// Create a cipher whose first keystream block uses `counter`.
    pub fn new(key: &CipherKey, counter: &[u8; AES_CTR_IV_SIZE]) -> Result<Self, DecryptError> {
        let key_bytes = key.as_bytes();
        match key_bytes.len() {
            AES128_KEY_SIZE => Aes128Ctr128BE::new_from_slices(key_bytes, counter)
                .map(CtrCipher::Aes128)
                .map_err(|_| DecryptError::InvalidKeyLength(key_bytes.len())),
            AES256_KEY_SIZE => Aes256Ctr128BE::new_from_slices(key_bytes, counter)
                .map(CtrCipher::Aes256)
                .map_err(|_| DecryptError::InvalidKeyLength(key_bytes.len())),
            other => Err(DecryptError::InvalidKeyLength(other)),
        }
    }

    /// Create a cipher positioned at an arbitrary payload byte offset.
    ///
    /// The counter is set to IV + `offset / 16` and the first `offset % 16`
    /// keystream bytes of that block are consumed by encrypting zeros.
    pub fn at_offset(
        key: &CipherKey,
        iv: &[u8; AES_CTR_IV_SIZE],
        offset: u64,
    ) -> Result<Self, DecryptError> {
        let block_size = AES_BLOCK_SIZE as u64;
        let block_index = offset / block_size;
        let block_offset = (offset % block_size) as usize;

        let counter = counter_for_block(iv, block_index);
        let mut cipher = Self::new(key, &counter)?;
        cipher.discard_keystream(block_offset);
        Ok(cipher)
    }

    /// XOR the next keystream bytes into `buf`.
    pub fn apply_keystream(&mut self, buf: &mut [u8]) {
        match self {
            CtrCipher::Aes128(c) => c.apply_keystream(buf),
            CtrCipher::Aes256(c) => c.apply_keystream(buf),
        }
    }

    /// Consume `len` keystream bytes without producing output.
    pub fn discard_keystream(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let mut scratch = [0u8; AES_BLOCK_SIZE];
        let mut left = len;
        while left > 0 {
            let n = left.min(AES_BLOCK_SIZE);
            self.apply_keystream(&mut scratch[..n]);
            left -= n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // NIST SP 800-38A, F.5.1 CTR-AES128.Encrypt
    const NIST_KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";
    const NIST_IV: &str = "f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff";
    const NIST_PLAINTEXT: &str = concat!(
        "6bc1bee22e409f96e93d7e117393172a",
        "ae2d8a571e03ac9c9eb76fac45af8e51",
        "30c81c46a35ce411e5fbc1191a0a52ef",
        "f69f2445df4f9b17ad2b417be66c3710",
    );
    const NIST_CIPHERTEXT: &str = concat!(
        "874d6191b620e3261bef6864990db6ce",
        "9806f66b7970fdff8617187bb9fffdff",
        "5ae4df3edbd5d35e5b4f09020db03eab",
        "1e031dda2fbe03d1792170a0f3009cee",
    );

    fn nist_fixture() -> (CipherKey, [u8; 16], Vec<u8>, Vec<u8>) {
        let key = CipherKey::from_bytes(&hex::decode(NIST_KEY).unwrap()).unwrap();
        let iv: [u8; 16] = hex::decode(NIST_IV).unwrap().try_into().unwrap();
        (
            key,
            iv,
            hex::decode(NIST_PLAINTEXT).unwrap(),
            hex::decode(NIST_CIPHERTEXT).unwrap(),
        )
    }

    #[test]
    fn test_counter_for_block_zero_is_iv() {
        let iv = [9u8; 16];
        assert_eq!(counter_for_block(&iv, 0), iv);
    }

    #[test]
    fn test_counter_carry_propagates() {
        let iv: [u8; 16] = hex::decode(NIST_IV).unwrap().try_into().unwrap();
        let next = counter_for_block(&iv, 1);
        assert_eq!(hex::encode(next), "f0f1f2f3f4f5f6f7f8f9fafbfcfdff00");
    }

    #[test]
    fn test_counter_wraps_modulo_2_pow_128() {
        let iv = [0xFFu8; 16];
        assert_eq!(counter_for_block(&iv, 1), [0u8; 16]);
        let mut expected = [0u8; 16];
        expected[15] = 5;
        assert_eq!(counter_for_block(&iv, 6), expected);
    }

    #[test]
    fn test_nist_vector_full() {
        let (key, iv, plaintext, ciphertext) = nist_fixture();
        let mut cipher = CtrCipher::new(&key, &iv).unwrap();
        let mut buf = ciphertext.clone();
        cipher.apply_keystream(&mut buf);
        assert_eq!(buf, plaintext);
    }

    #[test]
    fn test_nist_vector_at_unaligned_offsets() {
        let (key, iv, plaintext, ciphertext) = nist_fixture();
        for offset in [1usize, 15, 16, 17, 33, 63] {
            let mut cipher = CtrCipher::at_offset(&key, &iv, offset as u64).unwrap();
            let mut buf = ciphertext[offset..].to_vec();
            cipher.apply_keystream(&mut buf);
            assert_eq!(buf, &plaintext[offset..], "offset {}", offset);
        }
    }

    #[test]
    fn test_discard_matches_sequential_keystream() {
        let key = CipherKey::from_bytes(&[0x11u8; 32]).unwrap();
        let iv = [0x22u8; 16];

        let mut sequential = CtrCipher::new(&key, &iv).unwrap();
        let mut full = vec![0u8; 100];
        sequential.apply_keystream(&mut full);

        let mut skipping = CtrCipher::new(&key, &iv).unwrap();
        skipping.discard_keystream(37);
        let mut tail = vec![0u8; 63];
        skipping.apply_keystream(&mut tail);

        assert_eq!(tail, &full[37..]);
    }
}

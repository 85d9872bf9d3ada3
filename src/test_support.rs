//! Fixtures for unit tests: random data and reference AES-CTR encryption.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use aes::{Aes128, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;

use crate::crypto::CipherKey;

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// Encrypt `plaintext` from block 0 and lay it out as `IV || ciphertext`.
pub fn encrypt_payload(plaintext: &[u8], key: &CipherKey, iv: &[u8; 16]) -> Vec<u8> {
    let mut ciphertext = plaintext.to_vec();
    match key.key_size() {
        16 => ctr::Ctr128BE::<Aes128>::new_from_slices(key.as_bytes(), iv)
            .unwrap()
            .apply_keystream(&mut ciphertext),
        _ => ctr::Ctr128BE::<Aes256>::new_from_slices(key.as_bytes(), iv)
            .unwrap()
            .apply_keystream(&mut ciphertext),
    }

    let mut file = Vec::with_capacity(16 + ciphertext.len());
    file.extend_from_slice(iv);
    file.extend_from_slice(&ciphertext);
    file
}

/// Write an encrypted file with a random IV under `dir`.
pub fn write_encrypted_file(dir: &Path, name: &str, plaintext: &[u8], key: &[u8]) -> PathBuf {
    let key = CipherKey::from_bytes(key).unwrap();
    let iv: [u8; 16] = random_bytes(16).try_into().unwrap();
    let path = dir.join(name);
    std::fs::write(&path, encrypt_payload(plaintext, &key, &iv)).unwrap();
    path
}

/// Reader that fails every read starting at or past byte `limit`.
///
/// Reads that straddle the limit are cut short at it.
pub struct FailAfter<R> {
    inner: R,
    pos: u64,
    limit: u64,
}

impl<R> FailAfter<R> {
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            pos: 0,
            limit,
        }
    }
}

impl<R: Read> Read for FailAfter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.limit {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }
        let allowed = (self.limit - self.pos).min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..allowed])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Seek> Seek for FailAfter<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = self.inner.seek(pos)?;
        Ok(self.pos)
    }
}

//! Random-access decryption of `IV || ciphertext` files.
//!
//! File layout: IV (16 bytes) || AES-CTR ciphertext payload.
//! All offsets handled here are payload offsets (the IV prefix excluded).

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use crate::crypto::{CipherKey, CtrCipher, KeyInput, AES_CTR_IV_SIZE};
use crate::error::DecryptError;

/// Default size of each emitted plaintext chunk (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Size of the IV prefix at the start of every encrypted file.
pub const HEADER_SIZE: u64 = AES_CTR_IV_SIZE as u64;

/// Byte range over the payload, stored as start + length.
///
/// Built from an inclusive `(start, end)` pair; `start > end` is an empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start: u64,
    len: u64,
}

impl ByteRange {
    /// Inclusive range `[start, end]`. Empty when `start > end`.
    pub fn inclusive(start: u64, end: u64) -> Self {
        let len = if end < start {
            0
        } else {
            (end - start).saturating_add(1)
        };
        Self { start, len }
    }

    /// Range from `start` to the last payload byte.
    pub fn to_eof(start: u64, payload_len: u64) -> Self {
        Self {
            start,
            len: payload_len.saturating_sub(start),
        }
    }

    /// Apply the request defaults: `start` = 0, `end` = last payload byte.
    pub fn resolve(start: Option<u64>, end: Option<u64>, payload_len: u64) -> Self {
        let start = start.unwrap_or(0);
        match end {
            Some(end) => Self::inclusive(start, end),
            None => Self::to_eof(start, payload_len),
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cut the range so it does not extend past the last payload byte.
    pub fn clamp_to(self, payload_len: u64) -> Self {
        Self {
            start: self.start,
            len: self.len.min(payload_len.saturating_sub(self.start)),
        }
    }

    /// Inclusive end offset, `None` for an empty range.
    pub fn end(&self) -> Option<u64> {
        if self.len == 0 {
            None
        } else {
            Some(self.start.saturating_add(self.len - 1))
        }
    }
}

/// IV and payload size read from an encrypted file's head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub iv: [u8; AES_CTR_IV_SIZE],
    pub payload_len: u64,
}

/// Read the IV prefix and compute the payload length.
pub fn read_header<R: Read + Seek>(reader: &mut R) -> Result<FileHeader, DecryptError> {
    let total_len = reader.seek(SeekFrom::End(0))?;
    if total_len < HEADER_SIZE {
        return Err(DecryptError::TruncatedFile(total_len));
    }

    reader.seek(SeekFrom::Start(0))?;
    let mut iv = [0u8; AES_CTR_IV_SIZE];
    reader.read_exact(&mut iv)?;

    Ok(FileHeader {
        iv,
        payload_len: total_len - HEADER_SIZE,
    })
}

/// Lazy iterator over the decrypted chunks of one byte range.
///
/// Chunks are at most `chunk_size` bytes; their concatenation is exactly the
/// plaintext of the range (cut short at EOF). An I/O error is yielded once and
/// ends the iteration.
pub struct RangeDecryptor<R> {
    reader: R,
    cipher: CtrCipher,
    remaining: u64,
    chunk_size: usize,
    finished: bool,
}

impl<R: Read + Seek> RangeDecryptor<R> {
    /// Position `reader` and the keystream at `range.start()`.
    ///
    /// `reader` is the whole encrypted file (IV prefix included); its length
    /// is taken from the handle itself.
    pub fn new(
        mut reader: R,
        key: &CipherKey,
        iv: &[u8; AES_CTR_IV_SIZE],
        range: ByteRange,
        chunk_size: usize,
    ) -> Result<Self, DecryptError> {
        let total_len = reader.seek(SeekFrom::End(0))?;
        if total_len < HEADER_SIZE {
            return Err(DecryptError::TruncatedFile(total_len));
        }
        Self::with_payload_len(reader, key, iv, range, total_len - HEADER_SIZE, chunk_size)
    }

    /// Like [`RangeDecryptor::new`] for a handle whose payload length is
    /// already known, e.g. from an earlier [`read_header`].
    pub fn with_payload_len(
        mut reader: R,
        key: &CipherKey,
        iv: &[u8; AES_CTR_IV_SIZE],
        range: ByteRange,
        payload_len: u64,
        chunk_size: usize,
    ) -> Result<Self, DecryptError> {
        if chunk_size == 0 {
            return Err(DecryptError::InvalidConfig(
                "chunk size must be non-zero".to_string(),
            ));
        }

        // Keystream is aligned first: counter = IV + start / 16, then the
        // start % 16 bytes preceding `start` in that block are discarded.
        let cipher = CtrCipher::at_offset(key, iv, range.start())?;

        let remaining = range.clamp_to(payload_len).len();
        if remaining > 0 {
            reader.seek(SeekFrom::Start(HEADER_SIZE + range.start()))?;
        }

        Ok(Self {
            reader,
            cipher,
            remaining,
            chunk_size,
            finished: remaining == 0,
        })
    }

    fn read_chunk(&mut self) -> Result<Option<Vec<u8>>, DecryptError> {
        let want = self.remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; want];

        let read = loop {
            match self.reader.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if read == 0 {
            return Ok(None);
        }

        buf.truncate(read);
        self.cipher.apply_keystream(&mut buf);
        self.remaining -= read as u64;
        Ok(Some(buf))
    }
}

impl<R: Read + Seek> Iterator for RangeDecryptor<R> {
    type Item = Result<Vec<u8>, DecryptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_chunk() {
            Ok(Some(chunk)) => {
                if self.remaining == 0 {
                    self.finished = true;
                }
                Some(Ok(chunk))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Cold one-shot decryption: open `path`, read its header and decrypt a range.
///
/// Every call reopens the file; use [`crate::WarmWorker`] for repeated requests.
pub fn decrypt_range(
    path: impl AsRef<Path>,
    key: impl Into<KeyInput>,
    start: Option<u64>,
    end: Option<u64>,
    chunk_size: usize,
) -> Result<RangeDecryptor<File>, DecryptError> {
    let key = key.into().decode()?;
    let mut file = File::open(path.as_ref())?;
    let header = read_header(&mut file)?;
    let range = ByteRange::resolve(start, end, header.payload_len);
    RangeDecryptor::with_payload_len(file, &key, &header.iv, range, header.payload_len, chunk_size)
}

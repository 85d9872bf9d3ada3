//! Error type shared by the range decryptor, the warm worker and the public API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("Invalid key length: {0} bytes (expected 16 or 32)")]
    InvalidKeyLength(usize),
    #[error("Invalid key encoding (expected base64)")]
    InvalidKeyEncoding,
    #[error("Truncated file: {0} bytes is too short to hold a 16-byte IV")]
    TruncatedFile(u64),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decrypt requested before any file was opened")]
    NotOpened,
    #[error("Decryption worker is not running")]
    WorkerUnavailable,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

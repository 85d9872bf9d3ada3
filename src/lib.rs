//! Seekable AES-CTR decryption of `IV || ciphertext` files.
//!
//! [`RangeDecryptor`] decrypts any byte range of the payload without
//! touching preceding data. [`WarmWorker`] keeps the last file and key open
//! on a background thread and serves repeated requests from it via
//! [`WarmWorker::open_decrypt_read`].

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod range;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::DecryptStream;
pub use config::WorkerConfig;
pub use crypto::{CipherKey, KeyInput};
pub use error::DecryptError;
pub use range::{decrypt_range, read_header, ByteRange, FileHeader, RangeDecryptor, DEFAULT_CHUNK_SIZE};
pub use worker::{FileOpener, FsOpener, WarmWorker, WorkerStats};

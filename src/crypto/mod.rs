//! AES-CTR primitives and key handling.

pub mod aes_ctr;
pub mod key;

pub use aes_ctr::{counter_for_block, CtrCipher, AES_BLOCK_SIZE, AES_CTR_IV_SIZE};
pub use key::{CipherKey, KeyInput};

//! Crypto routines for the steganography engine.
//!
//! The engine only needs an opaque byte-in/byte-out boundary: every payload
//! and every metadata record is sealed with AES-256-CBC under a shared 32-byte
//! key, with a fresh random IV prepended to the ciphertext.
mod aes_cbc;
mod cipher;
mod key;

use std::path::Path;

pub use aes_cbc::{
    Aes256CbcCipher, BLOCK_SIZE, IV_SIZE, encrypted_len, is_ciphertext_len,
};
pub use cipher::Cipher;
pub use key::{KEY_SIZE, SecretKey};
use thiserror::Error;

/// Errors that can be emitted while performing cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError
{
    /// A hex string is invalid
    #[error("invalid {field} hex string: {source}")]
    InvalidHex
    {
        /// Name of the offending field
        field: Box<str>,
        /// Source hex error
        #[source]
        source: hex::FromHexError,
    },

    /// A parsed hex string has the wrong length
    #[error("{field} must be {expected} bytes but was {actual}")]
    InvalidLength
    {
        /// Name of the offending field
        field: Box<str>,
        /// Expected number of bytes
        expected: usize,
        /// Actual number of bytes
        actual: usize,
    },

    /// Reading or writing key material failed
    #[error(
        "failed to access {field} file at {}: {source}",
        .path.display()
    )]
    KeyMaterialIo
    {
        /// Name of the offending field
        field: Box<str>,
        /// Path to the file that could not be accessed
        path: Box<Path>,
        /// Source I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cipher could not be initialized
    #[error("encryption failed")]
    EncryptionFailed,

    /// Wrong key, truncated input or invalid padding
    #[error("decryption failed")]
    DecryptionFailed,
}

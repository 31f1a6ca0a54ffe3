//! Shared symmetric key material.
//!
//! Keys live on disk as a single line of hex. Raw 32-byte files are accepted
//! on load as well.
use std::fs;
use std::path::Path;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CryptoError;

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

const KEY_FIELD: &str = "key";

/// 256-bit secret shared by the encoder and the decoder.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey
{
    bytes: [u8; KEY_SIZE],
}

impl SecretKey
{
    /// Draws a fresh key from the operating system generator.
    #[must_use]
    pub fn generate() -> Self
    {
        let mut bytes = [0; KEY_SIZE];
        rand::fill(&mut bytes[..]);
        Self { bytes }
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self
    {
        Self { bytes }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE]
    {
        &self.bytes
    }

    /// Lowercase hex rendering of the key.
    #[must_use]
    pub fn to_hex(&self) -> String
    {
        hex::encode(self.bytes)
    }

    /// Parses a hex string into a key. Whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidHex`] when the text is not hex or
    /// [`CryptoError::InvalidLength`] when it does not decode to exactly
    /// [`KEY_SIZE`] bytes.
    pub fn from_hex(text: &str) -> Result<Self, CryptoError>
    {
        let hex: String = text.split_whitespace().collect();
        let mut decoded =
            hex::decode(&hex).map_err(|source| CryptoError::InvalidHex {
                field: KEY_FIELD.into(),
                source,
            })?;

        let result = Self::from_slice(&decoded);
        decoded.zeroize();
        result
    }

    /// Loads a key file.
    ///
    /// The file is treated as raw key bytes first; if it is not exactly
    /// [`KEY_SIZE`] bytes long it is parsed as hex text.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyMaterialIo`] when the file cannot be read,
    /// or a hex/length error when its contents are not a key.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CryptoError>
    {
        let path = path.as_ref();
        let mut bytes =
            fs::read(path).map_err(|source| CryptoError::KeyMaterialIo {
                field: KEY_FIELD.into(),
                path: path.into(),
                source,
            })?;

        let result = if bytes.len() == KEY_SIZE
        {
            Self::from_slice(&bytes)
        }
        else
        {
            match std::str::from_utf8(&bytes)
            {
                Ok(ascii) => Self::from_hex(ascii),
                Err(_) => Err(CryptoError::InvalidLength {
                    field: KEY_FIELD.into(),
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                }),
            }
        };

        bytes.zeroize();
        result
    }

    /// Writes the key as hex text, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyMaterialIo`] when the file cannot be
    /// written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CryptoError>
    {
        let path = path.as_ref();
        let mut text = self.to_hex();
        text.push('\n');
        let result =
            fs::write(path, text.as_bytes()).map_err(|source| {
                CryptoError::KeyMaterialIo {
                    field: KEY_FIELD.into(),
                    path: path.into(),
                    source,
                }
            });
        text.zeroize();
        result
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError>
    {
        let bytes: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidLength {
                    field: KEY_FIELD.into(),
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self { bytes })
    }
}

// Don't leak the key to the console
impl std::fmt::Debug for SecretKey
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "SecretKey {{ bytes: [..] }}")
    }
}

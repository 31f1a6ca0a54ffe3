//! Provides a trait for cryptographic ciphers.
//!
//! The steganography engine is written against this trait only, so the
//! concrete algorithm stays a black box to it.
use super::CryptoError;

/// A trait for cryptographic ciphers for encryption/decryption.
pub trait Cipher
{
    /// Encrypts the supplied plaintext and returns the ciphertext.
    ///
    /// # Arguments
    ///
    /// * `plaintext` - Data that will be encrypted accordingly to the cipher.
    ///
    /// # Returns
    ///
    /// `Ok(Vec<u8>)` containing any per-message parameters (such as an IV)
    /// followed by the ciphertext
    ///
    /// # Errors
    ///
    /// Returns:
    /// * [`CryptoError::EncryptionFailed`] when encryption fails
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypts the supplied ciphertext and returns the plaintext.
    ///
    /// # Arguments
    ///
    /// * `ciphertext` - Data that was produced by the cipher's encryption.
    ///
    /// # Returns
    ///
    /// `Ok(Vec<u8>)` containing the decrypted plaintext on success
    ///
    /// # Errors
    ///
    /// Returns:
    /// * [`CryptoError::DecryptionFailed`] when decryption fails
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Number of ciphertext bytes [`Cipher::encrypt`] produces for a
    /// plaintext of `plain_len` bytes.
    fn encrypted_len(&self, plain_len: usize) -> usize;

    /// Whether [`Cipher::encrypt`] can produce exactly `len` bytes of output.
    ///
    /// The default only demands the overhead of an empty plaintext.
    fn is_ciphertext_len(&self, len: usize) -> bool
    {
        len >= self.encrypted_len(0)
    }
}

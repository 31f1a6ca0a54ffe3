//! AES-256 in CBC mode with PKCS#7 padding.
//!
//! Every encryption draws a fresh 16-byte IV and prepends it to the output:
//! `[16-byte IV][ciphertext padded to a multiple of 16 bytes]`. Decryption
//! expects that exact layout back.
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use super::{Cipher, CryptoError, SecretKey};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Size of the random IV prepended to every ciphertext.
pub const IV_SIZE: usize = 16;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Returns the length of `IV ++ ciphertext` for a plaintext of `plain_len`
/// bytes.
///
/// PKCS#7 always appends at least one byte, so a plaintext that is already
/// block aligned grows by a full block.
#[must_use]
pub const fn encrypted_len(plain_len: usize) -> usize
{
    IV_SIZE + (plain_len / BLOCK_SIZE + 1) * BLOCK_SIZE
}

/// Whether `len` bytes can be `IV ++ ciphertext`: the IV followed by at
/// least one whole block.
#[must_use]
pub const fn is_ciphertext_len(len: usize) -> bool
{
    len >= IV_SIZE + BLOCK_SIZE && (len - IV_SIZE) % BLOCK_SIZE == 0
}

/// AES-256-CBC cipher bound to one shared key.
#[derive(Clone)]
pub struct Aes256CbcCipher
{
    key: SecretKey,
}

impl Aes256CbcCipher
{
    #[must_use]
    pub fn new(key: &SecretKey) -> Self
    {
        Self { key: key.clone() }
    }

    fn encrypt_with_iv(
        &self,
        plaintext: &[u8],
        iv: &[u8; IV_SIZE],
    ) -> Result<Vec<u8>, CryptoError>
    {
        let encryptor = Aes256CbcEnc::new_from_slices(self.key.as_bytes(), iv)
            .map_err(|_| CryptoError::EncryptionFailed)?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
        out.extend_from_slice(iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }
}

impl Cipher for Aes256CbcCipher
{
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>
    {
        // Generated every encryption session.
        let mut iv = [0; IV_SIZE];
        rand::fill(&mut iv[..]);
        self.encrypt_with_iv(plaintext, &iv)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>
    {
        if !is_ciphertext_len(ciphertext.len())
        {
            return Err(CryptoError::DecryptionFailed);
        }

        let (iv, body) = ciphertext.split_at(IV_SIZE);
        let decryptor = Aes256CbcDec::new_from_slices(self.key.as_bytes(), iv)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(body)
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    fn encrypted_len(&self, plain_len: usize) -> usize
    {
        encrypted_len(plain_len)
    }

    fn is_ciphertext_len(&self, len: usize) -> bool
    {
        is_ciphertext_len(len)
    }
}

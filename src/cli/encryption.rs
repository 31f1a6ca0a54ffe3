//! CLI key plumbing.
//!
//! Defines the shared key flag and the key file generation used by
//! `keygen`.
use std::path::Path;

use clap::Args;
use log::{debug, info};

use super::AppError;
use crate::crypto::{CryptoError, SecretKey};

/// Key arguments shared by encode/decode commands.
#[derive(Args, Clone, Debug)]
pub(super) struct KeyArgs
{
    /// File containing a raw (32-byte) or hex-encoded AES-256 key.
    #[arg(short = 'k', long = "key-file", value_name = "PATH")]
    pub(super) key_file: Box<Path>,
}

impl KeyArgs
{
    /// Loads the key named by `--key-file`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError`] when the file cannot be read or does not hold
    /// exactly one key.
    pub(super) fn load(&self) -> Result<SecretKey, CryptoError>
    {
        debug!("loading key from {}", self.key_file.display());
        SecretKey::load(&self.key_file)
    }
}

/// Writes a freshly generated key to `output` as hex text.
///
/// # Errors
///
/// Returns [`AppError::KeyExists`] instead of replacing an existing file and
/// [`AppError::Crypto`] when the file cannot be written.
pub(super) fn generate_key_file(output: &Path) -> Result<(), AppError>
{
    if output.exists()
    {
        return Err(AppError::KeyExists {
            path: output.into(),
        });
    }

    SecretKey::generate().save(output)?;
    info!("wrote new key to {}", output.display());
    Ok(())
}

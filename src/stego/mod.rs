//! Steganography engine for hiding encrypted text in RGB images.
//!
//! Hides an encrypted payload in the least-significant bits of the RGB
//! channels, visiting pixels in a scattered order (the pixel location
//! sequence, PLS) instead of raster order.
//!
//! # Modes
//!
//! - [`Mode::Simple`]: the PLS is drawn from the operating system generator.
//!   The decoder needs the encrypted side file produced by the encoder.
//! - [`Mode::Advanced`]: the PLS is derived from the key. An encrypted
//!   metadata header at pixel 0 declares the payload length, so the decoder
//!   needs only the image and the key.
//!
//! # Errors
//!
//! Returns [`StegoError`] when embedding or extracting fails.
use std::fmt;
use std::str::FromStr;

use image::RgbImage;
use thiserror::Error;

use crate::crypto::{Aes256CbcCipher, CryptoError, IV_SIZE, SecretKey};

mod bits;
mod capacity;
mod decode;
mod encode;
mod header;
mod permutation;
mod side_file;

pub use bits::{bits_to_bytes, bytes_to_bits, embed, extract};
pub use capacity::{CapacityPlan, max_message_size, plan};
pub use decode::{DecodeStage, Decoder};
pub use encode::{EncodeStage, Encoded, Encoder};
pub use header::{
    LENGTH_FIELD_BITS, MetadataRecord, SealedHeader, embed_header,
    extract_header, header_pixels_for,
};
pub use permutation::{
    PixelLocationSequence, Selection, Slot, derive_seed, generate,
};
pub use side_file::{open_side_file, seal_side_file};

/// Number of channels carrying payload bits per pixel (R, G, B)
pub const CHANNELS: usize = 3;

/// Largest encrypted payload, in bytes, the encoder writes and the decoder
/// accepts from a header
pub const MAX_REASONABLE_MSG_SIZE: usize = 100 * 1024 * 1024; // 100 MiB

/// Largest message whose encrypted payload stays within
/// [`MAX_REASONABLE_MSG_SIZE`]
// The limit is block aligned, so the IV and at least one padding byte are
// all that must fit beside the message.
pub const MAX_PLAINTEXT_SIZE: usize = MAX_REASONABLE_MSG_SIZE - IV_SIZE - 1;

/// Errors that can be emitted while embedding or extracting text
#[derive(Debug, Error)]
pub enum StegoError
{
    /// The payload plus its header does not fit in the image
    #[error(
        "payload needs {needed_pixels} pixels but only {available_pixels} are \
         available"
    )]
    Capacity
    {
        needed_pixels: usize,
        available_pixels: usize,
    },

    /// The mode name is not recognized
    #[error("unknown mode {mode:?}, expected \"simple\" or \"advanced\"")]
    InvalidMode
    {
        mode: Box<str>
    },

    /// The encrypted metadata record does not fit in the length field
    #[error(
        "encrypted metadata of {encrypted_bytes} bytes exceeds the header \
         limit of {max_bytes} bytes"
    )]
    MetadataTooLarge
    {
        encrypted_bytes: usize,
        max_bytes: usize,
    },

    /// The header region does not hold a well-formed metadata record
    #[error("invalid metadata header: {reason}")]
    InvalidHeader
    {
        reason: Box<str>
    },

    /// The encrypted payload is above [`MAX_REASONABLE_MSG_SIZE`]
    #[error(
        "encrypted payload of {payload_bytes} bytes exceeds the limit of \
         {max_bytes} bytes"
    )]
    PayloadTooLarge
    {
        payload_bytes: usize,
        max_bytes: usize,
    },

    /// The image holds fewer bits than the declared payload
    #[error(
        "declared payload of {declared_bytes} bytes exceeds the \
         {available_bytes} bytes the image can hold"
    )]
    IncompleteData
    {
        declared_bytes: usize,
        available_bytes: usize,
    },

    /// Simple mode decoding was requested without the side file
    #[error("simple mode requires the pixel location side file")]
    MissingSideFile,

    /// The side file does not describe a usable pixel location sequence
    #[error("invalid pixel location sequence: {reason}")]
    InvalidLocationSequence
    {
        reason: Box<str>
    },

    /// Something went wrong with the crypto operations
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The decoded payload is not valid UTF-8
    #[error("decoded payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// How the pixel location sequence is produced and recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode
{
    /// Random PLS, stored encrypted in a side file
    #[default]
    Simple,
    /// Key-derived PLS, payload length stored in an in-image header
    Advanced,
}

impl Mode
{
    #[must_use]
    pub const fn as_str(self) -> &'static str
    {
        match self
        {
            Self::Simple => "simple",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Mode
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode
{
    type Err = StegoError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_ascii_lowercase().as_str()
        {
            "simple" => Ok(Self::Simple),
            "advanced" => Ok(Self::Advanced),
            _ => Err(StegoError::InvalidMode { mode: s.into() }),
        }
    }
}

/// Returns the number of pixels in the image
#[must_use]
pub fn total_pixels(image: &RgbImage) -> usize
{
    (image.width() as usize) * (image.height() as usize)
}

/// Encrypts `message` with `key` and hides it in `image`.
///
/// In [`Mode::Simple`] the returned [`Encoded::side_file`] must be kept next
/// to the image; it is required for decoding.
///
/// # Errors
///
/// Returns [`StegoError`] when the message does not fit or encryption fails.
/// The image is left untouched on error.
pub fn encode_message(
    image: &mut RgbImage,
    message: &str,
    key: &SecretKey,
    mode: Mode,
) -> Result<Encoded, StegoError>
{
    let cipher = Aes256CbcCipher::new(key);
    Encoder::new(&cipher, key.as_bytes(), mode)
        .encode(image, message.as_bytes())
}

/// Recovers and decrypts a message hidden with [`encode_message`].
///
/// # Errors
///
/// Returns [`StegoError`] when the header or side file cannot be read, the
/// key is wrong, or the plaintext is not valid UTF-8.
pub fn decode_message(
    image: &RgbImage,
    key: &SecretKey,
    mode: Mode,
    side_file: Option<&[u8]>,
) -> Result<String, StegoError>
{
    let cipher = Aes256CbcCipher::new(key);
    let plaintext = Decoder::new(&cipher, key.as_bytes(), mode)
        .decode(image, side_file)?;
    String::from_utf8(plaintext).map_err(StegoError::InvalidUtf8)
}

//! Self-describing metadata header for advanced mode.
//!
//! # Format
//!
//! - First 16 LSBs: length `L` of the encrypted metadata as big-endian u16
//! - Next `8 * L` LSBs: the encrypted metadata, each byte MSB-first
//! - Slots run from pixel 0, channel 0 onward in raster order, no slot
//!   skipped, so the header spans `ceil((16 + 8L) / 3)` pixels
//!
//! The metadata plaintext is the text `advanced:<n>`, where `n` is the decimal
//! byte length of the encrypted message payload.
use image::RgbImage;
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::bits::{bits_to_bytes, bytes_to_bits, embed, extract};
use super::{CHANNELS, PixelLocationSequence, StegoError, total_pixels};
use crate::crypto::Cipher;

/// Bit length of the metadata length field
pub const LENGTH_FIELD_BITS: usize = 16;
/// Largest encrypted metadata the length field can describe
const MAX_ENCRYPTED_METADATA: usize = u16::MAX as usize;
/// Tag opening every metadata record
const RECORD_PREFIX: &str = "advanced:";

/// Number of pixels a header carrying `encrypted_len` bytes occupies.
#[must_use]
pub const fn header_pixels_for(encrypted_len: usize) -> usize
{
    (LENGTH_FIELD_BITS + encrypted_len * 8).div_ceil(CHANNELS)
}

/// Payload description stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataRecord
{
    /// Byte length of the encrypted message payload (IV included)
    pub payload_bytes: usize,
}

impl MetadataRecord
{
    #[must_use]
    pub const fn new(payload_bytes: usize) -> Self
    {
        Self { payload_bytes }
    }

    /// Serializes the record as `advanced:<payload_bytes>`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8>
    {
        format!("{RECORD_PREFIX}{}", self.payload_bytes).into_bytes()
    }

    /// Parses a record produced by [`MetadataRecord::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`StegoError::InvalidHeader`] on a missing prefix or a length
    /// that is not a plain decimal number.
    pub fn parse(bytes: &[u8]) -> Result<Self, StegoError>
    {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| invalid_header("metadata is not text"))?;
        let digits = text
            .strip_prefix(RECORD_PREFIX)
            .ok_or_else(|| invalid_header("metadata has an unknown tag"))?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid_header("metadata length is not a number"));
        }

        let payload_bytes = digits
            .parse()
            .map_err(|_| invalid_header("metadata length is out of range"))?;

        Ok(Self { payload_bytes })
    }
}

/// Encrypted, framed metadata ready to be written at pixel 0.
#[derive(Debug, Clone)]
pub struct SealedHeader
{
    bits: Vec<u8>,
    encrypted_len: usize,
}

impl SealedHeader
{
    /// Encrypts `metadata` and frames it behind the 16-bit length field.
    ///
    /// # Errors
    ///
    /// Returns [`StegoError::MetadataTooLarge`] when the encrypted metadata
    /// exceeds what the length field can describe, or the cipher's error.
    pub fn seal<C: Cipher + ?Sized>(
        metadata: &[u8],
        cipher: &C,
    ) -> Result<Self, StegoError>
    {
        let encrypted = cipher.encrypt(metadata)?;
        let length = u16::try_from(encrypted.len()).map_err(|_| {
            StegoError::MetadataTooLarge {
                encrypted_bytes: encrypted.len(),
                max_bytes: MAX_ENCRYPTED_METADATA,
            }
        })?;

        let mut framed = Vec::with_capacity(2 + encrypted.len());
        framed.extend_from_slice(&length.to_be_bytes());
        framed.extend_from_slice(&encrypted);

        Ok(Self {
            bits: bytes_to_bits(&framed),
            encrypted_len: encrypted.len(),
        })
    }

    /// Pixels the header occupies; the payload starts right after them.
    #[must_use]
    pub const fn pixel_count(&self) -> usize
    {
        header_pixels_for(self.encrypted_len)
    }

    #[must_use]
    pub const fn encrypted_len(&self) -> usize
    {
        self.encrypted_len
    }

    /// Writes the header into the first [`SealedHeader::pixel_count`]
    /// pixels.
    ///
    /// # Errors
    ///
    /// Returns [`StegoError::Capacity`] when the image is smaller than the
    /// header. The image is not modified in that case.
    pub fn write<R: Rng + ?Sized>(
        &self,
        image: &mut RgbImage,
        rng: &mut R,
    ) -> Result<usize, StegoError>
    {
        let needed_pixels = self.pixel_count();
        let available_pixels = total_pixels(image);
        if needed_pixels > available_pixels
        {
            return Err(StegoError::Capacity {
                needed_pixels,
                available_pixels,
            });
        }

        let slots = PixelLocationSequence::sequential(self.bits.len());
        embed(image, &self.bits, &slots, rng)?;
        Ok(needed_pixels)
    }
}

/// Encrypts `metadata` and writes it as the header at pixel 0.
///
/// Returns the number of pixels the header occupies, which is the offset
/// the payload sequence must start from.
///
/// # Errors
///
/// Returns [`StegoError::MetadataTooLarge`] or [`StegoError::Capacity`] when
/// the header cannot be written.
pub fn embed_header<C: Cipher + ?Sized>(
    image: &mut RgbImage,
    metadata: &[u8],
    cipher: &C,
) -> Result<usize, StegoError>
{
    let sealed = SealedHeader::seal(metadata, cipher)?;
    sealed.write(image, &mut ChaCha20Rng::from_os_rng())
}

/// Reads and decrypts the header at pixel 0.
///
/// Returns the metadata plaintext and the number of pixels the header
/// occupies.
///
/// # Errors
///
/// Returns [`StegoError::InvalidHeader`] when the length field is implausible
/// for the image or the cipher rejects the metadata.
pub fn extract_header<C: Cipher + ?Sized>(
    image: &RgbImage,
    cipher: &C,
) -> Result<(Vec<u8>, usize), StegoError>
{
    let total = total_pixels(image);
    if LENGTH_FIELD_BITS.div_ceil(CHANNELS) > total
    {
        return Err(invalid_header("image is too small to hold a header"));
    }

    let prefix =
        extract(image, &PixelLocationSequence::sequential(LENGTH_FIELD_BITS))?;
    let length = match bits_to_bytes(&prefix).as_slice()
    {
        [high, low] => usize::from(u16::from_be_bytes([*high, *low])),
        _ => return Err(invalid_header("length field is truncated")),
    };

    if length < cipher.encrypted_len(0)
    {
        return Err(invalid_header(format!(
            "declared metadata of {length} bytes is shorter than any \
             ciphertext"
        )));
    }

    let pixel_count = header_pixels_for(length);
    if pixel_count > total
    {
        return Err(invalid_header(format!(
            "declared metadata of {length} bytes runs past the {total}-pixel \
             image"
        )));
    }

    let frame_slots =
        PixelLocationSequence::sequential(LENGTH_FIELD_BITS + length * 8);
    let frame = bits_to_bytes(&extract(image, &frame_slots)?);
    let metadata = cipher
        .decrypt(&frame[LENGTH_FIELD_BITS / 8..])
        .map_err(|err| {
            invalid_header(format!("metadata could not be decrypted: {err}"))
        })?;

    debug!("read {length}-byte metadata header spanning {pixel_count} pixels");
    Ok((metadata, pixel_count))
}

/// Reads the header and parses it as a [`MetadataRecord`].
///
/// The declared payload length must be one `cipher` can produce.
pub(super) fn read_record<C: Cipher + ?Sized>(
    image: &RgbImage,
    cipher: &C,
) -> Result<(MetadataRecord, usize), StegoError>
{
    let (metadata, pixel_count) = extract_header(image, cipher)?;
    let record = MetadataRecord::parse(&metadata)?;

    if !cipher.is_ciphertext_len(record.payload_bytes)
    {
        return Err(invalid_header(format!(
            "declared payload of {} bytes is not a ciphertext length",
            record.payload_bytes
        )));
    }

    Ok((record, pixel_count))
}

fn invalid_header(reason: impl Into<Box<str>>) -> StegoError
{
    StegoError::InvalidHeader {
        reason: reason.into(),
    }
}

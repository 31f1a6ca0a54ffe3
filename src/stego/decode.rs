//! Decoding orchestrator.
//!
//! Runs `Start -> HeaderRead (advanced only) -> PlsRegenerated ->
//! BitsExtracted -> PayloadDecrypted -> Done`, or ends in `Failed`.
use image::RgbImage;
use log::debug;

use super::bits::{bits_to_bytes, extract};
use super::header::read_record;
use super::{
    CHANNELS, MAX_REASONABLE_MSG_SIZE, Mode, PixelLocationSequence, Selection,
    StegoError, generate, open_side_file, total_pixels,
};
use crate::crypto::Cipher;

/// Progress of a [`Decoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage
{
    Start,
    /// The metadata header was decrypted and parsed
    HeaderRead,
    PlsRegenerated,
    BitsExtracted,
    PayloadDecrypted,
    Done,
    Failed,
}

/// Recovers messages hidden by an [`Encoder`](super::Encoder).
pub struct Decoder<'a, C: Cipher + ?Sized>
{
    cipher: &'a C,
    seed_key: &'a [u8],
    mode: Mode,
    stage: DecodeStage,
}

impl<'a, C: Cipher + ?Sized> Decoder<'a, C>
{
    /// Creates a decoder. `seed_key` must match the encoder's.
    #[must_use]
    pub const fn new(cipher: &'a C, seed_key: &'a [u8], mode: Mode) -> Self
    {
        Self {
            cipher,
            seed_key,
            mode,
            stage: DecodeStage::Start,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> Mode
    {
        self.mode
    }

    /// Stage reached by the last call to [`Decoder::decode`].
    #[must_use]
    pub const fn stage(&self) -> DecodeStage
    {
        self.stage
    }

    /// Extracts and decrypts the payload hidden in `image`.
    ///
    /// `side_file` is required in simple mode and ignored in advanced mode.
    ///
    /// # Errors
    ///
    /// - [`StegoError::MissingSideFile`] in simple mode without a side file
    /// - [`StegoError::InvalidHeader`] when the advanced-mode header cannot
    ///   be read, usually because the key is wrong
    /// - [`StegoError::PayloadTooLarge`] when the header declares more than
    ///   [`MAX_REASONABLE_MSG_SIZE`] bytes
    /// - [`StegoError::IncompleteData`] when the image holds fewer bits than
    ///   the header declares
    /// - [`StegoError::InvalidLocationSequence`] for a malformed side file, or
    ///   one whose pixels do not carry a whole ciphertext
    /// - [`StegoError::Crypto`] when the payload or side file does not
    ///   decrypt
    pub fn decode(
        &mut self,
        image: &RgbImage,
        side_file: Option<&[u8]>,
    ) -> Result<Vec<u8>, StegoError>
    {
        self.stage = DecodeStage::Start;
        match self.run(image, side_file)
        {
            Ok(plaintext) =>
            {
                self.advance(DecodeStage::Done);
                Ok(plaintext)
            },
            Err(err) =>
            {
                debug!(
                    "decode ({}) failed after {:?}: {err}",
                    self.mode, self.stage
                );
                self.stage = DecodeStage::Failed;
                Err(err)
            },
        }
    }

    fn run(
        &mut self,
        image: &RgbImage,
        side_file: Option<&[u8]>,
    ) -> Result<Vec<u8>, StegoError>
    {
        let total = total_pixels(image);

        let pls = match self.mode
        {
            Mode::Simple =>
            {
                let side_file = side_file.ok_or(StegoError::MissingSideFile)?;
                open_side_file(side_file, self.cipher, total)?
            },
            Mode::Advanced => self.regenerate(image, total)?,
        };
        self.advance(DecodeStage::PlsRegenerated);

        let payload = bits_to_bytes(&extract(image, &pls)?);
        // a side file only names pixels, so its length is checked here
        if !self.cipher.is_ciphertext_len(payload.len())
        {
            return Err(StegoError::InvalidLocationSequence {
                reason: format!(
                    "sequence carries {} bytes, which is not a whole \
                     ciphertext",
                    payload.len()
                )
                .into(),
            });
        }
        self.advance(DecodeStage::BitsExtracted);

        let plaintext = self.cipher.decrypt(&payload)?;
        self.advance(DecodeStage::PayloadDecrypted);

        Ok(plaintext)
    }

    /// Reads the header and rebuilds the key-derived sequence after it.
    fn regenerate(
        &mut self,
        image: &RgbImage,
        total: usize,
    ) -> Result<PixelLocationSequence, StegoError>
    {
        let (record, header_pixels) = read_record(image, self.cipher)?;
        self.advance(DecodeStage::HeaderRead);

        let declared_bytes = record.payload_bytes;
        if declared_bytes > MAX_REASONABLE_MSG_SIZE
        {
            return Err(StegoError::PayloadTooLarge {
                payload_bytes: declared_bytes,
                max_bytes: MAX_REASONABLE_MSG_SIZE,
            });
        }

        debug!(
            "header declares {declared_bytes} payload bytes after \
             {header_pixels} pixels"
        );

        generate(
            total,
            declared_bytes * 8,
            Selection::Keyed(self.seed_key),
            header_pixels,
        )
        .map_err(|err| match err
        {
            StegoError::Capacity { .. } => StegoError::IncompleteData {
                declared_bytes,
                available_bytes: total.saturating_sub(header_pixels)
                    * CHANNELS
                    / 8,
            },
            other => other,
        })
    }

    fn advance(&mut self, next: DecodeStage)
    {
        debug!("decode ({}): {:?} -> {next:?}", self.mode, self.stage);
        self.stage = next;
    }
}

//! Encoding orchestrator.
//!
//! Runs `Start -> PayloadEncrypted -> HeaderSealed (advanced only) ->
//! PlsGenerated -> BitsEmbedded -> Done`, or ends in `Failed`. Every fallible
//! step happens before the image is touched, so a failed encode leaves the
//! image exactly as it was.
use image::RgbImage;
use log::{debug, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use super::bits::{bytes_to_bits, embed};
use super::{
    CapacityPlan, MAX_REASONABLE_MSG_SIZE, MetadataRecord, Mode, SealedHeader,
    Selection, StegoError, generate, seal_side_file, total_pixels,
};
use crate::crypto::Cipher;

/// Payload use above which a warning is logged
const NEAR_CAPACITY: f64 = 0.9;

/// Progress of an [`Encoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStage
{
    Start,
    PayloadEncrypted,
    /// The metadata record is encrypted and framed, not yet written
    HeaderSealed,
    PlsGenerated,
    /// Header and payload are written into the image
    BitsEmbedded,
    Done,
    Failed,
}

/// Result of a successful encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded
{
    /// Encrypted pixel location sequence; present in simple mode only and
    /// required for decoding
    pub side_file: Option<Vec<u8>>,
    /// Pixels taken by the metadata header (0 in simple mode)
    pub header_pixels: usize,
    /// Number of payload bits written
    pub payload_bits: usize,
}

/// Hides encrypted messages in images.
///
/// The mode is fixed at construction and never changes.
pub struct Encoder<'a, C: Cipher + ?Sized>
{
    cipher: &'a C,
    seed_key: &'a [u8],
    mode: Mode,
    stage: EncodeStage,
}

impl<'a, C: Cipher + ?Sized> Encoder<'a, C>
{
    /// Creates an encoder.
    ///
    /// `seed_key` is the key material the advanced-mode pixel sequence is
    /// derived from; it must be the same bytes the decoder uses.
    #[must_use]
    pub const fn new(cipher: &'a C, seed_key: &'a [u8], mode: Mode) -> Self
    {
        Self {
            cipher,
            seed_key,
            mode,
            stage: EncodeStage::Start,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> Mode
    {
        self.mode
    }

    /// Stage reached by the last call to [`Encoder::encode`].
    #[must_use]
    pub const fn stage(&self) -> EncodeStage
    {
        self.stage
    }

    /// Encrypts `message` and embeds it into `image`.
    ///
    /// # Errors
    ///
    /// Returns [`StegoError::PayloadTooLarge`] when the encrypted payload is
    /// above [`MAX_REASONABLE_MSG_SIZE`], [`StegoError::Capacity`] when the
    /// payload and header do not fit, [`StegoError::MetadataTooLarge`] when
    /// the header cannot describe the payload, or the cipher's error. The
    /// image is untouched on error.
    pub fn encode(
        &mut self,
        image: &mut RgbImage,
        message: &[u8],
    ) -> Result<Encoded, StegoError>
    {
        self.stage = EncodeStage::Start;
        match self.run(image, message)
        {
            Ok(encoded) =>
            {
                self.advance(EncodeStage::Done);
                Ok(encoded)
            },
            Err(err) =>
            {
                debug!(
                    "encode ({}) failed after {:?}: {err}",
                    self.mode, self.stage
                );
                self.stage = EncodeStage::Failed;
                Err(err)
            },
        }
    }

    fn run(
        &mut self,
        image: &mut RgbImage,
        message: &[u8],
    ) -> Result<Encoded, StegoError>
    {
        let total = total_pixels(image);
        let payload = self.cipher.encrypt(message)?;
        // the decoder refuses anything larger
        if payload.len() > MAX_REASONABLE_MSG_SIZE
        {
            return Err(StegoError::PayloadTooLarge {
                payload_bytes: payload.len(),
                max_bytes: MAX_REASONABLE_MSG_SIZE,
            });
        }
        self.advance(EncodeStage::PayloadEncrypted);

        let header = match self.mode
        {
            Mode::Simple => None,
            Mode::Advanced =>
            {
                let record = MetadataRecord::new(payload.len());
                let sealed =
                    SealedHeader::seal(&record.to_bytes(), self.cipher)?;
                self.advance(EncodeStage::HeaderSealed);
                Some(sealed)
            },
        };
        let header_pixels =
            header.as_ref().map_or(0, SealedHeader::pixel_count);

        let plan =
            CapacityPlan::new(self.mode, total, header_pixels, payload.len());
        plan.check()?;
        if plan.utilization() > NEAR_CAPACITY
        {
            warn!(
                "payload uses {:.0}% of the image capacity",
                plan.utilization() * 100.0
            );
        }

        let bits = bytes_to_bits(&payload);
        let selection = match self.mode
        {
            Mode::Simple => Selection::Random,
            Mode::Advanced => Selection::Keyed(self.seed_key),
        };
        let pls = generate(total, bits.len(), selection, header_pixels)?;
        self.advance(EncodeStage::PlsGenerated);

        let side_file = match self.mode
        {
            Mode::Simple => Some(seal_side_file(&pls, self.cipher)?),
            Mode::Advanced => None,
        };

        // Nothing below can fail on a plan that passed; the image is only
        // written from here on.
        let mut rng = ChaCha20Rng::from_os_rng();
        if let Some(header) = &header
        {
            header.write(image, &mut rng)?;
        }
        embed(image, &bits, &pls, &mut rng)?;
        self.advance(EncodeStage::BitsEmbedded);

        debug!(
            "embedded {} payload bits after a {header_pixels}-pixel header in \
             a {total}-pixel image",
            bits.len()
        );

        Ok(Encoded {
            side_file,
            header_pixels,
            payload_bits: bits.len(),
        })
    }

    fn advance(&mut self, next: EncodeStage)
    {
        debug!("encode ({}): {:?} -> {next:?}", self.mode, self.stage);
        self.stage = next;
    }
}

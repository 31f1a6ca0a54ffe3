//! Pixel location sequence generation.
//!
//! Selects distinct pixels with a partial Fisher-Yates shuffle and expands
//! each one into up to three channel slots. The generator is either seeded
//! from the operating system or derived from the shared key, in which case
//! the decoder regenerates the very same sequence from the key alone.
//!
//! # Cross-platform portability
//!
//! Random indices are drawn from `u64` ranges so the keyed sequence does not
//! depend on the width of `usize`.
use std::collections::HashMap;

use log::trace;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use super::{CHANNELS, StegoError};

/// One addressable bit carrier: a single channel of a single pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot
{
    /// Raster index of the pixel (`y * width + x`)
    pub pixel: usize,
    /// Channel index, `0..3`
    pub channel: u8,
}

/// Source of randomness for [`generate`].
#[derive(Debug, Clone, Copy)]
pub enum Selection<'key>
{
    /// Fresh operating system entropy; the result must be stored to decode
    Random,
    /// Deterministic, derived from the key material
    Keyed(&'key [u8]),
}

/// Ordered, duplicate-free list of slots carrying the payload bits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelLocationSequence
{
    slots: Vec<Slot>,
}

impl PixelLocationSequence
{
    /// Expands pixels into consecutive channel slots `(p, 0), (p, 1), (p, 2)`
    /// until `needed_bits` slots exist.
    ///
    /// The caller guarantees the pixels are distinct and that
    /// `pixels.len() * 3 >= needed_bits`.
    pub(super) fn from_pixels(pixels: &[usize], needed_bits: usize) -> Self
    {
        let slots = pixels
            .iter()
            .flat_map(|&pixel| {
                (0..CHANNELS as u8).map(move |channel| Slot { pixel, channel })
            })
            .take(needed_bits)
            .collect();

        Self { slots }
    }

    /// Consecutive slots starting at pixel 0, channel 0.
    pub(super) fn sequential(needed_bits: usize) -> Self
    {
        let slots = (0..needed_bits)
            .map(|bit| Slot {
                pixel: bit / CHANNELS,
                channel: (bit % CHANNELS) as u8,
            })
            .collect();

        Self { slots }
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot]
    {
        &self.slots
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.slots.is_empty()
    }

    /// Distinct pixel indices in the order they are first visited.
    #[must_use]
    pub fn pixels(&self) -> Vec<usize>
    {
        let mut pixels: Vec<usize> = Vec::with_capacity(
            self.slots.len().div_ceil(CHANNELS),
        );
        for slot in &self.slots
        {
            if pixels.last() != Some(&slot.pixel)
            {
                pixels.push(slot.pixel);
            }
        }
        pixels
    }
}

/// Derives the 32-bit generator seed from the key: the SHA-256 digest read
/// as a big-endian integer, reduced modulo 2^32.
#[must_use]
pub fn derive_seed(key: &[u8]) -> u32
{
    let digest: [u8; 32] = Sha256::digest(key).into();
    u32::from_be_bytes([digest[28], digest[29], digest[30], digest[31]])
}

/// Generates the pixel location sequence for `needed_bits` payload bits.
///
/// Pixels are drawn from `[offset, total_pixels)`, so a header occupying the
/// first `offset` pixels is never reused.
///
/// # Errors
///
/// Returns [`StegoError::Capacity`] when `ceil(needed_bits / 3)` exceeds
/// `total_pixels - offset`.
pub fn generate(
    total_pixels: usize,
    needed_bits: usize,
    selection: Selection<'_>,
    offset: usize,
) -> Result<PixelLocationSequence, StegoError>
{
    let needed_pixels = needed_bits.div_ceil(CHANNELS);
    let available_pixels = total_pixels.saturating_sub(offset);
    if needed_pixels > available_pixels
    {
        return Err(StegoError::Capacity {
            needed_pixels,
            available_pixels,
        });
    }

    let pixels = match selection
    {
        Selection::Random =>
        {
            let mut rng = ChaCha20Rng::from_os_rng();
            partial_shuffle(&mut rng, offset, available_pixels, needed_pixels)
        },
        Selection::Keyed(key) =>
        {
            let seed = derive_seed(key);
            let mut rng = ChaCha20Rng::seed_from_u64(u64::from(seed));
            partial_shuffle(&mut rng, offset, available_pixels, needed_pixels)
        },
    };

    trace!(
        "selected {} of {available_pixels} pixels from offset {offset} for \
         {needed_bits} bits",
        pixels.len()
    );

    Ok(PixelLocationSequence::from_pixels(&pixels, needed_bits))
}

/// Runs the last `count` steps of a Fisher-Yates shuffle over the virtual
/// array `[offset, offset + len)` and returns its tail.
///
/// Only swapped positions are materialized, which yields exactly the
/// elements a full array would, in O(count).
fn partial_shuffle<R: Rng + ?Sized>(
    rng: &mut R,
    offset: usize,
    len: usize,
    count: usize,
) -> Vec<usize>
{
    let mut displaced: HashMap<usize, usize> =
        HashMap::with_capacity(count * 2);
    let value_at = |displaced: &HashMap<usize, usize>, position: usize| {
        displaced
            .get(&position)
            .copied()
            .unwrap_or(offset + position)
    };

    for step in 0..count
    {
        let last = len - 1 - step;
        let pick = rng.random_range(0..=last as u64) as usize;

        let picked = value_at(&displaced, pick);
        let tail = value_at(&displaced, last);
        displaced.insert(pick, tail);
        displaced.insert(last, picked);
    }

    (len - count..len)
        .map(|position| value_at(&displaced, position))
        .collect()
}

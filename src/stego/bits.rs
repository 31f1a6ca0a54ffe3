//! Bit-level embedding and extraction.
//!
//! Bits are written with LSB matching: a channel whose least-significant bit
//! already equals the payload bit is left alone, otherwise it is moved by one
//! step up or down. Channel values therefore never change by more than 1.
//!
//! # Format
//!
//! - Bytes are flattened MSB-first (bit 7 to bit 0)
//! - Bit `i` lives in the channel addressed by slot `i` of the sequence
use image::RgbImage;
use rand::Rng;

use super::{
    CHANNELS, PixelLocationSequence, Slot, StegoError, total_pixels,
};

/// Flattens bytes into bits, each byte MSB-first.
#[must_use]
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8>
{
    BitStream::new(bytes).collect()
}

/// Packs bits back into bytes, MSB-first.
///
/// A trailing run of fewer than 8 bits is dropped, never zero-padded.
#[must_use]
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8>
{
    bits.chunks_exact(u8::BITS as usize)
        .map(|chunk| chunk.iter().fold(0u8, |byte, &bit| (byte << 1) | bit))
        .collect()
}

/// Writes `bits` into the channels addressed by `pls`, in order.
///
/// `rng` picks the direction of each ±1 adjustment on interior values.
///
/// # Errors
///
/// Returns [`StegoError::InvalidLocationSequence`] when the sequence is
/// shorter than the bitstream or addresses a pixel outside the image. The
/// image is not modified in that case.
pub fn embed<R: Rng + ?Sized>(
    image: &mut RgbImage,
    bits: &[u8],
    pls: &PixelLocationSequence,
    rng: &mut R,
) -> Result<(), StegoError>
{
    if pls.len() < bits.len()
    {
        return Err(StegoError::InvalidLocationSequence {
            reason: format!(
                "{} slots cannot carry {} bits",
                pls.len(),
                bits.len()
            )
            .into(),
        });
    }
    check_bounds(image, &pls.slots()[..bits.len()])?;

    let width = image.width() as usize;
    for (slot, &bit) in pls.slots().iter().zip(bits)
    {
        let (x, y) = coordinates(slot.pixel, width);
        let channel =
            &mut image.get_pixel_mut(x, y).0[usize::from(slot.channel)];
        *channel = match_lsb(*channel, bit & 1, rng);
    }

    Ok(())
}

/// Reads one bit from the least-significant bit of every slot's channel.
///
/// # Errors
///
/// Returns [`StegoError::InvalidLocationSequence`] when a slot addresses a
/// pixel outside the image.
pub fn extract(
    image: &RgbImage,
    pls: &PixelLocationSequence,
) -> Result<Vec<u8>, StegoError>
{
    check_bounds(image, pls.slots())?;

    let width = image.width() as usize;
    let bits = pls
        .slots()
        .iter()
        .map(|slot| {
            let (x, y) = coordinates(slot.pixel, width);
            image.get_pixel(x, y).0[usize::from(slot.channel)] & 1
        })
        .collect();

    Ok(bits)
}

/// Adjusts `value` by at most one so that its LSB equals `bit`.
fn match_lsb<R: Rng + ?Sized>(value: u8, bit: u8, rng: &mut R) -> u8
{
    if value & 1 == bit
    {
        return value;
    }

    match value
    {
        0 => 1,
        u8::MAX => u8::MAX - 1,
        _ =>
        {
            if rng.random_bool(0.5)
            {
                value + 1
            }
            else
            {
                value - 1
            }
        },
    }
}

fn check_bounds(image: &RgbImage, slots: &[Slot]) -> Result<(), StegoError>
{
    let total = total_pixels(image);
    let outside = |slot: &&Slot| {
        slot.pixel >= total || usize::from(slot.channel) >= CHANNELS
    };
    match slots.iter().find(outside)
    {
        Some(slot) => Err(StegoError::InvalidLocationSequence {
            reason: format!(
                "slot (pixel {}, channel {}) is outside a {total}-pixel image",
                slot.pixel, slot.channel
            )
            .into(),
        }),
        None => Ok(()),
    }
}

const fn coordinates(pixel: usize, width: usize) -> (u32, u32)
{
    ((pixel % width) as u32, (pixel / width) as u32)
}

/// Iterator over the bits of a byte slice, MSB-first
#[derive(Default)]
struct BitStream<'bytes>
{
    /// The bytes to flatten
    bytes: &'bytes [u8],
    /// The index of the next byte
    byte_index: usize,
    /// The index of the next bit in the current byte
    bit_index: u8,
}

impl<'bytes> BitStream<'bytes>
{
    fn new(bytes: &'bytes [u8]) -> Self
    {
        Self {
            bytes,
            ..Default::default()
        }
    }
}

impl Iterator for BitStream<'_>
{
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item>
    {
        let byte = *self.bytes.get(self.byte_index)?;
        let shift = 7 - self.bit_index;
        let bit = (byte >> shift) & 1;

        self.bit_index += 1;
        if self.bit_index == 8
        {
            // reset the bit index and move to the next byte
            self.bit_index = 0;
            self.byte_index += 1;
        }

        Some(bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>)
    {
        let remaining = (self.bytes.len() - self.byte_index) * 8
            - usize::from(self.bit_index);
        (remaining, Some(remaining))
    }
}

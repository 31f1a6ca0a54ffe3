//! Capacity arithmetic shared by the orchestrators and the CLI.
//!
//! Every pixel carries three bits. In advanced mode the header occupies whole
//! pixels at the start of the image, so it costs `3 * header_pixels` bits.
//! A payload fits exactly when the permutation engine can find
//! `ceil(bits / 3)` free pixels after the header.
use super::{CHANNELS, MetadataRecord, Mode, StegoError, header_pixels_for};
use crate::crypto::{BLOCK_SIZE, IV_SIZE, encrypted_len};

/// Outcome of a capacity check for one payload in one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPlan
{
    pub mode: Mode,
    pub total_pixels: usize,
    /// Pixels reserved for the metadata header (0 in simple mode)
    pub header_pixels: usize,
    /// Encrypted payload size, IV and padding included
    pub payload_bytes: usize,
    pub needed_bits: usize,
    /// Bits available to the payload after the header
    pub max_bits: usize,
}

impl CapacityPlan
{
    /// Plans a payload against a known header size.
    #[must_use]
    pub const fn new(
        mode: Mode,
        total_pixels: usize,
        header_pixels: usize,
        payload_bytes: usize,
    ) -> Self
    {
        Self {
            mode,
            total_pixels,
            header_pixels,
            payload_bytes,
            needed_bits: payload_bytes.saturating_mul(8),
            max_bits: total_pixels.saturating_sub(header_pixels) * CHANNELS,
        }
    }

    #[must_use]
    pub const fn fits(&self) -> bool
    {
        self.needed_bits <= self.max_bits
    }

    /// Largest plaintext message that fits the bits left after the header,
    /// leaving room for the IV and one padding block.
    #[must_use]
    pub const fn max_message_bytes(&self) -> usize
    {
        (self.max_bits / 8).saturating_sub(IV_SIZE + BLOCK_SIZE)
    }

    /// Fraction of the available bits the payload uses.
    #[must_use]
    pub fn utilization(&self) -> f64
    {
        if self.max_bits == 0
        {
            return f64::INFINITY;
        }
        self.needed_bits as f64 / self.max_bits as f64
    }

    /// # Errors
    ///
    /// Returns [`StegoError::Capacity`] with the same figures the
    /// permutation engine would report.
    pub fn check(&self) -> Result<(), StegoError>
    {
        if self.fits()
        {
            Ok(())
        }
        else
        {
            Err(StegoError::Capacity {
                needed_pixels: self.needed_bits.div_ceil(CHANNELS),
                available_pixels: self
                    .total_pixels
                    .saturating_sub(self.header_pixels),
            })
        }
    }
}

/// Plans an encrypted payload of `payload_bytes` in an image of
/// `total_pixels` pixels.
#[must_use]
pub fn plan(
    total_pixels: usize,
    mode: Mode,
    payload_bytes: usize,
) -> CapacityPlan
{
    CapacityPlan::new(
        mode,
        total_pixels,
        header_pixels(mode, payload_bytes),
        payload_bytes,
    )
}

/// Returns the maximum message size (in bytes) that can be embedded in an
/// image of `total_pixels` pixels.
///
/// Advanced mode reserves the header the largest possible payload would
/// need, so the figure never over-promises.
#[must_use]
pub fn max_message_size(total_pixels: usize, mode: Mode) -> usize
{
    let largest_payload = total_pixels.saturating_mul(CHANNELS) / 8;
    plan(total_pixels, mode, largest_payload).max_message_bytes()
}

/// Pixels taken by the header describing a payload of `payload_bytes`.
fn header_pixels(mode: Mode, payload_bytes: usize) -> usize
{
    match mode
    {
        Mode::Simple => 0,
        Mode::Advanced =>
        {
            let record = MetadataRecord::new(payload_bytes).to_bytes();
            header_pixels_for(encrypted_len(record.len()))
        },
    }
}

#[cfg(test)]
mod tests
{
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::stego::{Selection, generate};

    #[test]
    fn simple_mode_has_no_header()
    {
        let plan = plan(1024, Mode::Simple, 384);
        assert_eq!(plan.header_pixels, 0);
        assert_eq!(plan.max_bits, 3072);
        assert!(plan.fits());
        assert_eq!(max_message_size(1024, Mode::Simple), 352);
    }

    #[test]
    fn advanced_mode_reserves_header()
    {
        // "advanced:32" encrypts to 32 bytes -> 91 pixels
        let plan = plan(4096, Mode::Advanced, 32);
        assert_eq!(plan.header_pixels, 91);
        assert_eq!(plan.max_bits, (4096 - 91) * 3);

        // largest payload 1536 bytes -> "advanced:1536" -> 91 pixels
        assert_eq!(max_message_size(4096, Mode::Advanced), 12015 / 8 - 32);
    }

    #[test]
    fn exact_fit_succeeds_and_one_bit_more_fails()
    {
        // 48 encrypted bytes = 384 bits = exactly 128 pixels
        assert!(plan(128, Mode::Simple, 48).fits());
        let error = plan(127, Mode::Simple, 48)
            .check()
            .expect_err("one pixel short");
        assert!(matches!(
            error,
            StegoError::Capacity {
                needed_pixels: 128,
                available_pixels: 127
            }
        ));

        let exact = CapacityPlan::new(Mode::Advanced, 300, 100, 75);
        assert_eq!(exact.needed_bits, exact.max_bits);
        assert!(exact.fits());
        generate(300, exact.max_bits, Selection::Keyed(b"k"), 100)
            .expect("exact fit");
        generate(300, exact.max_bits + 1, Selection::Keyed(b"k"), 100)
            .expect_err("one bit more");
    }

    #[test]
    fn planner_agrees_with_permutation_engine()
    {
        let mut rng = ChaCha20Rng::seed_from_u64(0xCA9A);
        for _ in 0..2000
        {
            let total_pixels = rng.random_range(0..600usize);
            let payload_bytes = rng.random_range(0..300usize);
            let mode = if rng.random_bool(0.5)
            {
                Mode::Simple
            }
            else
            {
                Mode::Advanced
            };

            let plan = plan(total_pixels, mode, payload_bytes);
            let generated = generate(
                total_pixels,
                plan.needed_bits,
                Selection::Keyed(b"agreement"),
                plan.header_pixels,
            );

            assert_eq!(
                plan.fits(),
                generated.is_ok(),
                "disagreement for {plan:?}"
            );
        }
    }

    #[test]
    fn advertised_maximum_always_fits()
    {
        for total_pixels in [0, 1, 50, 86, 200, 1000, 4096, 10_000]
        {
            for mode in [Mode::Simple, Mode::Advanced]
            {
                let max = max_message_size(total_pixels, mode);
                if max == 0
                {
                    continue;
                }
                let plan = plan(total_pixels, mode, encrypted_len(max));
                assert!(plan.fits(), "{max} bytes must fit in {plan:?}");
            }
        }
    }

    #[test]
    fn plaintext_limit_matches_payload_limit()
    {
        use crate::stego::{MAX_PLAINTEXT_SIZE, MAX_REASONABLE_MSG_SIZE};

        assert_eq!(encrypted_len(MAX_PLAINTEXT_SIZE), MAX_REASONABLE_MSG_SIZE);
        let one_more = encrypted_len(MAX_PLAINTEXT_SIZE + 1);
        assert!(one_more > MAX_REASONABLE_MSG_SIZE);
    }

    #[test]
    fn tiny_images_have_no_capacity()
    {
        assert_eq!(max_message_size(4, Mode::Simple), 0);
        assert_eq!(max_message_size(4, Mode::Advanced), 0);
        assert!(!plan(4, Mode::Simple, 32).fits());
        assert!(!plan(50, Mode::Advanced, 32).fits());
    }
}

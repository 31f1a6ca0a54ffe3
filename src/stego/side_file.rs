//! Encrypted pixel location side file used by simple mode.
//!
//! # Format
//!
//! The plaintext is the comma-separated list of decimal pixel indices of the
//! sequence, one entry per pixel in visiting order. Every entry stands for
//! channels 0, 1 and 2 of that pixel. The text is sealed with the shared
//! cipher before it is written out.
use std::collections::HashSet;

use super::{PixelLocationSequence, StegoError};
use crate::crypto::Cipher;

/// Serializes and encrypts the pixels of `pls`.
///
/// # Errors
///
/// Returns the cipher's error when encryption fails.
pub fn seal_side_file<C: Cipher + ?Sized>(
    pls: &PixelLocationSequence,
    cipher: &C,
) -> Result<Vec<u8>, StegoError>
{
    let text = pls
        .pixels()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");

    Ok(cipher.encrypt(text.as_bytes())?)
}

/// Decrypts a side file and rebuilds the sequence it describes.
///
/// Each pixel expands to all three channels; any surplus bits this adds past
/// the payload are dropped later as a trailing partial byte.
///
/// # Errors
///
/// Returns [`StegoError::Crypto`] when the side file cannot be decrypted and
/// [`StegoError::InvalidLocationSequence`] when an entry is not a number,
/// repeats, or lies outside an image of `total_pixels` pixels.
pub fn open_side_file<C: Cipher + ?Sized>(
    side_file: &[u8],
    cipher: &C,
    total_pixels: usize,
) -> Result<PixelLocationSequence, StegoError>
{
    let plaintext = cipher.decrypt(side_file)?;
    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| invalid_sequence("side file is not text".into()))?;

    if text.is_empty()
    {
        return Ok(PixelLocationSequence::default());
    }

    let mut seen = HashSet::new();
    let mut pixels = Vec::new();
    for entry in text.split(',')
    {
        let pixel: usize = entry.trim().parse().map_err(|_| {
            invalid_sequence(format!("{entry:?} is not a pixel index"))
        })?;

        if pixel >= total_pixels
        {
            return Err(invalid_sequence(format!(
                "pixel {pixel} is outside a {total_pixels}-pixel image"
            )));
        }
        if !seen.insert(pixel)
        {
            return Err(invalid_sequence(format!("pixel {pixel} repeats")));
        }
        pixels.push(pixel);
    }

    let slots = pixels.len() * super::CHANNELS;
    Ok(PixelLocationSequence::from_pixels(&pixels, slots))
}

fn invalid_sequence(reason: String) -> StegoError
{
    StegoError::InvalidLocationSequence {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::crypto::{Aes256CbcCipher, CryptoError, SecretKey};
    use crate::stego::{Selection, generate};

    fn cipher() -> Aes256CbcCipher
    {
        Aes256CbcCipher::new(&SecretKey::generate())
    }

    #[test]
    fn plaintext_is_comma_separated_pixels()
    {
        let cipher = cipher();
        let pls = PixelLocationSequence::from_pixels(&[17, 3, 250], 8);

        let sealed = seal_side_file(&pls, &cipher).expect("seal");
        let text = cipher.decrypt(&sealed).expect("decrypt");
        assert_eq!(text, b"17,3,250");
    }

    #[test]
    fn reopened_sequence_covers_original_slots()
    {
        let cipher = cipher();
        let pls = generate(900, 1000, Selection::Random, 0).expect("fits");

        let sealed = seal_side_file(&pls, &cipher).expect("seal");
        let reopened = open_side_file(&sealed, &cipher, 900).expect("open");

        // 1000 bits need 334 pixels; the last pixel gains two extra slots
        assert_eq!(reopened.len(), 1002);
        assert_eq!(&reopened.slots()[..1000], pls.slots());
    }

    #[test]
    fn empty_sequence_roundtrips()
    {
        let cipher = cipher();
        let sealed = seal_side_file(&PixelLocationSequence::default(), &cipher)
            .expect("seal");
        let reopened = open_side_file(&sealed, &cipher, 10).expect("open");
        assert!(reopened.is_empty());
    }

    #[test]
    fn rejects_bad_entries()
    {
        let cipher = cipher();
        for text in ["1,2,x", "1,,2", "1,2,1", "1,2,10"]
        {
            let sealed = cipher.encrypt(text.as_bytes()).expect("encrypt");
            let error = open_side_file(&sealed, &cipher, 10)
                .expect_err("bad side file must fail");
            assert!(
                matches!(error, StegoError::InvalidLocationSequence { .. }),
                "unexpected error for {text:?}: {error:?}"
            );
        }
    }

    #[test]
    fn truncated_side_file_fails_decryption()
    {
        let cipher = cipher();
        let pls = PixelLocationSequence::from_pixels(&[1, 2, 3], 9);
        let sealed = seal_side_file(&pls, &cipher).expect("seal");

        let error = open_side_file(&sealed[..sealed.len() - 3], &cipher, 10)
            .expect_err("truncated side file");
        assert!(matches!(
            error,
            StegoError::Crypto(CryptoError::DecryptionFailed)
        ));
    }
}

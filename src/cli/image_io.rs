//! CLI image helpers.
//!
//! Only lossless formats can carry LSB payloads, so encoding is limited to
//! the formats listed in [`LosslessFormat`]. Every image is normalized to
//! 8-bit RGB on load.
use std::fs::File;
use std::io::{BufWriter, Error, ErrorKind, Write};
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, RgbImage};
use log::debug;

use super::AppError;

/// Image formats that preserve every channel bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LosslessFormat
{
    Png,
    Bmp,
    Tiff,
    Ppm,
}

impl LosslessFormat
{
    /// Detects the format from the extension of `path`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnsupportedFormat`] for a missing or lossy
    /// extension.
    pub(super) fn from_path(path: &Path) -> Result<Self, AppError>
    {
        let extension = normalized_extension(path);
        match extension.as_deref()
        {
            Some("png") => Ok(Self::Png),
            Some("bmp") => Ok(Self::Bmp),
            Some("tif" | "tiff") => Ok(Self::Tiff),
            Some("ppm") => Ok(Self::Ppm),
            other => Err(AppError::UnsupportedFormat {
                extension: other.unwrap_or("<unknown>").into(),
            }),
        }
    }

    pub(super) const fn name(self) -> &'static str
    {
        match self
        {
            Self::Png => "png",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Ppm => "ppm",
        }
    }
}

/// Checks that `input` and `output` name the same lossless format.
///
/// # Errors
///
/// Returns [`AppError::DifferentFormats`] when the extensions differ and
/// [`AppError::UnsupportedFormat`] when the shared format is lossy.
pub(super) fn matching_format(
    input: &Path,
    output: &Path,
) -> Result<LosslessFormat, AppError>
{
    let input_ext = normalized_extension(input);
    let output_ext = normalized_extension(output);

    let same = match (input_ext.as_deref(), output_ext.as_deref())
    {
        (Some("tif" | "tiff"), Some("tif" | "tiff")) => true,
        (input, output) => input == output,
    };
    if !same
    {
        return Err(AppError::DifferentFormats {
            input_extension: input_ext
                .as_deref()
                .unwrap_or("<unknown>")
                .into(),
            output_extension: output_ext
                .as_deref()
                .unwrap_or("<unknown>")
                .into(),
        });
    }

    LosslessFormat::from_path(output)
}

/// Normalizes the extension of a path to lowercase.
pub(super) fn normalized_extension(path: impl AsRef<Path>) -> Option<String>
{
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Loads an image from the specified path and converts it to an RGB buffer.
///
/// # Errors
///
/// * [`AppError::Read`] when the path is a directory
/// * [`AppError::ImageOpen`] when the image cannot be loaded
pub(super) fn load_image(path: impl AsRef<Path>) -> Result<RgbImage, AppError>
{
    let path = path.as_ref();
    if path.is_dir()
    {
        let message = format!("{} is a directory", path.display());
        return Err(AppError::Read {
            path: path.into(),
            source: Error::new(ErrorKind::IsADirectory, message),
        });
    }

    let image = image::open(path)
        .map_err(|source| AppError::ImageOpen {
            path: path.into(),
            source,
        })
        .map(DynamicImage::into_rgb8)?;

    debug!(
        "loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Writes `image` to `output` with the encoder for `format`.
///
/// # Errors
///
/// * [`AppError::Write`] when the file cannot be created
/// * [`AppError::ImageEncode`] when the image cannot be encoded
pub(super) fn write_image(
    image: &RgbImage,
    format: LosslessFormat,
    output: impl AsRef<Path>,
) -> Result<(), AppError>
{
    let output = output.as_ref();
    let file = File::create(output).map_err(|source| AppError::Write {
        path: output.into(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    let encoded = match format
    {
        LosslessFormat::Png => image.write_with_encoder(
            PngEncoder::new_with_quality(
                &mut writer,
                CompressionType::Default,
                FilterType::Adaptive,
            ),
        ),
        LosslessFormat::Bmp =>
        {
            image.write_with_encoder(BmpEncoder::new(&mut writer))
        },
        LosslessFormat::Tiff =>
        {
            image.write_with_encoder(TiffEncoder::new(&mut writer))
        },
        LosslessFormat::Ppm => image.write_with_encoder(
            PnmEncoder::new(&mut writer)
                .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary)),
        ),
    };

    encoded.map_err(|source| AppError::ImageEncode {
        path: output.into(),
        target_format: format.name().into(),
        source,
    })?;
    writer.flush().map_err(|source| AppError::Write {
        path: output.into(),
        source,
    })?;

    debug!("wrote {} as {}", output.display(), format.name());
    Ok(())
}

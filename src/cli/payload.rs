//! CLI payload orchestration.
//!
//! Covers everything that moves message text and side files between the
//! filesystem and the engine:
//! * resolves the message source of `encode`
//! * names, writes and reads the simple-mode side file
//! * delivers the decoded text to a file or stdout
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::info;

use super::{AppError, EncodingArgs};
use crate::stego::MAX_PLAINTEXT_SIZE;

/// Extension appended to the output image name for the default side file
pub(super) const SIDE_FILE_EXTENSION: &str = "pls";

/// Resolves the message to embed from the command line arguments.
///
/// # Errors
///
/// Returns [`AppError::Read`] when the message file cannot be read or is
/// not UTF-8 and [`AppError::MessageTooLarge`] for oversized messages.
pub(super) fn resolve_message(
    args: &mut EncodingArgs,
) -> Result<String, AppError>
{
    let message = match (args.text.take(), &args.text_file)
    {
        // take the ownership of the text
        (Some(text), None) => text,
        (None, Some(path)) =>
        {
            fs::read_to_string(path.as_ref()).map_err(|source| {
                AppError::Read {
                    path: path.as_ref().into(),
                    source,
                }
            })?
        },
        _ => unreachable!(
            "mutually exclusive group should ensure that either text or \
             text_file is provided"
        ),
    };

    check_message_size(message.len())?;
    Ok(message)
}

/// Rejects messages whose encrypted payload the decoder would refuse.
///
/// # Errors
///
/// Returns [`AppError::MessageTooLarge`] above [`MAX_PLAINTEXT_SIZE`].
pub(super) fn check_message_size(bytes: usize) -> Result<(), AppError>
{
    if bytes > MAX_PLAINTEXT_SIZE
    {
        return Err(AppError::MessageTooLarge {
            bytes,
            max_bytes: MAX_PLAINTEXT_SIZE,
        });
    }
    Ok(())
}

/// Returns the explicit side file path, or `<OUTPUT>.pls` next to the output
/// image.
pub(super) fn side_file_path(
    explicit: Option<&Path>,
    output: &Path,
) -> PathBuf
{
    explicit.map_or_else(
        || {
            let mut name = OsString::from(output.as_os_str());
            name.push(".");
            name.push(SIDE_FILE_EXTENSION);
            PathBuf::from(name)
        },
        Path::to_path_buf,
    )
}

/// Writes the encrypted side file.
///
/// # Errors
///
/// Returns [`AppError::Write`] when the file cannot be written.
pub(super) fn write_side_file(
    path: &Path,
    sealed: &[u8],
) -> Result<(), AppError>
{
    fs::write(path, sealed).map_err(|source| AppError::Write {
        path: path.into(),
        source,
    })?;
    info!("wrote side file {} ({} bytes)", path.display(), sealed.len());
    Ok(())
}

/// Reads an encrypted side file.
///
/// # Errors
///
/// Returns [`AppError::Read`] when the file cannot be read.
pub(super) fn read_side_file(path: &Path) -> Result<Vec<u8>, AppError>
{
    fs::read(path).map_err(|source| AppError::Read {
        path: path.into(),
        source,
    })
}

/// Writes the decoded message to `output`, or to stdout when it is `None`.
///
/// # Errors
///
/// Returns [`AppError::Write`] when the file cannot be written and
/// [`AppError::Io`] when stdout is closed.
pub(super) fn write_message(
    message: &str,
    output: Option<&Path>,
) -> Result<(), AppError>
{
    if let Some(path) = output
    {
        fs::write(path, message.as_bytes()).map_err(|source| {
            AppError::Write {
                path: path.into(),
                source,
            }
        })?;
        info!("wrote decoded message to {}", path.display());
    }
    else
    {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{message}")?;
    }

    Ok(())
}

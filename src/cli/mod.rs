//! Command line interface for the application.
//!
//! Provides an entry point for the application and handles the CLI arguments.
mod encryption;
mod image_io;
mod payload;

use std::path::Path;

use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use const_format::formatcp;
use log::{LevelFilter, info, warn};
use thiserror::Error;

use self::encryption::{KeyArgs, generate_key_file};
use self::image_io::{load_image, matching_format, write_image};
use self::payload::{
    SIDE_FILE_EXTENSION, read_side_file, resolve_message, side_file_path,
    write_message, write_side_file,
};
use crate::crypto::CryptoError;
use crate::stego::{
    MAX_PLAINTEXT_SIZE, Mode, StegoError, decode_message, encode_message,
    max_message_size, total_pixels,
};

/// Errors that can be emitted while handling the CLI
#[derive(Debug, Error)]
pub enum AppError
{
    /// Writing to the terminal failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read
    {
        path: Box<Path>,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written
    #[error("failed to write {}: {source}", .path.display())]
    Write
    {
        path: Box<Path>,
        #[source]
        source: std::io::Error,
    },

    /// An image could not be decoded
    #[error("failed to open image {}: {source}", .path.display())]
    ImageOpen
    {
        path: Box<Path>,
        #[source]
        source: image::ImageError,
    },

    /// An image could not be encoded
    #[error(
        "failed to encode {} as {target_format}: {source}",
        .path.display()
    )]
    ImageEncode
    {
        path: Box<Path>,
        target_format: Box<str>,
        #[source]
        source: image::ImageError,
    },

    /// The format is unsupported
    #[error(
        "unsupported image format {extension:?}, expected png, bmp, tiff or \
         ppm"
    )]
    UnsupportedFormat
    {
        extension: Box<str>
    },

    /// Input and output formats are different
    #[error(
        "input and output formats are different, both must be \
         {input_extension}"
    )]
    DifferentFormats
    {
        /// Extension detected on the input file
        input_extension: Box<str>,
        /// Extension detected on the output file
        output_extension: Box<str>,
    },

    /// The message exceeds the supported size
    #[error("message of {bytes} bytes exceeds the {max_bytes}-byte limit")]
    MessageTooLarge
    {
        bytes: usize,
        max_bytes: usize,
    },

    /// `keygen` would replace an existing file
    #[error("refusing to overwrite existing key file {}", .path.display())]
    KeyExists
    {
        path: Box<Path>
    },

    /// A steganography error occurred
    #[error(transparent)]
    Stego(#[from] StegoError),

    /// Something went wrong with the crypto operations
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// The main CLI parser
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Hide AES-encrypted text in lossless images with scattered LSB \
             matching",
    after_help = formatcp!(
        "Simple mode writes the pixel location side file to \
         <OUTPUT>.{} unless --side-file is given; advanced mode needs only \
         the key. Maximum supported message size is {} bytes",
        SIDE_FILE_EXTENSION,
        MAX_PLAINTEXT_SIZE
    )
)]
struct Cli
{
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

/// The main command
#[derive(Subcommand)]
enum Command
{
    Keygen(KeygenArgs),
    Encode(EncodingArgs),
    Decode(DecodingArgs),
    Cap(CapacityArgs),
}

/// Generate a new hex-encoded key file.
#[derive(Args)]
struct KeygenArgs
{
    /// Path of the key file to create.
    output: Box<Path>,
}

/// Embed a message into an image.
#[derive(Args)]
#[command(group(
    ArgGroup::new("message")
        .required(true)
        .args(["text", "text_file"])
))]
struct EncodingArgs
{
    /// Image that will receive the text.
    input: Box<Path>,
    /// Output path for the embedded image.
    output: Box<Path>,
    /// Text to embed.
    #[arg(short = 'i', long = "input", value_name = "TEXT")]
    text: Option<String>,
    /// Path to an UTF-8 text file to embed.
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    text_file: Option<Box<Path>>,
    #[command(flatten)]
    key: KeyArgs,
    /// Embedding mode: simple or advanced.
    #[arg(
        short = 'm',
        long = "mode",
        value_name = "MODE",
        default_value = "simple"
    )]
    mode: String,
    /// Where to write the simple-mode side file.
    #[arg(short = 's', long = "side-file", value_name = "PATH")]
    side_file: Option<Box<Path>>,
}

/// Extract a message from an image.
#[derive(Args)]
struct DecodingArgs
{
    /// Image that contains the text.
    input: Box<Path>,
    /// Optional file to write the decoded text. Prints to stdout when omitted.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    output_text: Option<Box<Path>>,
    #[command(flatten)]
    key: KeyArgs,
    /// Embedding mode: simple or advanced.
    #[arg(
        short = 'm',
        long = "mode",
        value_name = "MODE",
        default_value = "simple"
    )]
    mode: String,
    /// Side file written by a simple-mode encode.
    #[arg(short = 's', long = "side-file", value_name = "PATH")]
    side_file: Option<Box<Path>>,
}

/// Calculate the maximum possible message size for an image.
#[derive(Args)]
struct CapacityArgs
{
    /// Image to calculate the possible message size for.
    input: Box<Path>,
    /// Embedding mode: simple or advanced.
    #[arg(
        short = 'm',
        long = "mode",
        value_name = "MODE",
        default_value = "simple"
    )]
    mode: String,
}

/// Parses CLI arguments, sets up logging and executes the requested
/// operation.
///
/// # Errors
///
/// Returns [`AppError`] when reading or writing files, decoding images, or
/// running steganography routines fails.
pub fn run() -> Result<(), AppError>
{
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command
    {
        Command::Keygen(args) => generate_key_file(&args.output),
        Command::Encode(mut args) => handle_encode(&mut args),
        Command::Decode(args) => handle_decode(&args),
        Command::Cap(args) => handle_capacity(&args),
    }
}

/// Installs the global logger.
///
/// Without `-v` the filter comes from `RUST_LOG`, defaulting to warnings.
fn init_logging(verbose: u8)
{
    let level = match verbose
    {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if verbose == 0
    {
        builder.parse_default_env();
    }
    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(buf, "[{}] {}", record.level(), record.args())
    });

    // a second initialization is harmless
    let _ = builder.try_init();
}

/// Handles the encoding of a message into an image.
///
/// # Errors
///
/// Returns [`AppError`] when reading or writing files, or encoding the image.
fn handle_encode(args: &mut EncodingArgs) -> Result<(), AppError>
{
    let format = matching_format(&args.input, &args.output)?;
    let mode: Mode = args.mode.parse()?;

    let mut image = load_image(&args.input)?;
    let message = resolve_message(args)?;
    let key = args.key.load()?;

    // Embedding the message happens here
    let encoded = encode_message(&mut image, &message, &key, mode)?;

    write_image(&image, format, &args.output)?;
    info!(
        "hid {} bytes in {} ({mode} mode)",
        message.len(),
        args.output.display()
    );

    if let Some(sealed) = encoded.side_file
    {
        let path = side_file_path(args.side_file.as_deref(), &args.output);
        write_side_file(&path, &sealed)?;
    }
    else if args.side_file.is_some()
    {
        warn!("advanced mode writes no side file; ignoring --side-file");
    }

    Ok(())
}

/// Handles the decoding of a message from an image.
///
/// # Errors
///
/// Returns [`AppError`] when reading or writing files, or decoding the image.
fn handle_decode(args: &DecodingArgs) -> Result<(), AppError>
{
    let mode: Mode = args.mode.parse()?;
    let image = load_image(&args.input)?;
    let key = args.key.load()?;

    let side_file = match (mode, args.side_file.as_deref())
    {
        (Mode::Simple, Some(path)) => Some(read_side_file(path)?),
        (Mode::Simple, None) => return Err(StegoError::MissingSideFile.into()),
        (Mode::Advanced, _) => None,
    };

    let message = decode_message(&image, &key, mode, side_file.as_deref())?;
    write_message(&message, args.output_text.as_deref())
}

/// Handles the capacity calculation of a message for an image.
///
/// # Errors
///
/// Returns [`AppError`] when reading the image or parsing the mode.
fn handle_capacity(args: &CapacityArgs) -> Result<(), AppError>
{
    let mode: Mode = args.mode.parse()?;
    let image = load_image(&args.input)?;
    let capacity = max_message_size(total_pixels(&image), mode);

    println!("Maximum possible message size ({mode} mode): {capacity} bytes");
    if capacity > MAX_PLAINTEXT_SIZE
    {
        println!(
            "Warning: message size will be capped at the maximum supported \
             size of {MAX_PLAINTEXT_SIZE} bytes"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests
{
    use std::fmt::{Debug, Formatter, Result};
    use std::path::Path;

    use clap::{CommandFactory, Parser};
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    use super::*;
    use crate::crypto::SecretKey;

    // Debug impls are only needed in tests
    impl Debug for Cli
    {
        fn fmt(&self, f: &mut Formatter<'_>) -> Result
        {
            f.debug_struct("Cli")
                .field("verbose", &self.verbose)
                .field("command", &self.command)
                .finish()
        }
    }

    impl Debug for Command
    {
        fn fmt(&self, f: &mut Formatter<'_>) -> Result
        {
            match self
            {
                Self::Keygen(args) => f
                    .debug_tuple("Command::Keygen")
                    .field(&args.output)
                    .finish(),
                Self::Encode(args) => f
                    .debug_tuple("Command::Encode")
                    .field(args)
                    .finish(),
                Self::Decode(args) => f
                    .debug_tuple("Command::Decode")
                    .field(args)
                    .finish(),
                Self::Cap(args) => f
                    .debug_tuple("Command::Cap")
                    .field(args)
                    .finish(),
            }
        }
    }

    impl Debug for EncodingArgs
    {
        fn fmt(&self, f: &mut Formatter<'_>) -> Result
        {
            f.debug_struct("EncodingArgs")
                .field("input", &self.input)
                .field("output", &self.output)
                .field("text", &self.text)
                .field("text_file", &self.text_file)
                .field("key", &self.key)
                .field("mode", &self.mode)
                .field("side_file", &self.side_file)
                .finish()
        }
    }

    impl Debug for DecodingArgs
    {
        fn fmt(&self, f: &mut Formatter<'_>) -> Result
        {
            f.debug_struct("DecodingArgs")
                .field("input", &self.input)
                .field("output_text", &self.output_text)
                .field("key", &self.key)
                .field("mode", &self.mode)
                .field("side_file", &self.side_file)
                .finish()
        }
    }

    impl Debug for CapacityArgs
    {
        fn fmt(&self, f: &mut Formatter<'_>) -> Result
        {
            f.debug_struct("CapacityArgs")
                .field("input", &self.input)
                .field("mode", &self.mode)
                .finish()
        }
    }

    /// Image, key and output paths inside a temporary directory
    struct Workspace
    {
        dir: TempDir,
    }

    impl Workspace
    {
        fn new() -> Self
        {
            let dir = TempDir::new().expect("failed to create tempdir");
            let mut image = RgbImage::new(48, 48);
            for (x, y, pixel) in image.enumerate_pixels_mut()
            {
                *pixel = Rgb([(x * 5) as u8, (y * 5) as u8, 128]);
            }
            image.save(dir.path().join("cover.png")).expect("save cover");
            SecretKey::generate()
                .save(dir.path().join("key.hex"))
                .expect("save key");
            Self { dir }
        }

        fn path(&self, name: &str) -> Box<Path>
        {
            self.dir.path().join(name).into_boxed_path()
        }

        fn encoding_args(&self, mode: &str, output: &str) -> EncodingArgs
        {
            EncodingArgs {
                input: self.path("cover.png"),
                output: self.path(output),
                text: Some("meet at noon".into()),
                text_file: None,
                key: KeyArgs {
                    key_file: self.path("key.hex"),
                },
                mode: mode.into(),
                side_file: None,
            }
        }

        fn decoding_args(
            &self,
            mode: &str,
            input: &str,
            side_file: Option<&str>,
        ) -> DecodingArgs
        {
            DecodingArgs {
                input: self.path(input),
                output_text: Some(self.path("decoded.txt")),
                key: KeyArgs {
                    key_file: self.path("key.hex"),
                },
                mode: mode.into(),
                side_file: side_file.map(|name| self.path(name)),
            }
        }

        fn decoded(&self) -> String
        {
            std::fs::read_to_string(self.path("decoded.txt"))
                .expect("decoded text")
        }
    }

    #[test]
    fn should_reject_different_input_formats()
    {
        let workspace = Workspace::new();
        let mut args = workspace.encoding_args("simple", "output.bmp");

        let error = handle_encode(&mut args)
            .expect_err("should reject different input formats");

        assert!(matches!(
            error,
            AppError::DifferentFormats {
                input_extension,
                output_extension
            } if input_extension.as_ref() == "png"
                && output_extension.as_ref() == "bmp"
        ));
    }

    #[test]
    fn simple_mode_round_trip_through_files()
    {
        let workspace = Workspace::new();
        let mut encode = workspace.encoding_args("simple", "stego.png");
        handle_encode(&mut encode).expect("encode");
        assert!(workspace.path("stego.png.pls").exists());

        let decode = workspace.decoding_args(
            "simple",
            "stego.png",
            Some("stego.png.pls"),
        );
        handle_decode(&decode).expect("decode");
        assert_eq!(workspace.decoded(), "meet at noon");
    }

    #[test]
    fn advanced_mode_round_trip_through_files()
    {
        let workspace = Workspace::new();
        let mut encode = workspace.encoding_args("ADVANCED", "stego.png");
        handle_encode(&mut encode).expect("encode");
        assert!(!workspace.path("stego.png.pls").exists());

        let decode = workspace.decoding_args("advanced", "stego.png", None);
        handle_decode(&decode).expect("decode");
        assert_eq!(workspace.decoded(), "meet at noon");
    }

    #[test]
    fn simple_decode_without_side_file_fails()
    {
        let workspace = Workspace::new();
        let mut encode = workspace.encoding_args("simple", "stego.png");
        handle_encode(&mut encode).expect("encode");

        let decode = workspace.decoding_args("simple", "stego.png", None);
        let error = handle_decode(&decode).expect_err("side file is required");
        assert!(matches!(
            error,
            AppError::Stego(StegoError::MissingSideFile)
        ));
    }

    #[test]
    fn invalid_mode_is_an_engine_error()
    {
        let workspace = Workspace::new();
        let mut encode = workspace.encoding_args("adaptive", "stego.png");

        let error = handle_encode(&mut encode).expect_err("unknown mode");
        assert!(matches!(
            error,
            AppError::Stego(StegoError::InvalidMode { .. })
        ));
        assert!(!workspace.path("stego.png").exists());
    }

    #[test]
    fn clap_configuration_is_sound()
    {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_keygen()
    {
        let cli = Cli::try_parse_from(["pixelveil", "keygen", "secret.key"])
            .expect("expected keygen command");

        match cli.command
        {
            Command::Keygen(args) =>
            {
                assert_eq!(args.output.as_ref(), Path::new("secret.key"));
            },
            other => panic!("expected keygen command, got {other:?}"),
        }
    }

    #[test]
    fn parses_encode_with_inline_text()
    {
        let cli = Cli::try_parse_from([
            "pixelveil",
            "encode",
            "input.png",
            "output.png",
            "--input",
            "secret",
            "-k",
            "key.hex",
        ])
        .expect("expected encode command");

        match cli.command
        {
            Command::Encode(args) =>
            {
                assert_eq!(args.input.as_ref(), Path::new("input.png"));
                assert_eq!(args.output.as_ref(), Path::new("output.png"));
                assert_eq!(args.text.as_deref(), Some("secret"));
                assert!(args.text_file.is_none());
                assert_eq!(args.key.key_file.as_ref(), Path::new("key.hex"));
                assert_eq!(args.mode, "simple");
                assert!(args.side_file.is_none());
            },
            other => panic!("expected encode command, got {other:?}"),
        }
    }

    #[test]
    fn parses_encode_with_text_file_and_mode()
    {
        let cli = Cli::try_parse_from([
            "pixelveil",
            "-vv",
            "encode",
            "input.png",
            "output.png",
            "--file",
            "message.txt",
            "--key-file",
            "key.hex",
            "--mode",
            "advanced",
        ])
        .expect("expected encode command");

        assert_eq!(cli.verbose, 2);
        match cli.command
        {
            Command::Encode(args) =>
            {
                assert!(args.text.is_none());
                assert_eq!(
                    args.text_file.as_deref(),
                    Some(Path::new("message.txt"))
                );
                assert_eq!(args.mode, "advanced");
            },
            other => panic!("expected encode command, got {other:?}"),
        }
    }

    #[test]
    fn encode_requires_message_source_and_key()
    {
        Cli::try_parse_from([
            "pixelveil",
            "encode",
            "input.png",
            "output.png",
            "-k",
            "key.hex",
        ])
        .expect_err("missing message source must error");

        Cli::try_parse_from([
            "pixelveil",
            "encode",
            "input.png",
            "output.png",
            "-i",
            "secret",
        ])
        .expect_err("missing key must error");

        Cli::try_parse_from([
            "pixelveil",
            "encode",
            "input.png",
            "output.png",
            "-i",
            "secret",
            "-f",
            "message.txt",
            "-k",
            "key.hex",
        ])
        .expect_err("text and file are mutually exclusive");
    }

    #[test]
    fn parses_decode_with_side_file_and_output()
    {
        let cli = Cli::try_parse_from([
            "pixelveil",
            "decode",
            "payload.png",
            "-k",
            "key.hex",
            "-s",
            "payload.png.pls",
            "--output",
            "message.txt",
        ])
        .expect("expected decode command");

        match cli.command
        {
            Command::Decode(args) =>
            {
                assert_eq!(args.input.as_ref(), Path::new("payload.png"));
                assert_eq!(
                    args.output_text.as_deref(),
                    Some(Path::new("message.txt"))
                );
                assert_eq!(
                    args.side_file.as_deref(),
                    Some(Path::new("payload.png.pls"))
                );
            },
            other => panic!("expected decode command, got {other:?}"),
        }
    }

    #[test]
    fn parses_capacity_command()
    {
        let cli = Cli::try_parse_from([
            "pixelveil",
            "cap",
            "image.png",
            "-m",
            "advanced",
        ])
        .expect("expected capacity command");

        match cli.command
        {
            Command::Cap(args) =>
            {
                assert_eq!(args.input.as_ref(), Path::new("image.png"));
                assert_eq!(args.mode, "advanced");
            },
            other => panic!("expected capacity command, got {other:?}"),
        }
    }
}

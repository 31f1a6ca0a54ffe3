//! Image steganography with scattered LSB matching.
//!
//! Hides AES-256-CBC encrypted text in the RGB channels of lossless images.
//! The [`stego`] engine visits pixels in a key-derived or randomly drawn
//! order, [`crypto`] seals payloads and metadata, and [`cli`] exposes both
//! as a command line tool.
pub mod cli;
pub mod crypto;
pub mod stego;

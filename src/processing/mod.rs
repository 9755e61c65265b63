//! # Image Processing and Steganography
//!
//! This module hides byte payloads in images using LSB (Least Significant Bit)
//! steganography. It is split into three layers:
//!
//! - [`bits`]: payload bytes ↔ length-prefixed bitstream
//! - [`pixels`]: image ↔ flat sample sequence (row-major, `R,G,B` interleaved)
//! - [`steganography`]: embeds/extracts a bitstream in the samples' LSBs
//!
//! The helpers below are the container glue used by the binaries: they decode
//! uploaded files into RGB carriers and always encode results as PNG.

pub mod bits;
pub mod pixels;
pub mod steganography;

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::error::Result;

// Re-export main functions for convenience
pub use bits::TrailingBits;
pub use steganography::{capacity_bits, embed, extract, extract_with, max_payload_bytes};

/// Decode an image file held in memory and normalize it to 8-bit RGB.
pub fn load_rgb_from_memory(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes)?;
    Ok(pixels::normalize_to_rgb(image))
}

/// Encode an image as PNG.
///
/// PNG is lossless, so every hidden bit survives. Never hand a stego image to a
/// lossy encoder.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut output_bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut output_bytes), ImageFormat::Png)?;
    Ok(output_bytes)
}

/// Whether the bytes look like one of the accepted upload formats.
pub fn is_supported_upload(bytes: &[u8]) -> bool {
    matches!(
        image::guess_format(bytes),
        Ok(ImageFormat::Png | ImageFormat::Jpeg)
    )
}

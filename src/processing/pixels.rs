//! # Pixel Substrate
//!
//! Exposes an image's samples as one flat byte sequence and rebuilds an image
//! from such a sequence.
//!
//! The traversal order is row-major with interleaved channels
//! (`R,G,B,R,G,B,...` across each row, top row first). Embedding and extraction
//! both go through this module, so the order cannot diverge between them.

use image::{DynamicImage, RgbImage};

use crate::error::{Result, StegoError};

/// Channels per pixel the codec works on.
pub const CHANNELS: u8 = 3;

/// Borrow the flattened samples of a 3-channel, 8-bit image.
///
/// # Errors
/// - [`StegoError::UnsupportedFormat`] for any other color layout; callers should
///   run [`normalize_to_rgb`] first
pub fn flatten(image: &DynamicImage) -> Result<&[u8]> {
    match image {
        DynamicImage::ImageRgb8(rgb) => Ok(rgb.as_raw()),
        other => Err(StegoError::UnsupportedFormat(format!(
            "expected 8-bit RGB, got {:?}",
            other.color()
        ))),
    }
}

/// Rebuild an RGB image from flattened samples.
///
/// `samples.len()` must equal `height * width * channels` exactly.
pub fn unflatten(samples: Vec<u8>, height: u32, width: u32, channels: u8) -> Result<RgbImage> {
    if channels != CHANNELS {
        return Err(StegoError::UnsupportedFormat(format!(
            "expected {} channels, got {}",
            CHANNELS, channels
        )));
    }

    let expected = height as usize * width as usize * channels as usize;
    if samples.len() != expected {
        return Err(StegoError::UnsupportedFormat(format!(
            "{}x{}x{} image needs {} samples, got {}",
            width,
            height,
            channels,
            expected,
            samples.len()
        )));
    }

    RgbImage::from_raw(width, height, samples).ok_or_else(|| {
        StegoError::UnsupportedFormat(format!("cannot build {}x{} RGB image", width, height))
    })
}

/// Convert any decoded image to 8-bit RGB.
///
/// Palette, greyscale, alpha and 16-bit images are converted; alpha is discarded.
/// An image that is already 8-bit RGB is returned unchanged.
pub fn normalize_to_rgb(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Number of bits the image can carry, one per sample.
pub fn capacity_bits(image: &DynamicImage) -> Result<usize> {
    flatten(image).map(<[u8]>::len)
}

//! # LSB Steganography Implementation
//!
//! Hides a byte payload in the least significant bits of an RGB image and reads
//! it back.
//!
//! ## Algorithm
//!
//! ### Encoding Process
//! 1. Serialize the payload into a bitstream: 32-bit length header (in bits) + payload bits
//! 2. Check the bitstream fits: one bit per sample, so capacity = `width * height * 3`
//! 3. Copy the samples and, for each bit `i`, set `sample[i] = (sample[i] & 0xFE) | bit`
//! 4. Rebuild an image with the same dimensions from the new samples
//!
//! ### Decoding Process
//! 1. Take the LSB of every sample, in the same row-major `R,G,B` order
//! 2. Read the 32-bit header, then exactly that many payload bits
//!
//! ### Capacity
//! An image can store `(width * height * 3 - 32) / 8` payload bytes.
//!
//! Example: An 800x600 image can store ~180 KB.
//!
//! LSB substitution is a plain bit channel. It does not resist statistical
//! steganalysis and does not survive lossy re-encoding, so stego images must be
//! stored as PNG or another lossless format.

use image::{DynamicImage, GenericImageView};

use super::bits::{self, TrailingBits, HEADER_BITS};
use super::pixels::{self, CHANNELS};
use crate::error::{Result, StegoError};

/// Embed `payload` into the least significant bits of `image`.
///
/// The input image is never modified; the returned image is built from a fresh
/// copy of its samples. Samples past the end of the bitstream keep their
/// original values.
///
/// # Arguments
/// - `image`: 8-bit RGB carrier image
/// - `payload`: Bytes to hide
///
/// # Returns
/// - `Ok(DynamicImage)`: RGB image of the same dimensions carrying the payload
///
/// # Errors
/// - [`StegoError::UnsupportedFormat`] if the carrier is not 8-bit RGB
/// - [`StegoError::CapacityExceeded`] if header + payload bits exceed the carrier's samples
/// - [`StegoError::PayloadTooLarge`] if the payload bit count overflows the header
///
/// # Example
/// ```ignore
/// let carrier = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
/// let stego = embed(&carrier, b"hello world")?;
/// assert_eq!(extract(&stego)?, b"hello world");
/// ```
pub fn embed(image: &DynamicImage, payload: &[u8]) -> Result<DynamicImage> {
    let samples = pixels::flatten(image)?;
    let stream = bits::serialize(payload)?;

    if stream.len() > samples.len() {
        return Err(StegoError::CapacityExceeded {
            required: stream.len(),
            available: samples.len(),
        });
    }

    let mut output = samples.to_vec();
    for (sample, &bit) in output.iter_mut().zip(stream.as_bits()) {
        *sample = (*sample & 0xFE) | bit;
    }

    let (width, height) = image.dimensions();
    let rgb = pixels::unflatten(output, height, width, CHANNELS)?;
    Ok(DynamicImage::ImageRgb8(rgb))
}

/// Extract a payload previously hidden with [`embed`].
///
/// Dangling bits past the last whole byte are dropped.
///
/// # Errors
/// - [`StegoError::UnsupportedFormat`] if the image is not 8-bit RGB
/// - [`StegoError::IncompleteData`] if the header declares more bits than the image
///   holds, which is what a carrier without a payload usually produces
pub fn extract(image: &DynamicImage) -> Result<Vec<u8>> {
    extract_with(image, TrailingBits::Drop)
}

/// Extract a payload with an explicit policy for a dangling partial byte.
pub fn extract_with(image: &DynamicImage, trailing: TrailingBits) -> Result<Vec<u8>> {
    let samples = pixels::flatten(image)?;
    let lsbs: Vec<u8> = samples.iter().map(|sample| sample & 1).collect();
    bits::deserialize_with(&lsbs, trailing)
}

/// Carrier capacity in bits (header included).
pub fn capacity_bits(image: &DynamicImage) -> Result<usize> {
    pixels::capacity_bits(image)
}

/// Largest payload, in bytes, that [`embed`] accepts for this carrier.
pub fn max_payload_bytes(image: &DynamicImage) -> Result<usize> {
    Ok(capacity_bits(image)?.saturating_sub(HEADER_BITS) / 8)
}

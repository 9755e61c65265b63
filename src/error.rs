//! # Error Types
//!
//! Every fallible operation in the library returns [`Result`], whose error side is
//! the single [`StegoError`] taxonomy. Errors are reported at the call that
//! triggers them; nothing is retried internally and no partial result is returned.

use thiserror::Error;

/// Errors produced by the steganography and encryption pipeline.
#[derive(Error, Debug)]
pub enum StegoError {
    /// The image does not have the 3-channel, 8-bit layout the codec works on,
    /// or a raw sample buffer does not match the requested shape.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The bitstream does not fit in the carrier's least significant bits.
    #[error("Image too small: need {required} bits but only {available} bits are available")]
    CapacityExceeded { required: usize, available: usize },

    /// The payload bit count cannot be represented by the 32-bit length header.
    #[error("Payload too large: {bits} bits do not fit in a 32-bit length header")]
    PayloadTooLarge { bits: u64 },

    /// The header declares more bits than the carrier actually holds.
    #[error("Extracted data is incomplete: header declares {declared} bits, only {available} available")]
    IncompleteData { declared: usize, available: usize },

    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Decoding or encoding an image container (PNG, JPEG, ...) failed.
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// A stored key document could not be read.
    #[error("Key store error: {0}")]
    KeyStore(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StegoError>;

//! # stegocrypt
//!
//! Hides RSA-encrypted text in the least significant bits of RGB images.
//!
//! - [`processing`]: bitstream codec, pixel flattening and LSB embedding
//! - [`encryption`]: chunked RSA-OAEP and key import/export
//! - [`pipeline`]: encrypt-then-embed / extract-then-decrypt with injected key provisioning

pub mod common;
pub mod encryption;
pub mod error;
pub mod pipeline;
pub mod processing;
pub mod utils;

pub use error::{Result, StegoError};
pub use pipeline::{EncodeMode, EncodedMessage, KeyProvider, Pipeline};

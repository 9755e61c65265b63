//! # Public-Key Encryption
//!
//! - [`keys`]: RSA key pairs and their portable PEM/JSON form
//! - [`rsa_codec`]: chunked RSA-OAEP encryption of UTF-8 text

pub mod keys;
pub mod rsa_codec;

pub use keys::{export_key_pair, import_key_pair, ExportedKeys, KeyPair, DEFAULT_KEY_BITS};
pub use rsa_codec::{decrypt, encrypt, max_chunk_len, EncryptedPayload, CHUNK_DELIMITER};

//! # Chunked RSA-OAEP Codec
//!
//! RSA with OAEP padding can only encrypt `key_bytes - 2 * hash_len - 2` bytes
//! per operation. Longer plaintexts are split into chunks of at most that size,
//! each chunk is encrypted on its own, base64-encoded, and the chunks are joined
//! with [`CHUNK_DELIMITER`]:
//!
//! ```text
//! base64(rsa(chunk_0)) | base64(rsa(chunk_1)) | ...
//! ```
//!
//! OAEP uses SHA-1 for both the label hash and MGF1, giving a 42-byte overhead.
//! A 2048-bit key therefore carries 214 plaintext bytes per chunk.

use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use std::fmt;

use crate::error::{Result, StegoError};

/// Separator between encoded chunks. Not part of the standard base64 alphabet.
pub const CHUNK_DELIMITER: char = '|';

/// Bytes of each RSA block consumed by OAEP padding.
pub fn oaep_overhead() -> usize {
    2 * <Sha1 as Digest>::output_size() + 2
}

/// Largest plaintext chunk that fits in one OAEP block for `key`.
pub fn max_chunk_len(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(oaep_overhead())
}

fn padding() -> Oaep {
    Oaep::new::<Sha1>()
}

/// Ordered base64-encoded ciphertext chunks.
///
/// [`Display`](fmt::Display) renders the joined wire form; [`EncryptedPayload::parse`]
/// splits it again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncryptedPayload {
    chunks: Vec<String>,
}

impl EncryptedPayload {
    /// Split a joined payload into its chunks. The empty string has no chunks.
    pub fn parse(joined: &str) -> Self {
        if joined.is_empty() {
            return Self::default();
        }
        Self {
            chunks: joined.split(CHUNK_DELIMITER).map(str::to_owned).collect(),
        }
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl fmt::Display for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chunk) in self.chunks.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", CHUNK_DELIMITER)?;
            }
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

/// Encrypt UTF-8 text for the holder of the matching private key.
///
/// # Errors
/// - [`StegoError::Encryption`] if the key is too small to hold any plaintext,
///   an RSA operation fails, or an encoded chunk would contain the delimiter
pub fn encrypt(plaintext: &str, key: &RsaPublicKey) -> Result<EncryptedPayload> {
    let max_chunk = max_chunk_len(key);
    if max_chunk == 0 {
        return Err(StegoError::Encryption(format!(
            "{}-byte key leaves no room after {} bytes of OAEP padding",
            key.size(),
            oaep_overhead()
        )));
    }

    let mut chunks = Vec::new();
    for piece in plaintext.as_bytes().chunks(max_chunk) {
        let ciphertext = key
            .encrypt(&mut OsRng, padding(), piece)
            .map_err(|e| StegoError::Encryption(e.to_string()))?;

        let encoded = general_purpose::STANDARD.encode(ciphertext);
        if encoded.contains(CHUNK_DELIMITER) {
            return Err(StegoError::Encryption(format!(
                "encoded chunk contains reserved delimiter '{}'",
                CHUNK_DELIMITER
            )));
        }
        chunks.push(encoded);
    }

    Ok(EncryptedPayload { chunks })
}

/// Decrypt every chunk with `key` and reassemble the original text.
///
/// # Errors
/// - [`StegoError::Decryption`] if a chunk is not valid base64, fails to decrypt
///   (wrong key or tampered ciphertext), or the result is not UTF-8
pub fn decrypt(payload: &EncryptedPayload, key: &RsaPrivateKey) -> Result<String> {
    let mut plaintext = Vec::new();

    for (index, chunk) in payload.chunks.iter().enumerate() {
        let ciphertext = general_purpose::STANDARD
            .decode(chunk)
            .map_err(|e| StegoError::Decryption(format!("chunk {}: {}", index, e)))?;
        let piece = key
            .decrypt(padding(), &ciphertext)
            .map_err(|e| StegoError::Decryption(format!("chunk {}: {}", index, e)))?;
        plaintext.extend_from_slice(&piece);
    }

    String::from_utf8(plaintext)
        .map_err(|e| StegoError::Decryption(format!("plaintext is not UTF-8: {}", e)))
}

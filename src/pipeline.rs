//! # Encode/Decode Pipeline
//!
//! Composes the encryption and steganography layers:
//!
//! ```text
//! encode: text → RSA-OAEP chunks → base64 → "a|b|c" → bitstream → carrier LSBs
//! decode: carrier LSBs → bitstream → "a|b|c" → base64 → RSA-OAEP → text
//! ```
//!
//! ## Key provisioning
//!
//! [`EncodeMode::Default`] encrypts with whatever pair the [`KeyProvider`] injected
//! at construction supplies. [`EncodeMode::Custom`] always generates a fresh pair
//! and hands it back as [`ExportedKeys`]: the keys are never embedded in the
//! image, so the caller has to deliver them to the recipient.
//!
//! Every call receives its inputs explicitly and returns a new image, so one
//! [`Pipeline`] can be shared between threads.

use image::{DynamicImage, GenericImageView};
use log::{debug, info};
use rsa::RsaPrivateKey;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::common::config::StegoConfig;
use crate::encryption::{self, export_key_pair, import_key_pair, EncryptedPayload, ExportedKeys, KeyPair};
use crate::error::{Result, StegoError};
use crate::processing::{self, TrailingBits};

/// Source of previously generated key pairs.
pub trait KeyStore: Send + Sync {
    fn load(&self) -> Result<KeyPair>;
}

/// Reads a key pair from a JSON key document on disk.
#[derive(Debug, Clone)]
pub struct JsonKeyStore {
    path: PathBuf,
}

impl JsonKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeyStore for JsonKeyStore {
    fn load(&self) -> Result<KeyPair> {
        let exported = ExportedKeys::load_from_file(&self.path)?;
        let pair = import_key_pair(&exported)?;
        info!(
            "Loaded {}-bit key pair from {}",
            pair.size_bits(),
            self.path.display()
        );
        Ok(pair)
    }
}

/// Where [`EncodeMode::Default`] gets its key pair from.
#[derive(Clone)]
pub enum KeyProvider {
    /// A new pair per call. Nothing retains it, so it is always exported.
    Ephemeral { bits: usize },
    /// One pair for the lifetime of the pipeline.
    Fixed(Arc<KeyPair>),
    /// Looked up on every call.
    FromStore(Arc<dyn KeyStore>),
}

impl std::fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ephemeral { bits } => f.debug_struct("Ephemeral").field("bits", bits).finish(),
            Self::Fixed(pair) => f.debug_tuple("Fixed").field(pair).finish(),
            Self::FromStore(_) => f.write_str("FromStore"),
        }
    }
}

impl KeyProvider {
    /// Returns the pair and whether it was freshly generated for this call.
    fn provision(&self) -> Result<(Arc<KeyPair>, bool)> {
        match self {
            Self::Ephemeral { bits } => {
                debug!("Generating ephemeral {}-bit key pair", bits);
                Ok((Arc::new(KeyPair::generate(*bits)?), true))
            }
            Self::Fixed(pair) => Ok((Arc::clone(pair), false)),
            Self::FromStore(store) => Ok((Arc::new(store.load()?), false)),
        }
    }
}

/// How the encoding key pair is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeMode {
    /// Use the pipeline's [`KeyProvider`].
    #[default]
    Default,
    /// Generate a fresh pair and return it to the caller.
    Custom,
}

impl FromStr for EncodeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown encryption method '{}'", other)),
        }
    }
}

/// Result of [`Pipeline::encode_message`].
#[derive(Debug)]
pub struct EncodedMessage {
    /// RGB stego image; must be stored losslessly.
    pub image: DynamicImage,
    /// Exported key pair, present whenever the pair was generated for this call.
    pub keys: Option<ExportedKeys>,
}

/// Encrypt-then-embed and extract-then-decrypt.
#[derive(Debug, Clone)]
pub struct Pipeline {
    provider: KeyProvider,
    custom_key_bits: usize,
    trailing: TrailingBits,
    max_carrier_pixels: u64,
}

impl Pipeline {
    pub fn new(provider: KeyProvider) -> Self {
        Self {
            provider,
            custom_key_bits: encryption::DEFAULT_KEY_BITS,
            trailing: TrailingBits::Drop,
            max_carrier_pixels: u64::MAX,
        }
    }

    /// Build a pipeline from configuration.
    ///
    /// With `server.default_keys_path` set the default pair comes from that JSON
    /// key file; otherwise one pair is generated now and kept for the pipeline's
    /// lifetime.
    pub fn from_config(config: &StegoConfig) -> Result<Self> {
        let provider = match &config.server.default_keys_path {
            Some(path) => KeyProvider::FromStore(Arc::new(JsonKeyStore::new(path.clone()))),
            None => {
                info!(
                    "Generating default {}-bit key pair",
                    config.crypto.key_size_bits
                );
                KeyProvider::Fixed(Arc::new(KeyPair::generate(config.crypto.key_size_bits)?))
            }
        };

        Ok(Self::from_provider_and_config(provider, config))
    }

    /// Apply configured limits to a pipeline using `provider`.
    pub fn from_provider_and_config(provider: KeyProvider, config: &StegoConfig) -> Self {
        let trailing = if config.stego.strict_trailing_bits {
            TrailingBits::Reject
        } else {
            TrailingBits::Drop
        };

        Self::new(provider)
            .with_custom_key_bits(config.crypto.key_size_bits)
            .with_trailing_bits(trailing)
            .with_max_carrier_pixels(config.stego.max_carrier_pixels)
    }

    /// Key size for pairs generated in [`EncodeMode::Custom`].
    pub fn with_custom_key_bits(mut self, bits: usize) -> Self {
        self.custom_key_bits = bits;
        self
    }

    pub fn with_trailing_bits(mut self, trailing: TrailingBits) -> Self {
        self.trailing = trailing;
        self
    }

    /// Largest carrier, in pixels, accepted by encode and decode.
    pub fn with_max_carrier_pixels(mut self, max: u64) -> Self {
        self.max_carrier_pixels = max;
        self
    }

    pub fn provider(&self) -> &KeyProvider {
        &self.provider
    }

    fn check_carrier_size(&self, image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_carrier_pixels {
            return Err(StegoError::UnsupportedFormat(format!(
                "{}x{} carrier exceeds the {} pixel limit",
                width, height, self.max_carrier_pixels
            )));
        }
        Ok(())
    }

    /// Encrypt `text` and hide the result in `image`.
    ///
    /// # Errors
    /// Any key provisioning, encryption, or embedding error; on error no image is
    /// produced and no keys are returned.
    pub fn encode_message(
        &self,
        image: &DynamicImage,
        text: &str,
        mode: EncodeMode,
    ) -> Result<EncodedMessage> {
        self.check_carrier_size(image)?;

        let (pair, fresh) = match mode {
            EncodeMode::Default => self.provider.provision()?,
            EncodeMode::Custom => (Arc::new(KeyPair::generate(self.custom_key_bits)?), true),
        };

        let payload = encryption::encrypt(text, pair.public_key())?;
        let stego = processing::embed(image, payload.to_string().as_bytes())?;

        let keys = if fresh {
            Some(export_key_pair(&pair)?)
        } else {
            None
        };

        Ok(EncodedMessage { image: stego, keys })
    }

    /// Extract and decrypt a message with an explicit private key.
    pub fn decode_message(&self, image: &DynamicImage, private_key: &RsaPrivateKey) -> Result<String> {
        let payload = self.extract_payload(image)?;
        encryption::decrypt(&payload, private_key)
    }

    /// Extract and decrypt a message encoded in [`EncodeMode::Default`].
    ///
    /// # Errors
    /// - [`StegoError::Decryption`] with an [`KeyProvider::Ephemeral`] provider,
    ///   which holds no key that could have been used for encoding
    pub fn decode_with_provider(&self, image: &DynamicImage) -> Result<String> {
        let pair = match &self.provider {
            KeyProvider::Ephemeral { .. } => {
                return Err(StegoError::Decryption(
                    "ephemeral key provider holds no private key; supply the exported keys"
                        .to_string(),
                ))
            }
            provider => provider.provision()?.0,
        };
        self.decode_message(image, pair.private_key())
    }

    /// Largest UTF-8 plaintext, in bytes, that fits in `image` when encrypted
    /// with a key of `key_bits`.
    pub fn max_message_bytes(image: &DynamicImage, key_bits: usize) -> Result<usize> {
        let capacity = processing::max_payload_bytes(image)?;
        let key_bytes = key_bits / 8;
        let chunk_plaintext = key_bytes.saturating_sub(encryption::rsa_codec::oaep_overhead());
        // base64 of one RSA block, plus one delimiter between chunks
        let chunk_encoded = 4 * key_bytes.div_ceil(3);
        let chunks = (capacity + 1) / (chunk_encoded + 1);
        Ok(chunks * chunk_plaintext)
    }

    fn extract_payload(&self, image: &DynamicImage) -> Result<EncryptedPayload> {
        self.check_carrier_size(image)?;

        let bytes = processing::extract_with(image, self.trailing)?;
        let joined = String::from_utf8(bytes).map_err(|e| {
            StegoError::CorruptedData(format!("hidden payload is not text: {}", e))
        })?;
        Ok(EncryptedPayload::parse(&joined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::test_keys::{primary, secondary};
    use image::{Rgb, RgbImage};

    fn carrier(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7) as u8, (y * 13) as u8, (x ^ y) as u8])
        }))
    }

    fn fixed_pipeline() -> Pipeline {
        Pipeline::new(KeyProvider::Fixed(Arc::new(primary().clone())))
    }

    #[test]
    fn test_default_mode_round_trip() {
        let pipeline = fixed_pipeline();
        let encoded = pipeline
            .encode_message(&carrier(64, 64), "hello world", EncodeMode::Default)
            .unwrap();

        assert!(encoded.keys.is_none());
        assert_eq!(
            pipeline.decode_with_provider(&encoded.image).unwrap(),
            "hello world"
        );
        assert_eq!(
            pipeline
                .decode_message(&encoded.image, primary().private_key())
                .unwrap(),
            "hello world"
        );
    }

    #[test]
    fn test_custom_mode_returns_usable_keys() {
        let pipeline = fixed_pipeline().with_custom_key_bits(1024);
        let encoded = pipeline
            .encode_message(&carrier(64, 64), "only for you", EncodeMode::Custom)
            .unwrap();

        let keys = encoded.keys.expect("custom mode exports keys");
        let pair = import_key_pair(&keys).unwrap();
        assert_eq!(
            pipeline.decode_message(&encoded.image, pair.private_key()).unwrap(),
            "only for you"
        );
        assert!(matches!(
            pipeline.decode_with_provider(&encoded.image),
            Err(StegoError::Decryption(_))
        ));
    }

    #[test]
    fn test_ephemeral_provider_exports_keys() {
        let pipeline = Pipeline::new(KeyProvider::Ephemeral { bits: 1024 });
        let encoded = pipeline
            .encode_message(&carrier(64, 64), "short lived", EncodeMode::Default)
            .unwrap();

        let pair = import_key_pair(&encoded.keys.unwrap()).unwrap();
        assert_eq!(
            pipeline.decode_message(&encoded.image, pair.private_key()).unwrap(),
            "short lived"
        );
        assert!(matches!(
            pipeline.decode_with_provider(&encoded.image),
            Err(StegoError::Decryption(_))
        ));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let pipeline = fixed_pipeline();
        let encoded = pipeline
            .encode_message(&carrier(64, 64), "secret", EncodeMode::Default)
            .unwrap();

        assert!(matches!(
            pipeline.decode_message(&encoded.image, secondary().private_key()),
            Err(StegoError::Decryption(_))
        ));
    }

    #[test]
    fn test_small_carrier_fails_before_producing_output() {
        // One 1024-bit chunk is 172 base64 chars: 32 + 1376 bits > 16*16*3
        let err = fixed_pipeline()
            .encode_message(&carrier(16, 16), "hi", EncodeMode::Default)
            .unwrap_err();
        assert!(matches!(err, StegoError::CapacityExceeded { .. }));
    }

    #[test]
    fn test_carrier_pixel_limit() {
        let pipeline = fixed_pipeline().with_max_carrier_pixels(100);
        assert!(matches!(
            pipeline.encode_message(&carrier(11, 10), "x", EncodeMode::Default),
            Err(StegoError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_plain_text_payload_is_not_decryptable() {
        let stego = processing::embed(&carrier(32, 32), "not|ciphertext".as_bytes()).unwrap();
        assert!(matches!(
            fixed_pipeline().decode_with_provider(&stego),
            Err(StegoError::Decryption(_))
        ));
    }

    #[test]
    fn test_binary_payload_is_corrupted_data() {
        let stego = processing::embed(&carrier(32, 32), &[0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            fixed_pipeline().decode_with_provider(&stego),
            Err(StegoError::CorruptedData(_))
        ));
    }

    #[test]
    fn test_max_message_bytes_is_exact() {
        // 1024-bit key: 172 encoded chars per chunk, 86 plaintext bytes per chunk
        let image = carrier(64, 64);
        let max = Pipeline::max_message_bytes(&image, 1024).unwrap();
        assert_eq!(max, 86 * 8);

        let pipeline = fixed_pipeline();
        let text = "m".repeat(max);
        let encoded = pipeline
            .encode_message(&image, &text, EncodeMode::Default)
            .unwrap();
        assert_eq!(pipeline.decode_with_provider(&encoded.image).unwrap(), text);

        assert!(matches!(
            pipeline.encode_message(&image, &"m".repeat(max + 1), EncodeMode::Default),
            Err(StegoError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_encode_mode_parsing() {
        assert_eq!("default".parse::<EncodeMode>().unwrap(), EncodeMode::Default);
        assert_eq!(" Custom ".parse::<EncodeMode>().unwrap(), EncodeMode::Custom);
        assert!("rsa".parse::<EncodeMode>().is_err());
    }
}

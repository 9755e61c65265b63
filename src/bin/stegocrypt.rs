//! # stegocrypt CLI
//!
//! Encrypts a message with RSA and hides it in an image, or recovers it.
//!
//! ## Usage
//!
//! ```bash
//! # Create a key pair to share with the recipient
//! cargo run --bin stegocrypt -- keygen --out keys.json
//!
//! # Hide a message using that key pair
//! cargo run --bin stegocrypt -- encode --image cover.jpg --text "meet at noon" \
//!   --keys keys.json --out stego.png
//!
//! # Hide a message under a freshly generated key pair
//! cargo run --bin stegocrypt -- encode --image cover.png --text-file note.txt \
//!   --method custom --keys-out note_keys.json --out stego.png
//!
//! # Recover it
//! cargo run --bin stegocrypt -- decode --image stego.png --keys keys.json
//!
//! # How much fits?
//! cargo run --bin stegocrypt -- capacity --image cover.png
//! ```
//!
//! The output image is always written as PNG; lossy formats destroy the hidden bits.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use image::{DynamicImage, ImageFormat};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stegocrypt::common::config::StegoConfig;
use stegocrypt::encryption::{export_key_pair, import_key_pair, ExportedKeys, KeyPair};
use stegocrypt::pipeline::JsonKeyStore;
use stegocrypt::processing::{self, pixels};
use stegocrypt::utils::init_logger;
use stegocrypt::{EncodeMode, KeyProvider, Pipeline};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a configuration file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an RSA key pair and write it as a JSON key file
    Keygen {
        /// Where to write the key file
        #[arg(short, long)]
        out: PathBuf,

        /// Key size in bits (defaults to crypto.key_size_bits)
        #[arg(long)]
        bits: Option<usize>,
    },

    /// Encrypt a message and hide it in an image
    Encode {
        /// Carrier image (PNG or JPEG)
        #[arg(short, long)]
        image: PathBuf,

        /// Message to hide
        #[arg(short, long, conflicts_with = "text_file", required_unless_present = "text_file")]
        text: Option<String>,

        /// Read the message from a UTF-8 file
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// "default" uses --keys or the configured key file; "custom" generates a new pair
        #[arg(short, long, default_value = "default")]
        method: EncodeMode,

        /// Key file to encrypt with in default mode
        #[arg(short, long)]
        keys: Option<PathBuf>,

        /// Where to write newly generated keys
        #[arg(long)]
        keys_out: Option<PathBuf>,

        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Extract and decrypt a hidden message
    Decode {
        /// Stego image
        #[arg(short, long)]
        image: PathBuf,

        /// Key file holding the private key (defaults to server.default_keys_path)
        #[arg(short, long)]
        keys: Option<PathBuf>,
    },

    /// Show how much an image can carry
    Capacity {
        #[arg(short, long)]
        image: PathBuf,
    },
}

fn load_carrier(path: &Path) -> Result<DynamicImage> {
    let image = image::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(pixels::normalize_to_rgb(image))
}

fn keygen(config: &StegoConfig, out: &Path, bits: Option<usize>) -> Result<()> {
    let bits = bits.unwrap_or(config.crypto.key_size_bits);
    info!("Generating {}-bit key pair", bits);

    let pair = KeyPair::generate(bits)?;
    export_key_pair(&pair)?.save_to_file(out)?;

    println!("Key pair written to {}", out.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn encode(
    config: &StegoConfig,
    image: &Path,
    text: Option<String>,
    text_file: Option<PathBuf>,
    method: EncodeMode,
    keys: Option<PathBuf>,
    keys_out: Option<PathBuf>,
    out: &Path,
) -> Result<()> {
    let text = match (text, text_file) {
        (Some(text), _) => text,
        (None, Some(path)) => {
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, None) => bail!("either --text or --text-file is required"),
    };
    if text.is_empty() {
        bail!("no text provided to hide");
    }

    let provider = match keys.or_else(|| config.server.default_keys_path.clone()) {
        Some(path) => KeyProvider::FromStore(Arc::new(JsonKeyStore::new(path))),
        None => KeyProvider::Ephemeral {
            bits: config.crypto.key_size_bits,
        },
    };

    let generates_keys =
        method == EncodeMode::Custom || matches!(provider, KeyProvider::Ephemeral { .. });
    if generates_keys && keys_out.is_none() {
        bail!("--keys-out is required when a new key pair is generated");
    }

    let carrier = load_carrier(image)?;
    let pipeline = Pipeline::from_provider_and_config(provider, config);
    let encoded = pipeline.encode_message(&carrier, &text, method)?;

    if out.extension().and_then(|ext| ext.to_str()) != Some("png") {
        warn!("{} does not end in .png; writing PNG data anyway", out.display());
    }
    encoded
        .image
        .save_with_format(out, ImageFormat::Png)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("Stego image written to {}", out.display());

    if let (Some(exported), Some(path)) = (encoded.keys, keys_out) {
        exported.save_to_file(&path)?;
        println!(
            "Keys written to {}; deliver this file to the recipient separately",
            path.display()
        );
    }

    Ok(())
}

fn decode(config: &StegoConfig, image: &Path, keys: Option<PathBuf>) -> Result<()> {
    let Some(path) = keys.or_else(|| config.server.default_keys_path.clone()) else {
        bail!("--keys is required unless server.default_keys_path is configured");
    };

    let pair = import_key_pair(&ExportedKeys::load_from_file(&path)?)?;
    let pipeline = Pipeline::from_provider_and_config(KeyProvider::Fixed(Arc::new(pair)), config);

    let text = pipeline.decode_with_provider(&load_carrier(image)?)?;
    println!("{}", text);
    Ok(())
}

fn capacity(config: &StegoConfig, image: &Path) -> Result<()> {
    let carrier = load_carrier(image)?;
    let bits = processing::capacity_bits(&carrier)?;
    let raw = processing::max_payload_bytes(&carrier)?;
    let message = Pipeline::max_message_bytes(&carrier, config.crypto.key_size_bits)?;

    println!("Capacity:          {} bits", bits);
    println!("Raw payload:       {} bytes", raw);
    println!(
        "Encrypted message: {} bytes with a {}-bit key",
        message, config.crypto.key_size_bits
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = StegoConfig::load_or_default(args.config.as_deref())?;
    init_logger(config.logging.level_filter()?);

    match args.command {
        Command::Keygen { out, bits } => keygen(&config, &out, bits),
        Command::Encode {
            image,
            text,
            text_file,
            method,
            keys,
            keys_out,
            out,
        } => encode(&config, &image, text, text_file, method, keys, keys_out, &out),
        Command::Decode { image, keys } => decode(&config, &image, keys),
        Command::Capacity { image } => capacity(&config, &image),
    }
}

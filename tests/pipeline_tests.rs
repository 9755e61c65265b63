use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::sync::{Arc, OnceLock};
use std::thread;

use stegocrypt::common::config::StegoConfig;
use stegocrypt::encryption::{export_key_pair, import_key_pair, ExportedKeys, KeyPair};
use stegocrypt::pipeline::JsonKeyStore;
use stegocrypt::processing::{self, pixels, TrailingBits};
use stegocrypt::{EncodeMode, KeyProvider, Pipeline, StegoError};

fn test_pair() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate(1024).unwrap())
}

fn photo_like(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    }))
}

#[test]
fn test_stego_png_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stego.png");

    let pipeline = Pipeline::new(KeyProvider::Fixed(Arc::new(test_pair().clone())));
    let encoded = pipeline
        .encode_message(&photo_like(120, 80), "the eagle has landed", EncodeMode::Default)
        .unwrap();
    encoded
        .image
        .save_with_format(&out, ImageFormat::Png)
        .unwrap();

    let reloaded = pixels::normalize_to_rgb(image::open(&out).unwrap());
    assert_eq!(
        pipeline.decode_with_provider(&reloaded).unwrap(),
        "the eagle has landed"
    );
}

#[test]
fn test_json_key_store_provider() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("default_keys.json");
    export_key_pair(test_pair())
        .unwrap()
        .save_to_file(&key_path)
        .unwrap();

    let pipeline = Pipeline::new(KeyProvider::FromStore(Arc::new(JsonKeyStore::new(
        &key_path,
    ))));
    let encoded = pipeline
        .encode_message(&photo_like(64, 64), "from the store", EncodeMode::Default)
        .unwrap();
    assert!(encoded.keys.is_none());

    let stored = import_key_pair(&ExportedKeys::load_from_file(&key_path).unwrap()).unwrap();
    assert_eq!(
        pipeline
            .decode_message(&encoded.image, stored.private_key())
            .unwrap(),
        "from the store"
    );
}

#[test]
fn test_missing_key_store_file() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(KeyProvider::FromStore(Arc::new(JsonKeyStore::new(
        dir.path().join("absent.json"),
    ))));

    assert!(matches!(
        pipeline.encode_message(&photo_like(64, 64), "x", EncodeMode::Default),
        Err(StegoError::KeyStore(_))
    ));
}

#[test]
fn test_pipeline_from_config_uses_key_file() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("keys.json");
    export_key_pair(test_pair())
        .unwrap()
        .save_to_file(&key_path)
        .unwrap();

    let config_path = dir.path().join("stegocrypt.toml");
    std::fs::write(
        &config_path,
        format!(
            "[crypto]\nkey_size_bits = 1024\n\n[server]\ndefault_keys_path = {:?}\n",
            key_path.to_str().unwrap()
        ),
    )
    .unwrap();

    let config = StegoConfig::from_file(config_path.to_str().unwrap()).unwrap();
    let pipeline = Pipeline::from_config(&config).unwrap();

    let encoded = pipeline
        .encode_message(&photo_like(64, 64), "configured", EncodeMode::Default)
        .unwrap();
    assert_eq!(
        pipeline
            .decode_message(&encoded.image, test_pair().private_key())
            .unwrap(),
        "configured"
    );
}

#[test]
fn test_concurrent_encodes_share_one_pipeline() {
    let pipeline = Arc::new(Pipeline::new(KeyProvider::Fixed(Arc::new(
        test_pair().clone(),
    ))));
    let carrier = Arc::new(photo_like(64, 64));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            let carrier = Arc::clone(&carrier);
            thread::spawn(move || {
                let text = format!("message number {}", i);
                let encoded = pipeline
                    .encode_message(&carrier, &text, EncodeMode::Default)
                    .unwrap();
                (text, encoded.image)
            })
        })
        .collect();

    for handle in handles {
        let (text, image) = handle.join().unwrap();
        assert_eq!(pipeline.decode_with_provider(&image).unwrap(), text);
    }

    // The shared carrier is never written to
    assert_eq!(
        pixels::flatten(&carrier).unwrap(),
        pixels::flatten(&photo_like(64, 64)).unwrap()
    );
}

#[test]
fn test_raw_payload_round_trip_and_strict_extraction() {
    let carrier = photo_like(40, 40);
    let payload: Vec<u8> = (0..=255u8).collect();

    let stego = processing::embed(&carrier, &payload).unwrap();
    assert_eq!(processing::extract(&stego).unwrap(), payload);
    assert_eq!(
        processing::extract_with(&stego, TrailingBits::Reject).unwrap(),
        payload
    );
}

#[test]
fn test_non_stego_image_fails_to_decode() {
    let pipeline = Pipeline::new(KeyProvider::Fixed(Arc::new(test_pair().clone())));
    let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([255, 255, 255])));

    assert!(matches!(
        pipeline.decode_with_provider(&white),
        Err(StegoError::IncompleteData { .. })
    ));
}

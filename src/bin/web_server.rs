//! Web server for the steganography API
//!
//! ## Routes
//!
//! - `POST /api/encode`: multipart `image`, `text`, optional `encryption_method`
//!   (`default` | `custom`). Returns the stego PNG as base64 and, for custom
//!   keys, the key file contents to hand to the recipient.
//! - `POST /api/decode`: multipart `image`, optional `keyfile` (JSON key file).
//!   Without a key file the server's default keys are used.
//! - `GET /api/health`
//!
//! ```bash
//! cargo run --bin web_server -- --config config/stegocrypt.toml
//! ```

use axum::{
    extract::{multipart::Multipart, DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use clap::Parser;
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use stegocrypt::common::config::StegoConfig;
use stegocrypt::encryption::{import_key_pair, ExportedKeys};
use stegocrypt::processing::{encode_png, is_supported_upload, load_rgb_from_memory};
use stegocrypt::utils::init_logger;
use stegocrypt::{EncodeMode, Pipeline, StegoError};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Serialize)]
struct EncodeResponse {
    success: bool,
    message: String,
    stego_image_base64: String,
    stego_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    keys: Option<ExportedKeys>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keys_filename: Option<String>,
}

#[derive(Serialize)]
struct DecodeResponse {
    success: bool,
    text: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

struct AppState {
    pipeline: Pipeline,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Input problems are the client's fault; anything else is ours.
fn stego_error(err: StegoError) -> ApiError {
    let status = match &err {
        StegoError::UnsupportedFormat(_)
        | StegoError::CapacityExceeded { .. }
        | StegoError::PayloadTooLarge { .. }
        | StegoError::IncompleteData { .. }
        | StegoError::CorruptedData(_)
        | StegoError::Decryption(_)
        | StegoError::InvalidKeyFormat(_)
        | StegoError::Image(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StegoError::KeyGeneration(_) | StegoError::Encryption(_) | StegoError::KeyStore(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, err.to_string())
}

/// Fields accepted by both endpoints.
#[derive(Default)]
struct Upload {
    image: Option<Vec<u8>>,
    filename: Option<String>,
    text: Option<String>,
    encryption_method: Option<String>,
    keyfile: Option<Vec<u8>>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut upload = Upload::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                upload.filename = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    api_error(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read image data: {}", e),
                    )
                })?;
                upload.image = Some(data.to_vec());
            }
            "keyfile" => {
                let data = field.bytes().await.map_err(|e| {
                    api_error(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read key file: {}", e),
                    )
                })?;
                upload.keyfile = Some(data.to_vec());
            }
            "text" | "encryption_method" => {
                let value = field.text().await.map_err(|e| {
                    api_error(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read field {}: {}", name, e),
                    )
                })?;
                if name == "text" {
                    upload.text = Some(value);
                } else {
                    upload.encryption_method = Some(value);
                }
            }
            other => warn!("Ignoring unexpected multipart field '{}'", other),
        }
    }

    Ok(upload)
}

fn require_image(upload: &mut Upload) -> Result<Vec<u8>, ApiError> {
    let image = upload
        .image
        .take()
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No image selected"))?;

    if !is_supported_upload(&image) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Allowed image types are png, jpg and jpeg",
        ));
    }
    Ok(image)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = StegoConfig::load_or_default(args.config.as_deref())?;
    init_logger(config.logging.level_filter()?);

    info!("🚀 Initializing web server...");

    let startup_config = config.clone();
    let pipeline =
        tokio::task::spawn_blocking(move || Pipeline::from_config(&startup_config)).await??;
    let state = Arc::new(AppState { pipeline });

    let app = Router::new()
        .route("/api/encode", post(encode_handler))
        .route("/api/decode", post(decode_handler))
        .route("/api/health", get(health_check))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = config.server.address.as_str();
    info!("🌐 Web server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "stegocrypt",
    }))
}

async fn encode_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = read_upload(multipart).await?;
    let image = require_image(&mut upload)?;

    let text = upload
        .text
        .take()
        .filter(|text| !text.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No text provided to hide"))?;

    let mode = match upload.encryption_method.as_deref() {
        Some(method) => method
            .parse::<EncodeMode>()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?,
        None => EncodeMode::Default,
    };

    let request_id = Uuid::new_v4().simple().to_string();
    info!(
        "📤 [{}] Encoding {} chars into {} ({} bytes, {:?} keys)",
        request_id,
        text.chars().count(),
        upload.filename.as_deref().unwrap_or("upload"),
        image.len(),
        mode
    );

    let worker_state = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        let carrier = load_rgb_from_memory(&image)?;
        let encoded = worker_state.pipeline.encode_message(&carrier, &text, mode)?;
        let png = encode_png(&encoded.image)?;
        Ok::<_, StegoError>((png, encoded.keys))
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let (png, keys) = result.map_err(|e| {
        error!("❌ [{}] Error in encryption process: {}", request_id, e);
        stego_error(e)
    })?;

    info!("✅ [{}] Stego image ready ({} bytes)", request_id, png.len());

    let keys_filename = keys
        .as_ref()
        .map(|_| format!("stegocrypt_keys_{}.json", request_id));

    Ok((
        StatusCode::OK,
        Json(EncodeResponse {
            success: true,
            message: "Message hidden successfully".to_string(),
            stego_image_base64: general_purpose::STANDARD.encode(&png),
            stego_filename: format!("stego_image_{}.png", request_id),
            keys,
            keys_filename,
        }),
    ))
}

async fn decode_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = read_upload(multipart).await?;
    let image = require_image(&mut upload)?;

    let keys = match upload.keyfile.take() {
        Some(bytes) => {
            let json = String::from_utf8(bytes).map_err(|_| {
                api_error(
                    StatusCode::BAD_REQUEST,
                    "Invalid key file format. Must be a JSON file",
                )
            })?;
            Some(ExportedKeys::from_json(&json).map_err(stego_error)?)
        }
        None => None,
    };

    let request_id = Uuid::new_v4().simple().to_string();
    info!(
        "📥 [{}] Decoding {} with {} keys",
        request_id,
        upload.filename.as_deref().unwrap_or("upload"),
        if keys.is_some() { "uploaded" } else { "default" }
    );

    let worker_state = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        let carrier = load_rgb_from_memory(&image)?;
        match keys {
            Some(keys) => {
                let pair = import_key_pair(&keys)?;
                worker_state
                    .pipeline
                    .decode_message(&carrier, pair.private_key())
            }
            None => worker_state.pipeline.decode_with_provider(&carrier),
        }
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let text = result.map_err(|e| {
        error!("❌ [{}] Error in decryption process: {}", request_id, e);
        stego_error(e)
    })?;

    info!("✅ [{}] Message recovered", request_id);

    Ok((
        StatusCode::OK,
        Json(DecodeResponse {
            success: true,
            text,
        }),
    ))
}

pub mod config;
pub mod error;
pub mod validation;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tts_core::{wav, AudioCache, LoadPhase, VoiceEngine};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::validation::validate_tts_request;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<VoiceEngine>,
    pub cache: Arc<AudioCache>,
    pub model_name: Arc<str>,
}

impl AppState {
    pub fn new(engine: VoiceEngine, cache_dir: impl Into<PathBuf>, model_name: &str) -> Self {
        let cache = AudioCache::new(cache_dir, engine.style());
        Self {
            engine: Arc::new(engine),
            cache: Arc::new(cache),
            model_name: Arc::from(model_name),
        }
    }
}

#[derive(Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    text: Option<String>,
    /// `null` counts as false.
    #[serde(default)]
    skip_cache: Option<bool>,
    /// Accepted for client compatibility; the voice style is fixed server-side.
    #[serde(default)]
    style: Option<StyleHint>,
}

/// Clients send a style name, but anything else is tolerated since it is only logged.
#[derive(Deserialize)]
#[serde(untagged)]
enum StyleHint {
    Name(String),
    Other(serde::de::IgnoredAny),
}

impl StyleHint {
    fn label(hint: Option<&StyleHint>) -> &str {
        match hint {
            Some(StyleHint::Name(name)) => name,
            Some(StyleHint::Other(_)) => "unrecognized",
            None => "default",
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
        .allow_credentials(false);

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .flatten()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        if config.cors_allowed_origins.is_some() {
            warn!("CORS_ALLOWED_ORIGINS has no valid origins, falling back to permissive CORS");
        }
        base.allow_origin(tower_http::cors::Any)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        base.allow_origin(tower_http::cors::AllowOrigin::list(origins))
    }
}

async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let value = HeaderValue::from_str(&request_id).ok();
    if let Some(v) = value.clone() {
        request.headers_mut().insert("x-request-id", v);
    }
    let mut response = next.run(request).await;
    if let Some(v) = value {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/tts", post(tts_endpoint));

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .into_inner(),
        )
        .with_state(state)
}

/// Load the model in the background so `/health` can report `loading` meanwhile.
pub fn spawn_preload(engine: Arc<VoiceEngine>) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        if let Err(e) = engine.ensure_loaded() {
            warn!("Model load at startup failed: {e}. Will retry on first request.");
        }
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, last_error) = if state.engine.is_ready() {
        ("running", None)
    } else {
        match state.engine.phase() {
            LoadPhase::Failed(msg) => ("loading", Some(msg)),
            _ => ("loading", None),
        }
    };
    Json(HealthResponse {
        status,
        model: state.model_name.to_string(),
        last_error,
    })
}

pub async fn tts_endpoint(
    State(state): State<AppState>,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let text = validate_tts_request(req.text.as_deref())?.to_string();
    let skip_cache = req.skip_cache.unwrap_or(false);
    debug!(
        style = StyleHint::label(req.style.as_ref()),
        skip_cache,
        "TTS request received"
    );

    ensure_model_ready(&state).await?;

    // The directory is created by `persist`, on the blocking pool.
    let cache_path = state.cache.path_for(&text);

    if !skip_cache {
        match tokio::fs::read(&cache_path).await {
            Ok(bytes) => {
                info!("Serving cached audio for: {}...", preview(&text));
                return Ok(wav_response(bytes));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Could not read cache entry {}: {e}, regenerating",
                cache_path.display()
            ),
        }
    }

    let persist_to = (!skip_cache).then_some(cache_path);
    let engine = state.engine.clone();
    let cache = state.cache.clone();

    let wav_bytes = tokio::task::spawn_blocking(move || {
        let audio = engine.synthesize(&text)?;
        let bytes = wav::encode_buffer(&audio)?;
        if let Some(path) = persist_to {
            cache.persist(&path, &bytes)?;
            debug!("Cached audio at {}", path.display());
        }
        Ok::<_, tts_core::TtsError>(bytes)
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("Task join error: {e}")))??;

    Ok(wav_response(wav_bytes))
}

async fn ensure_model_ready(state: &AppState) -> Result<(), ApiError> {
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || engine.ensure_loaded().map(|_| ()))
        .await
        .map_err(|e| ApiError::InternalError(format!("Task join error: {e}")))??;
    Ok(())
}

fn wav_response(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response()
}

fn preview(text: &str) -> String {
    text.chars().take(20).collect()
}

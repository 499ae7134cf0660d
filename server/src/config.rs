// Configuration for the server, read from the environment

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;
use tts_core::{ModelSpec, Precision, DEFAULT_MODEL_ID};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cache_dir: PathBuf,
    pub backend_url: String,
    pub model: ModelSpec,
    pub model_display_name: String,
    pub model_load_timeout_secs: u64,
    pub preload_model: bool,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            cache_dir: PathBuf::from("cache"),
            backend_url: "http://127.0.0.1:5002".to_string(),
            model: ModelSpec::default(),
            model_display_name: "Qwen3-TTS-VoiceDesign".to_string(),
            model_load_timeout_secs: 1800,
            preload_model: true,
            cors_allowed_origins: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port = env_parse("PORT").unwrap_or(defaults.port);
        let cache_dir = std::env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);
        let backend_url = std::env::var("MODEL_BACKEND_URL").unwrap_or(defaults.backend_url);

        let dtype = match std::env::var("MODEL_DTYPE") {
            Ok(v) => v.parse::<Precision>().unwrap_or_else(|e| {
                warn!("{e}, falling back to float32");
                Precision::Float32
            }),
            Err(_) => Precision::Float32,
        };
        let model = ModelSpec {
            model_id: std::env::var("MODEL_ID").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string()),
            device_map: std::env::var("MODEL_DEVICE").unwrap_or_else(|_| "auto".to_string()),
            dtype,
            num_threads: env_parse("MODEL_NUM_THREADS").or(defaults.model.num_threads),
        };

        let model_display_name =
            std::env::var("MODEL_DISPLAY_NAME").unwrap_or(defaults.model_display_name);
        let model_load_timeout_secs =
            env_parse("MODEL_LOAD_TIMEOUT_SECS").unwrap_or(defaults.model_load_timeout_secs);
        let preload_model = env_parse("PRELOAD_MODEL").unwrap_or(defaults.preload_model);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });

        Self {
            host,
            port,
            cache_dir,
            backend_url,
            model,
            model_display_name,
            model_load_timeout_secs,
            preload_model,
            cors_allowed_origins,
        }
    }

    pub fn model_load_timeout(&self) -> Duration {
        Duration::from_secs(self.model_load_timeout_secs)
    }
}

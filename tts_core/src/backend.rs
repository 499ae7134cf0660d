//! HTTP client for a model-hosting inference process.
//!
//! The process keeps the pretrained weights resident and exposes
//! `POST /load` and `POST /generate` (WAV bytes back). The blocking client
//! is built inside [`ModelLoader::load`], so it never lives on an async
//! executor thread.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AudioBuffer, ModelLoader, ModelSpec, VoiceDesignModel};
use crate::style::StyleConfig;
use crate::wav;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to connect to inference backend: {0}")]
    ConnectionFailed(String),

    #[error("Inference backend returned {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid response from inference backend: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadRequest {
    pub model_id: String,
    pub device_map: String,
    pub dtype: String,
    pub num_threads: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    pub language: String,
    pub instruct: String,
    pub seed: u64,
}

pub struct HttpModelLoader {
    base_url: String,
    spec: ModelSpec,
    load_timeout: Duration,
}

impl HttpModelLoader {
    pub fn new(base_url: impl Into<String>, spec: ModelSpec) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spec,
            load_timeout: Duration::from_secs(30 * 60),
        }
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ModelLoader for HttpModelLoader {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn load(&self) -> anyhow::Result<Box<dyn VoiceDesignModel>> {
        // Inference has no deadline; only the load call is bounded.
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .context("Failed to build HTTP client")?;

        let body = LoadRequest {
            model_id: self.spec.model_id.clone(),
            device_map: self.spec.device_map.clone(),
            dtype: self.spec.dtype.as_str().to_string(),
            num_threads: self.spec.num_threads,
        };

        let response = client
            .post(format!("{}/load", self.base_url))
            .timeout(self.load_timeout)
            .json(&body)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;
        check_status(response)?;

        Ok(Box::new(HttpVoiceDesignModel {
            base_url: self.base_url.clone(),
            client,
        }))
    }
}

pub struct HttpVoiceDesignModel {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl VoiceDesignModel for HttpVoiceDesignModel {
    fn generate(&mut self, text: &str, style: &StyleConfig) -> anyhow::Result<AudioBuffer> {
        let body = GenerateRequest {
            text: text.to_string(),
            language: style.language.clone(),
            instruct: style.instruct.clone(),
            seed: style.seed,
        };

        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&body)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;
        let bytes = check_status(response)?
            .bytes()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        let audio = wav::decode_wav(&bytes)
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        if audio.samples.is_empty() {
            return Err(BackendError::InvalidResponse("empty audio".to_string()).into());
        }
        Ok(audio)
    }
}

fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .ok()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    Err(BackendError::RequestFailed {
        status: status.as_u16(),
        message,
    })
}

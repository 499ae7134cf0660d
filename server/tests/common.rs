//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use server::{build_router, AppState};
use tempfile::TempDir;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tts_core::{AudioBuffer, ModelLoader, ModelSpec, StyleConfig, VoiceDesignModel, VoiceEngine};

pub const SAMPLE_RATE: u32 = 24_000;

/// Counters shared between the mock model and the test body.
#[derive(Default)]
pub struct Counters {
    pub loads: AtomicUsize,
    pub generations: AtomicUsize,
    pub in_gate: AtomicUsize,
    pub max_in_gate: AtomicUsize,
    pub fail_loads: AtomicUsize,
}

impl Counters {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }
}

struct MockModel {
    counters: Arc<Counters>,
    work: Duration,
}

impl VoiceDesignModel for MockModel {
    fn generate(&mut self, text: &str, style: &StyleConfig) -> anyhow::Result<AudioBuffer> {
        let now = self.counters.in_gate.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_gate.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.work);
        self.counters.in_gate.fetch_sub(1, Ordering::SeqCst);
        self.counters.generations.fetch_add(1, Ordering::SeqCst);

        if text.contains("explode") {
            anyhow::bail!("CUDA out of memory");
        }
        let level = (style.seed % 100) as f32 / 100.0;
        Ok(AudioBuffer {
            samples: vec![level; text.chars().count() * 100],
            sample_rate: SAMPLE_RATE,
        })
    }
}

struct MockLoader {
    spec: ModelSpec,
    counters: Arc<Counters>,
    work: Duration,
}

impl ModelLoader for MockLoader {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn load(&self) -> anyhow::Result<Box<dyn VoiceDesignModel>> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        let remaining = self.counters.fail_loads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.counters.fail_loads.store(remaining - 1, Ordering::SeqCst);
            anyhow::bail!("checkpoint download failed");
        }
        Ok(Box::new(MockModel {
            counters: self.counters.clone(),
            work: self.work,
        }))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub counters: Arc<Counters>,
    pub cache_dir: TempDir,
}

/// Create a test app instance backed by a mock model and a temp cache dir
pub fn create_test_app() -> TestApp {
    create_test_app_with(Duration::ZERO, 0)
}

pub fn create_test_app_with(work: Duration, fail_loads: usize) -> TestApp {
    let counters = Arc::new(Counters::default());
    counters.fail_loads.store(fail_loads, Ordering::SeqCst);

    let loader = MockLoader {
        spec: ModelSpec::default(),
        counters: counters.clone(),
        work,
    };
    let engine = VoiceEngine::new(Box::new(loader), StyleConfig::default());
    let cache_dir = tempfile::tempdir().expect("temp cache dir");
    let state = AppState::new(engine, cache_dir.path().join("cache"), "Qwen3-TTS-VoiceDesign");
    let router = build_router(state.clone(), CorsLayer::permissive());

    TestApp {
        router,
        state,
        counters,
        cache_dir,
    }
}

pub async fn post_tts(router: &Router, body: serde_json::Value) -> Response {
    post_raw(router, "/tts", body.to_string()).await
}

pub async fn post_raw(router: &Router, uri: &str, body: String) -> Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get(router: &Router, uri: &str) -> Response {
    router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn health_status(router: &Router) -> String {
    let response = get(router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["status"].as_str().unwrap().to_string()
}

pub fn assert_wav(response: &Response) {
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "audio/wav"
    );
}

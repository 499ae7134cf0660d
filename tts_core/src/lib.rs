//! Core of the voice-design TTS service: style bundle, cache-key
//! derivation, the model contract and the single-writer engine.

pub mod backend;
pub mod cache;
pub mod engine;
pub mod error;
pub mod model;
pub mod style;
pub mod wav;

pub use backend::{BackendError, HttpModelLoader};
pub use cache::{cache_file_name, AudioCache, INTRO_FILE_NAME, INTRO_TEXT};
pub use engine::{GateStats, GenerationGate, LoadPhase, VoiceEngine};
pub use error::TtsError;
pub use model::{AudioBuffer, ModelLoader, ModelSpec, Precision, VoiceDesignModel, DEFAULT_MODEL_ID};
pub use style::StyleConfig;

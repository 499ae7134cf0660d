//! Contract with the pretrained voice-design model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::style::StyleConfig;

pub const DEFAULT_MODEL_ID: &str = "Qwen/Qwen3-TTS-12Hz-1.7B-VoiceDesign";

/// Raw mono audio produced by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// Numeric precision the weights are loaded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Float32,
    Float16,
    BFloat16,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Float32 => "float32",
            Precision::Float16 => "float16",
            Precision::BFloat16 => "bfloat16",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float32" | "fp32" | "f32" => Ok(Precision::Float32),
            "float16" | "fp16" | "f16" => Ok(Precision::Float16),
            "bfloat16" | "bf16" => Ok(Precision::BFloat16),
            other => Err(anyhow::anyhow!(
                "unknown precision '{other}' (expected float32, float16 or bfloat16)"
            )),
        }
    }
}

/// Parameters for the one-time model load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model_id: String,
    /// `auto`, `cpu`, `mps`, `cuda:0`, ...
    pub device_map: String,
    pub dtype: Precision,
    /// CPU intra-op threads; ignored on accelerators.
    pub num_threads: Option<usize>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            device_map: "auto".to_string(),
            dtype: Precision::Float32,
            num_threads: Some(4),
        }
    }
}

impl ModelSpec {
    /// Force CPU, as the batch tools do for stability.
    pub fn on_cpu(self) -> Self {
        Self {
            device_map: "cpu".to_string(),
            ..self
        }
    }
}

/// A loaded model. Not thread-safe: callers must serialize access.
pub trait VoiceDesignModel: Send {
    /// Generate speech for `text`, seeding the sampler with `style.seed`.
    fn generate(&mut self, text: &str, style: &StyleConfig) -> anyhow::Result<AudioBuffer>;
}

/// Produces a [`VoiceDesignModel`]. Loading is slow and synchronous.
pub trait ModelLoader: Send + Sync {
    fn spec(&self) -> &ModelSpec;

    fn load(&self) -> anyhow::Result<Box<dyn VoiceDesignModel>>;
}

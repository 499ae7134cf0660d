//! Voice-style bundle passed to the model on every generation.
//!
//! The bundle is part of the cache key: bump `version` whenever the prompt
//! or seed changes so previously rendered audio is not silently reused.

use serde::{Deserialize, Serialize};

/// Prompt that produced the "confident" voice (seed 777) picked in audition.
pub const CONFIDENT_PROMPT: &str = "Speak ONLY in Korean. 1.5x speed. Energetic and confident. \
Enunciate clearly. Cute but strong female voice. No pauses. \
한국어만 사용. 1.5배속. 당차고 자신감 넘치는 목소리. 발음은 또박또박하게.";

/// Prompt used when auditioning candidate seeds.
pub const AUDITION_PROMPT: &str = "Speak ONLY in Korean. 1.5x speed. Very fast and snappy. \
Enunciate clearly but rapidly. Cute, witty, high-pitched female voice. No pauses. \
한국어만 사용. 1.5배속으로 아주 빠르게 말한다. 쉴 새 없이 조잘거리는 느낌. 발음은 또박또박하게.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleConfig {
    pub version: String,
    pub language: String,
    /// Free-form voice-design instructions.
    pub instruct: String,
    pub seed: u64,
}

impl StyleConfig {
    pub fn confident() -> Self {
        Self {
            version: "v5".to_string(),
            language: "Korean".to_string(),
            instruct: CONFIDENT_PROMPT.to_string(),
            seed: 777,
        }
    }

    /// Same style with a different seed (used by the audition sweep).
    pub fn with_seed(&self, seed: u64) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }

    pub fn with_instruct(&self, instruct: impl Into<String>) -> Self {
        Self {
            instruct: instruct.into(),
            ..self.clone()
        }
    }

    /// Tag mixed into every cache key, e.g. `v5_seed777`.
    pub fn cache_tag(&self) -> String {
        format!("{}_seed{}", self.version, self.seed)
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self::confident()
    }
}

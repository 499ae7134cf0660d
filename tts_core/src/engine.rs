//! Process-wide model singleton and the generation gate in front of it.
//!
//! Lifecycle: `Uninitialized -> Loading -> Ready | Failed`. A failed load
//! leaves the slot empty, so the next caller retries. Loads are serialized
//! by `init_lock`; generations are serialized by the [`GenerationGate`].
//! Every method here blocks and must run off the async executor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{Result, TtsError};
use crate::model::{AudioBuffer, ModelLoader, VoiceDesignModel};
use crate::style::StyleConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    pub generations: u64,
    pub held: Duration,
}

/// Mutual exclusion around the model: at most one inference at a time.
pub struct GenerationGate {
    model: Mutex<Box<dyn VoiceDesignModel>>,
    generations: AtomicU64,
    held_nanos: AtomicU64,
}

impl GenerationGate {
    pub fn new(model: Box<dyn VoiceDesignModel>) -> Self {
        Self {
            model: Mutex::new(model),
            generations: AtomicU64::new(0),
            held_nanos: AtomicU64::new(0),
        }
    }

    /// Blocks until the gate is free, then runs one generation.
    /// The guard drops on every exit path, so the gate is always released.
    pub fn generate(&self, text: &str, style: &StyleConfig) -> Result<AudioBuffer> {
        debug!("Waiting for generation gate");
        let mut model = self.model.lock().map_err(|_| {
            TtsError::Synthesis(
                "Model lock poisoned by a previous panic. Please restart the server.".to_string(),
            )
        })?;

        debug!(chars = text.chars().count(), "Gate acquired, generating");
        let started = Instant::now();
        let result = model.generate(text, style);
        let elapsed = started.elapsed();
        drop(model);

        self.generations.fetch_add(1, Ordering::Relaxed);
        self.held_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);

        match result {
            Ok(audio) => {
                info!(
                    "Generation complete in {:.2}s ({} ms of audio)",
                    elapsed.as_secs_f64(),
                    audio.duration_ms()
                );
                Ok(audio)
            }
            Err(e) => {
                debug!("Generation failed after {:.2}s: {e:#}", elapsed.as_secs_f64());
                Err(TtsError::Synthesis(format!("{e:#}")))
            }
        }
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            generations: self.generations.load(Ordering::Relaxed),
            held: Duration::from_nanos(self.held_nanos.load(Ordering::Relaxed)),
        }
    }
}

pub struct VoiceEngine {
    loader: Box<dyn ModelLoader>,
    style: StyleConfig,
    init_lock: Mutex<()>,
    gate: OnceLock<GenerationGate>,
    phase: RwLock<LoadPhase>,
}

impl VoiceEngine {
    pub fn new(loader: Box<dyn ModelLoader>, style: StyleConfig) -> Self {
        Self {
            loader,
            style,
            init_lock: Mutex::new(()),
            gate: OnceLock::new(),
            phase: RwLock::new(LoadPhase::Uninitialized),
        }
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn is_ready(&self) -> bool {
        self.gate.get().is_some()
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_phase(&self, phase: LoadPhase) {
        *self.phase.write().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    /// Load the model if it is not resident yet. Concurrent callers wait for
    /// the in-flight load instead of starting their own.
    pub fn ensure_loaded(&self) -> Result<&GenerationGate> {
        if let Some(gate) = self.gate.get() {
            return Ok(gate);
        }

        let _init = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(gate) = self.gate.get() {
            return Ok(gate);
        }

        let spec = self.loader.spec();
        info!(
            "Loading model {} (device={}, dtype={})... This may take a while for the first run.",
            spec.model_id, spec.device_map, spec.dtype
        );
        self.set_phase(LoadPhase::Loading);
        let started = Instant::now();

        match self.loader.load() {
            Ok(model) => {
                let gate = self.gate.get_or_init(|| GenerationGate::new(model));
                self.set_phase(LoadPhase::Ready);
                info!("Model loaded in {:.1}s", started.elapsed().as_secs_f64());
                Ok(gate)
            }
            Err(e) => {
                let msg = format!("{e:#}");
                warn!("Failed to load model: {msg}");
                self.set_phase(LoadPhase::Failed(msg.clone()));
                Err(TtsError::ModelUnavailable(msg))
            }
        }
    }

    /// Generate with the engine's style, loading the model first if needed.
    pub fn synthesize(&self, text: &str) -> Result<AudioBuffer> {
        self.ensure_loaded()?.generate(text, &self.style)
    }

    pub fn gate_stats(&self) -> GateStats {
        self.gate.get().map(GenerationGate::stats).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelSpec;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[derive(Default)]
    struct Counters {
        loads: AtomicUsize,
        generations: AtomicUsize,
        in_gate: AtomicUsize,
        max_in_gate: AtomicUsize,
        fail_loads: AtomicUsize,
    }

    struct CountingModel {
        counters: Arc<Counters>,
        work: Duration,
    }

    impl VoiceDesignModel for CountingModel {
        fn generate(&mut self, text: &str, style: &StyleConfig) -> anyhow::Result<AudioBuffer> {
            let now = self.counters.in_gate.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_in_gate.fetch_max(now, Ordering::SeqCst);
            thread::sleep(self.work);
            self.counters.in_gate.fetch_sub(1, Ordering::SeqCst);
            self.counters.generations.fetch_add(1, Ordering::SeqCst);
            if text == "boom" {
                anyhow::bail!("inference exploded");
            }
            Ok(AudioBuffer {
                samples: vec![0.1; style.seed as usize],
                sample_rate: 24_000,
            })
        }
    }

    struct CountingLoader {
        spec: ModelSpec,
        counters: Arc<Counters>,
        load_time: Duration,
        work: Duration,
    }

    impl ModelLoader for CountingLoader {
        fn spec(&self) -> &ModelSpec {
            &self.spec
        }

        fn load(&self) -> anyhow::Result<Box<dyn VoiceDesignModel>> {
            self.counters.loads.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.load_time);
            let remaining = self.counters.fail_loads.load(Ordering::SeqCst);
            if remaining > 0 {
                self.counters.fail_loads.store(remaining - 1, Ordering::SeqCst);
                anyhow::bail!("weights not found");
            }
            Ok(Box::new(CountingModel {
                counters: self.counters.clone(),
                work: self.work,
            }))
        }
    }

    fn engine(counters: &Arc<Counters>, load_time: Duration, work: Duration) -> Arc<VoiceEngine> {
        let loader = CountingLoader {
            spec: ModelSpec::default(),
            counters: counters.clone(),
            load_time,
            work,
        };
        Arc::new(VoiceEngine::new(Box::new(loader), StyleConfig::default()))
    }

    #[test]
    fn test_lifecycle_phases() {
        let counters = Arc::new(Counters::default());
        let engine = engine(&counters, Duration::ZERO, Duration::ZERO);
        assert_eq!(engine.phase(), LoadPhase::Uninitialized);
        assert!(!engine.is_ready());

        engine.ensure_loaded().unwrap();
        assert_eq!(engine.phase(), LoadPhase::Ready);
        assert!(engine.is_ready());

        engine.ensure_loaded().unwrap();
        assert_eq!(counters.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_retries() {
        let counters = Arc::new(Counters::default());
        counters.fail_loads.store(1, Ordering::SeqCst);
        let engine = engine(&counters, Duration::ZERO, Duration::ZERO);

        let err = engine.ensure_loaded().err().unwrap();
        assert!(matches!(err, TtsError::ModelUnavailable(ref m) if m.contains("weights not found")));
        assert!(matches!(engine.phase(), LoadPhase::Failed(_)));
        assert!(!engine.is_ready());

        engine.ensure_loaded().unwrap();
        assert_eq!(counters.loads.load(Ordering::SeqCst), 2);
        assert!(engine.is_ready());
    }

    #[test]
    fn test_concurrent_cold_start_loads_once() {
        let counters = Arc::new(Counters::default());
        let engine = engine(&counters, Duration::from_millis(50), Duration::ZERO);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || engine.ensure_loaded().map(|_| ()))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        assert_eq!(counters.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_gate_serializes_generations() {
        let counters = Arc::new(Counters::default());
        let work = Duration::from_millis(30);
        let engine = engine(&counters, Duration::ZERO, work);
        engine.ensure_loaded().unwrap();

        let started = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = engine.clone();
                thread::spawn(move || engine.synthesize(&format!("text {i}")).map(|_| ()))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        assert_eq!(counters.max_in_gate.load(Ordering::SeqCst), 1);
        let stats = engine.gate_stats();
        assert_eq!(stats.generations, 4);
        assert!(stats.held >= work * 4);
        assert!(started.elapsed() >= work * 4);
    }

    #[test]
    fn test_gate_released_after_failure() {
        let counters = Arc::new(Counters::default());
        let engine = engine(&counters, Duration::ZERO, Duration::ZERO);

        let err = engine.synthesize("boom").err().unwrap();
        assert!(matches!(err, TtsError::Synthesis(ref m) if m.contains("inference exploded")));

        let audio = engine.synthesize("fine").unwrap();
        assert_eq!(audio.samples.len(), 777);
        assert_eq!(engine.gate_stats().generations, 2);
    }
}

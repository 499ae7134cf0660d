//! Batch pre-rendering of the static voice clips shipped with the frontend.
//!
//! Rendering is idempotent: a clip whose output file already exists is
//! skipped, so an interrupted run can simply be restarted.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tts_core::{wav, AudioCache, StyleConfig, VoiceDesignModel};

/// `subfolder -> file stem -> text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog(pub BTreeMap<String, BTreeMap<String, String>>);

impl Catalog {
    /// Built-in UI lines.
    pub fn ui() -> Self {
        let lines = [
            ("intro", "어서오게냥! 여행자여, 이름이 무엇이냥?"),
            ("category_select", "무엇이 고민이냥? 연애? 금전? 한번 골라보라냥!"),
            ("shuffle", "좋아, 카드를 섞어보겠다냥... 마음을 담아서 집중하라냥!"),
            ("select_card", "신중하게... 운명의 카드 4장을 골라보라냥!"),
            ("reading_start", "흐음... 어디 보자... 별들의 이야기를 들어보자냥..."),
            ("chat_intro", "결과에 대해 궁금한게 있다면 물어봐!"),
            ("reaction_hmm", "흐음..."),
            ("reaction_oho", "오호..."),
            ("reaction_haha", "하하..."),
            ("reaction_um", "음..."),
            ("reaction_hoo", "호오..."),
        ];
        let ui = lines
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self(BTreeMap::from([("ui".to_string(), ui)]))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        let catalog: Catalog = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a valid catalog", path.display()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Stems become file names, so they must not escape their subfolder.
    fn validate(&self) -> anyhow::Result<()> {
        let safe = |s: &str| {
            !s.is_empty()
                && s != "."
                && s != ".."
                && !s.contains(['/', '\\'])
        };
        for (folder, clips) in &self.0 {
            if !folder.is_empty() && !safe(folder) {
                anyhow::bail!("invalid subfolder name '{folder}'");
            }
            for (stem, text) in clips {
                if !safe(stem) {
                    anyhow::bail!("invalid clip name '{stem}' in '{folder}'");
                }
                if text.trim().is_empty() {
                    anyhow::bail!("clip '{folder}/{stem}' has no text");
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub rendered: usize,
    pub skipped: usize,
}

pub fn clip_path(out_dir: &Path, folder: &str, stem: &str) -> PathBuf {
    out_dir.join(folder).join(format!("{stem}.wav"))
}

/// Render one clip unless it already exists. Returns whether it was rendered.
pub fn render_clip(
    model: &mut dyn VoiceDesignModel,
    style: &StyleConfig,
    text: &str,
    path: &Path,
) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let audio = model
        .generate(text, style)
        .with_context(|| format!("generation failed for {}", path.display()))?;
    let bytes = wav::encode_buffer(&audio)?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    AudioCache::new(dir, style).persist(path, &bytes)?;
    Ok(true)
}

pub fn render_catalog(
    model: &mut dyn VoiceDesignModel,
    style: &StyleConfig,
    catalog: &Catalog,
    out_dir: &Path,
) -> anyhow::Result<RenderReport> {
    let mut report = RenderReport::default();
    let total = catalog.len();
    let mut done = 0;

    for (folder, clips) in &catalog.0 {
        info!("[{folder}] {} clip(s)", clips.len());
        fs::create_dir_all(out_dir.join(folder))
            .with_context(|| format!("Failed to create {}", out_dir.join(folder).display()))?;
        for (stem, text) in clips {
            done += 1;
            let path = clip_path(out_dir, folder, stem);
            if render_clip(model, style, text, &path)? {
                report.rendered += 1;
                info!("[{done}/{total}] {folder}/{stem}");
            } else {
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}

/// Render `text` once per candidate seed into `<out_dir>/seed_<seed>.wav`.
pub fn render_audition(
    model: &mut dyn VoiceDesignModel,
    style: &StyleConfig,
    text: &str,
    seeds: &[u64],
    out_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let mut written = Vec::with_capacity(seeds.len());
    for &seed in seeds {
        let path = out_dir.join(format!("seed_{seed}.wav"));
        info!("Generating candidate with seed {seed}...");
        if !render_clip(model, &style.with_seed(seed), text, &path)? {
            warn!("{} exists, keeping it", path.display());
        }
        written.push(path);
    }
    Ok(written)
}

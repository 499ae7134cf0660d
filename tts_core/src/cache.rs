//! On-disk audio cache keyed by text + style tag.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::style::StyleConfig;

/// Onboarding phrase served from a fixed, human-readable file.
pub const INTRO_TEXT: &str = "어서오게냥, 여행자여... 이름이 무엇이냥?";
pub const INTRO_FILE_NAME: &str = "intro.wav";

const KEY_HEX_LEN: usize = 32;

/// File name for `text` under the given style tag.
pub fn cache_file_name(text: &str, style_tag: &str) -> String {
    if text == INTRO_TEXT {
        return INTRO_FILE_NAME.to_string();
    }
    let digest = Sha256::digest(format!("{text}_{style_tag}").as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(KEY_HEX_LEN);
    format!("{key}.wav")
}

/// Entries are written once and never evicted.
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: PathBuf,
    style_tag: String,
}

impl AudioCache {
    pub fn new(dir: impl Into<PathBuf>, style: &StyleConfig) -> Self {
        Self {
            dir: dir.into(),
            style_tag: style.cache_tag(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn style_tag(&self) -> &str {
        &self.style_tag
    }

    pub fn path_for(&self, text: &str) -> PathBuf {
        self.dir.join(cache_file_name(text, &self.style_tag))
    }

    /// Write through a unique temp file so readers never see a partial entry.
    /// Concurrent writers of the same key race benignly: contents are identical.
    pub fn persist(&self, path: &Path, wav: &[u8]) -> io::Result<()> {
        let parent = path.parent().unwrap_or(&self.dir);
        fs::create_dir_all(parent)?;
        let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, wav).and_then(|_| fs::rename(&tmp, path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }
}

//! Recognizer language data
//!
//! The recognizer loads `<root>/tesseract/tessdata/<lang>.traineddata`. The
//! file ships in an assets directory and is copied into the data root the
//! first time it is needed. An installed file is never rewritten.
//!
//! Tesseract 4 and later take the directory that directly contains the
//! traineddata files as their data path, so that is what the store hands
//! to the recognizer.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Record of one installed language file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledLanguage {
    pub language: String,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Manifest of installed language files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageManifest {
    pub languages: Vec<InstalledLanguage>,
}

/// Language data under one data root
#[derive(Debug, Clone)]
pub struct LanguageDataStore {
    root: PathBuf,
}

impl LanguageDataStore {
    /// Store rooted at the platform data directory
    pub fn new() -> Result<Self> {
        Ok(Self::with_root(crate::storage::get_data_dir()?))
    }

    /// Store rooted at a custom directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the traineddata files, handed to the recognizer's `init`
    pub fn tessdata_dir(&self) -> PathBuf {
        self.root.join("tesseract").join("tessdata")
    }

    pub fn traineddata_path(&self, language: &str) -> PathBuf {
        self.tessdata_dir().join(format!("{}.traineddata", language))
    }

    /// Check whether a language file is already in place
    pub fn is_installed(&self, language: &str) -> bool {
        std::fs::metadata(self.traineddata_path(language))
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    /// Copy `<assets_dir>/<lang>.traineddata` into the store unless it is
    /// already there. Returns the directory holding `<lang>.traineddata`.
    pub fn ensure_language(&self, assets_dir: &Path, language: &str) -> Result<PathBuf> {
        let target = self.traineddata_path(language);

        if self.is_installed(language) {
            debug!("Language data {:?} already installed at {:?}", language, target);
            return Ok(self.tessdata_dir());
        }

        let source = assets_dir.join(format!("{}.traineddata", language));
        info!("Installing language data {:?} from {:?}", language, source);

        std::fs::create_dir_all(self.tessdata_dir())
            .with_context(|| format!("Failed to create {:?}", self.tessdata_dir()))?;

        let (size_bytes, sha256) = copy_with_digest(&source, &target)?;
        self.record(InstalledLanguage {
            language: language.to_string(),
            size_bytes,
            sha256,
        })?;

        info!("Installed {} ({} bytes)", language, size_bytes);
        Ok(self.tessdata_dir())
    }

    /// Load the install manifest
    pub fn load_manifest(&self) -> Result<LanguageManifest> {
        let manifest_path = self.manifest_path();
        if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(LanguageManifest::default())
        }
    }

    fn manifest_path(&self) -> PathBuf {
        self.tessdata_dir().join("manifest.json")
    }

    fn record(&self, entry: InstalledLanguage) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();
        manifest.languages.retain(|l| l.language != entry.language);
        manifest.languages.push(entry);

        let content = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(self.manifest_path(), content)?;
        Ok(())
    }
}

/// Copy through a temp file next to `target`, hashing on the way, then move
/// it into place
fn copy_with_digest(source: &Path, target: &Path) -> Result<(u64, String)> {
    let input = std::fs::File::open(source)
        .with_context(|| format!("Language data not found at {:?}", source))?;

    let temp_path = target.with_extension("tmp");
    let result = copy_into_temp(input, &temp_path).and_then(|(copied, digest)| {
        if copied == 0 {
            anyhow::bail!("Language data at {:?} is empty", source);
        }
        std::fs::rename(&temp_path, target)
            .context("Failed to move language data to final location")?;
        Ok((copied, digest))
    });

    if result.is_err() && temp_path.exists() {
        std::fs::remove_file(&temp_path).ok();
    }
    result
}

fn copy_into_temp(mut input: std::fs::File, temp_path: &Path) -> Result<(u64, String)> {
    let mut output = std::fs::File::create(temp_path).context("Failed to create temp file")?;

    let mut hasher = Sha256::new();
    let mut copied: u64 = 0;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = input.read(&mut buf).context("Failed to read language data")?;
        if n == 0 {
            break;
        }
        output
            .write_all(&buf[..n])
            .context("Failed to write to temp file")?;
        hasher.update(&buf[..n]);
        copied += n as u64;
    }
    output.flush().context("Failed to flush temp file")?;

    Ok((copied, format!("{:x}", hasher.finalize())))
}

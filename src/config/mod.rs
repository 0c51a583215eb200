//! Application Configuration
//!
//! Pipeline and recognizer settings stored in TOML format.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Frame preprocessing settings
    pub pipeline: PipelineSettings,
    /// Recognizer setup and gating settings
    pub recognizer: RecognizerSettings,
}

impl AppConfig {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        self.recognizer.validate()
    }
}

/// Frame preprocessing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Run skew estimation and correction (accurate path)
    pub deskew: bool,
    /// Adaptive threshold window size (odd, >= 3)
    pub adaptive_block_size: u32,
    /// Constant subtracted from the local mean
    pub adaptive_offset: i32,
    /// Global threshold used when building the skew mask
    pub skew_threshold: u8,
    /// Square erosion kernel size for the skew mask
    pub erode_kernel: u32,
    /// Fill color for pixels exposed by rotation
    pub border_fill: u8,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            deskew: false,
            adaptive_block_size: 29,
            adaptive_offset: 10,
            skew_threshold: 200,
            erode_kernel: 3,
            border_fill: 255,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<()> {
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            bail!(
                "adaptive_block_size must be odd and at least 3, got {}",
                self.adaptive_block_size
            );
        }
        if self.erode_kernel == 0 {
            bail!("erode_kernel must be at least 1");
        }
        Ok(())
    }
}

/// Recognizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerSettings {
    /// Recognizer language code (also the traineddata file stem)
    pub language: String,
    /// Minimum mean confidence (exclusive) for text to reach the display
    pub confidence_threshold: i32,
    /// Directory holding the bundled `<lang>.traineddata` files
    pub assets_dir: PathBuf,
    /// Override for the app data root; the platform data dir when unset
    pub data_dir: Option<PathBuf>,
    /// How many times setup is tried before giving up
    pub setup_attempts: u32,
    /// Tesseract page segmentation mode (6: a single uniform block of text)
    pub page_seg_mode: u32,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            confidence_threshold: 30,
            assets_dir: PathBuf::from("assets/tessdata"),
            data_dir: None,
            setup_attempts: 1,
            page_seg_mode: 6,
        }
    }
}

impl RecognizerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            bail!("recognizer language must not be empty");
        }
        if !(0..=100).contains(&self.confidence_threshold) {
            bail!(
                "confidence_threshold must be within 0-100, got {}",
                self.confidence_threshold
            );
        }
        if self.setup_attempts == 0 {
            bail!("setup_attempts must be at least 1");
        }
        if self.page_seg_mode > 13 {
            bail!("page_seg_mode must be within 0-13, got {}", self.page_seg_mode);
        }
        Ok(())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from file, falling back to defaults when it does not exist
pub fn load_or_default(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(AppConfig::default())
    }
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

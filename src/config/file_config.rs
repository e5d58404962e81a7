use crate::pipeline::SourceFallback;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub model_dir: Option<String>,
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub options_cache_age_sec: Option<usize>,
    pub frontend_dir_path: Option<String>,

    // Pipeline settings
    pub encoding: Option<EncodingConfig>,
    pub reputation: Option<ReputationConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct EncodingConfig {
    /// Omit the indicator of reference categories when one-hot encoding.
    pub drop_first: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ReputationConfig {
    /// "studio_mean" or "source_mean"
    pub source_fallback: Option<SourceFallback>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnmixError};
use crate::reference::ChannelSelection;
use crate::unmix::UnmixConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// A raw stack or a directory of them.
    pub input: PathBuf,
    /// Output directory.
    pub output: PathBuf,
    /// A reference CSV, or a directory of per-laser references.
    pub reference: PathBuf,
    #[serde(default)]
    pub channels: ChannelSelection,
    #[serde(default)]
    pub unmix: UnmixConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input"),
            output: PathBuf::from("output"),
            reference: PathBuf::from("reference"),
            channels: ChannelSelection::default(),
            unmix: UnmixConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| UnmixError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| UnmixError::Config(e.to_string()))
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Settings read from a TOML file. Every key is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub input_dir: Option<String>,
    pub warehouse_db: Option<String>,

    pub window: Option<WindowConfig>,
    pub input: Option<InputConfig>,
    pub load: Option<LoadConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct WindowConfig {
    /// `YYYY-MM-DD`
    pub start: Option<String>,
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub max_rank: Option<u32>,
    pub artist_delimiter: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LoadConfig {
    pub clear_target: Option<bool>,
    pub dry_run: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

//! Run configuration
//!
//! Persisted as JSON. Every field has a default, so a partial file only
//! overrides what it names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Default explicit tier: card frame textures and their replacement files
pub fn default_explicit_table() -> BTreeMap<String, String> {
    [
        ("card_frame00", "normal.png"),
        ("card_frame01", "effect.png"),
        ("card_frame02", "ritual.png"),
        ("card_frame03", "fusion.png"),
        ("card_frame07", "spell.png"),
        ("card_frame08", "trap.png"),
        ("card_frame09", "token.png"),
        ("card_frame10", "synchro.png"),
        ("card_frame12", "xyz.png"),
        ("card_frame13", "pendn.png"),
        ("card_frame14", "pend.png"),
        ("card_frame15", "pendx.png"),
        ("card_frame16", "pends.png"),
        ("card_frame17", "pendf.png"),
        ("card_frame18", "link.png"),
        ("card_frame19", "pendf.png"),
    ]
    .into_iter()
    .map(|(name, file)| (name.to_string(), file.to_string()))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatchConfig {
    /// Texture name -> replacement file name inside `frame_dir`
    pub explicit_table: BTreeMap<String, String>,
    pub frame_dir: PathBuf,
    /// Scanned for replacement images keyed by file stem
    pub mask_dir: Option<PathBuf>,
    /// Only texture names containing this string are targets
    pub name_filter: Option<String>,
    /// Location of the container below a root directory given as input
    pub container_relative_path: Option<PathBuf>,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            explicit_table: default_explicit_table(),
            frame_dir: PathBuf::from("res"),
            mask_dir: Some(PathBuf::from("mask")),
            name_filter: None,
            container_relative_path: None,
        }
    }
}

impl PatchConfig {
    /// Read a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        tracing::info!("Loaded config: {:?}", path);
        Ok(config)
    }

    /// Write a config file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load `path` when given; otherwise the per-user config if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let Some(default_path) = default_config_path() else {
            return Ok(Self::default());
        };
        if !default_path.exists() {
            return Ok(Self::default());
        }

        match Self::load(&default_path) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!("Failed to load config {:?}: {}", default_path, e);
                Ok(Self::default())
            }
        }
    }
}

/// `<config dir>/texpatch/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("texpatch").join("config.json"))
}

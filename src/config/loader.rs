use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

pub const CONFIG_FILE_NAME: &str = "curlforge.json";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CurlforgeConfig {
    #[serde(rename = "defaultFormat")]
    pub default_format: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "outputDir")]
    pub output_dir: Option<String>,
    #[serde(rename = "requestNames")]
    pub request_names: HashMap<usize, String>,
    #[serde(rename = "environmentNames")]
    pub environment_names: HashMap<String, String>,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: CurlforgeConfig,
    pub path: PathBuf,
    pub dir: PathBuf,
}

impl LoadedConfig {
    /// `outputDir` resolved against the directory holding the config file.
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.config
            .output_dir
            .as_deref()
            .map(|value| resolve_relative(&self.dir, value))
    }
}

fn resolve_relative(base: &Path, value: &str) -> PathBuf {
    let candidate = Path::new(value);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

/// Loads `curlforge.json` from `target`, which may be a directory or the
/// file itself. A missing file is not an error.
pub fn load_config(target: &Path) -> Result<Option<LoadedConfig>> {
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        std::env::current_dir()?.join(target)
    };

    let (file_path, dir) = if resolved.is_dir() {
        (resolved.join(CONFIG_FILE_NAME), resolved)
    } else {
        let dir = match resolved.parent() {
            Some(parent) => parent.to_path_buf(),
            None => std::env::current_dir()?,
        };
        (resolved, dir)
    };

    if !file_path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&file_path)
        .with_context(|| format!("reading config {}", file_path.display()))?;

    let config: CurlforgeConfig = serde_json::from_str(&contents)
        .with_context(|| format!("parsing config {}", file_path.display()))?;

    Ok(Some(LoadedConfig {
        config,
        path: file_path,
        dir,
    }))
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Dataset used when `--file` is not given.
    #[serde(default = "default_dataset")]
    pub dataset: String,
    /// Directory the CSV and PDF exports are written to.
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    #[serde(default = "default_completeness_rows")]
    pub completeness_rows: usize,
    #[serde(default = "default_lowest_completeness")]
    pub lowest_completeness: usize,
}

fn default_dataset() -> String {
    "cloudmart_multi_account.csv".to_string()
}

fn default_export_dir() -> String {
    ".".to_string()
}

fn default_preview_rows() -> usize {
    5
}

fn default_completeness_rows() -> usize {
    10
}

fn default_lowest_completeness() -> usize {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            export_dir: default_export_dir(),
            preview_rows: default_preview_rows(),
            completeness_rows: default_completeness_rows(),
            lowest_completeness: default_lowest_completeness(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("cloudmart")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        parse_settings(&content)
    } else {
        Settings::default()
    }
}

/// Unreadable or partial JSON falls back to defaults field by field.
fn parse_settings(content: &str) -> Settings {
    match serde_json::from_str(content) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed settings file");
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| DashboardError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

/// Update one setting by its JSON key.
pub fn set_value(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    let count = |v: &str| {
        v.parse::<usize>()
            .map_err(|_| DashboardError::Settings(format!("{key} must be a whole number, got {v:?}")))
    };
    match key {
        "dataset" => settings.dataset = shellexpand_path(value),
        "export_dir" => settings.export_dir = shellexpand_path(value),
        "preview_rows" => settings.preview_rows = count(value)?,
        "completeness_rows" => settings.completeness_rows = count(value)?,
        "lowest_completeness" => settings.lowest_completeness = count(value)?,
        _ => return Err(DashboardError::Settings(format!("Unknown setting: {key}"))),
    }
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

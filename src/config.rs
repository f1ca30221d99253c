//! Converter configuration.
//!
//! Handles loading, validating, and merging `mdtodocu.toml`. Every key is
//! optional: stock defaults are overridden by whatever the user file sets.
//!
//! ## Config File Location
//!
//! The converter looks for `mdtodocu.toml` in the working directory, or reads
//! the file passed with `--config`:
//!
//! ```text
//! collections/
//! ├── mdtodocu.toml            # Optional converter config
//! ├── docu_book/               # Output parent (one directory per book)
//! └── ...
//! books/
//! └── manual/
//!     ├── SUMMARY.md
//!     └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! books_dir = "../books"      # Parent of per-book source roots
//! output_dir = "docu_book"    # Parent of per-book output roots
//! summary_file = "SUMMARY.md" # Outline file, relative to the book root
//! log_file = "mdtodocu.log"   # Warning log, overwritten on every run
//! # indent_unit = 2           # Spaces per outline level (omit to auto-detect)
//! search_roots = []           # Extra roots searched by file name
//! image_extensions = ["jpg", "jpeg", "png", "gif", "svg", "webp"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file picked up from the working directory.
pub const CONFIG_FILENAME: &str = "mdtodocu.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration loaded from `mdtodocu.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Directory holding one source directory per book.
    pub books_dir: PathBuf,
    /// Directory receiving one output directory per book.
    pub output_dir: PathBuf,
    /// Outline file name, relative to the book's source root.
    pub summary_file: PathBuf,
    /// Warning log written at the end of every run.
    pub log_file: PathBuf,
    /// Spaces per outline nesting level. Detected from the outline when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_unit: Option<usize>,
    /// Additional roots searched by file name when a reference does not
    /// resolve inside the book.
    pub search_roots: Vec<PathBuf>,
    /// Extensions treated as interchangeable when an image reference does not
    /// match a file exactly (`b.jpg` may resolve to `b.jpeg`).
    pub image_extensions: Vec<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            books_dir: PathBuf::from("../books"),
            output_dir: PathBuf::from("docu_book"),
            summary_file: PathBuf::from("SUMMARY.md"),
            log_file: PathBuf::from("mdtodocu.log"),
            indent_unit: None,
            search_roots: Vec::new(),
            image_extensions: ["jpg", "jpeg", "png", "gif", "svg", "webp"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl ConvertConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.summary_file.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "summary_file must not be empty".into(),
            ));
        }
        if self.log_file.as_os_str().is_empty() {
            return Err(ConfigError::Validation("log_file must not be empty".into()));
        }
        if self.indent_unit == Some(0) {
            return Err(ConfigError::Validation(
                "indent_unit must be at least 1".into(),
            ));
        }
        if self
            .image_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').is_empty())
        {
            return Err(ConfigError::Validation(
                "image_extensions must not contain empty entries".into(),
            ));
        }
        Ok(())
    }

    /// Image extensions lowercased and without a leading dot.
    pub fn normalized_image_extensions(&self) -> Vec<String> {
        self.image_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ConvertConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ConvertConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ConvertConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `mdtodocu.toml` from `dir`, falling back to defaults when absent.
pub fn load_config(dir: &Path) -> Result<ConvertConfig, ConfigError> {
    let overlay = load_raw_config(&dir.join(CONFIG_FILENAME))?;
    resolve_config(stock_defaults_value(), overlay)
}

/// Load an explicitly named config file. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<ConvertConfig, ConfigError> {
    let overlay =
        load_raw_config(path)?.ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?;
    resolve_config(stock_defaults_value(), Some(overlay))
}

//! Database configuration via `tether.toml`
//!
//! Selects the record store backend. Parsed with `serde` + `toml`; unknown
//! backend names are rejected when the config is loaded.
//!
//! A `tether.toml` read from disk resolves a relative `data_dir` against
//! the directory holding the file, and a `"file"` backend without a
//! `data_dir` stores its records next to the config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tether_core::{Error, Result};

/// Config file name placed next to the data it describes.
pub const CONFIG_FILE_NAME: &str = "tether.toml";

/// Backend selected by a config
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// `MemoryStore`, nothing persisted
    Memory,
    /// `FileStore` in the given directory
    File(PathBuf),
}

/// Database configuration loaded from `tether.toml`.
///
/// # Example
///
/// ```toml
/// # Record store backend: "file" (default) or "memory"
/// backend = "file"
/// # Data directory, relative to this file; defaults to the file's directory
/// data_dir = "records"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TetherConfig {
    /// Backend name: `"file"` or `"memory"`.
    #[serde(default = "default_backend_str")]
    pub backend: String,
    /// Data directory for the file backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_backend_str() -> String {
    "file".to_string()
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            backend: default_backend_str(),
            data_dir: None,
        }
    }
}

impl TetherConfig {
    /// Config for a file store in `dir`
    pub fn file(dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: "file".to_string(),
            data_dir: Some(dir.into()),
        }
    }

    /// Config for an in-memory store
    pub fn memory() -> Self {
        Self {
            backend: "memory".to_string(),
            data_dir: None,
        }
    }

    /// Parse the backend string into a `Backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unknown, or if `"file"` is chosen
    /// without a `data_dir`.
    pub fn backend_kind(&self) -> Result<Backend> {
        if self.is_memory()? {
            return Ok(Backend::Memory);
        }
        self.data_dir.clone().map(Backend::File).ok_or_else(|| {
            Error::invalid_input("backend \"file\" requires data_dir in tether.toml")
        })
    }

    /// Resolve the backend against the directory holding the config file.
    ///
    /// A relative `data_dir` is joined onto `base`; a missing one means
    /// `base` itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unknown.
    pub fn resolve(&self, base: &Path) -> Result<Backend> {
        if self.is_memory()? {
            return Ok(Backend::Memory);
        }
        Ok(Backend::File(
            self.data_dir
                .as_ref()
                .map_or_else(|| base.to_path_buf(), |d| base.join(d)),
        ))
    }

    fn is_memory(&self) -> Result<bool> {
        match self.backend.as_str() {
            "memory" => Ok(true),
            "file" => Ok(false),
            other => Err(Error::invalid_input(format!(
                "Invalid backend '{}' in tether.toml. Expected \"file\" or \"memory\".",
                other
            ))),
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Tether configuration
#
# Record store backend: "file" (default) or "memory"
#   "file"   = records persisted as JSON under data_dir
#   "memory" = records live only as long as the process
backend = "file"

# Data directory, relative to this file. Defaults to the directory
# holding this file.
# data_dir = "records"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::storage(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: TetherConfig = toml::from_str(&content).map_err(|e| {
            Error::invalid_input(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        // Validate the backend eagerly
        config.is_memory()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::storage(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::storage(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

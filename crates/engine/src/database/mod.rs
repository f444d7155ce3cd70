//! Database: explicit owner of a record store that opens sessions
//!
//! There is no process-wide session factory. Callers construct a
//! `Database`, keep it, and open as many sessions from it as they need;
//! sessions share the store but nothing else.

mod config;

pub use config::{Backend, TetherConfig, CONFIG_FILE_NAME};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tether_core::{Error, RecordStore, Result};
use tether_storage::{FileStore, MemoryStore};
use tracing::info;

use crate::session::Session;

/// Owner of a record store
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn RecordStore>,
    data_dir: Option<PathBuf>,
}

impl Database {
    /// In-memory database; nothing survives the process
    pub fn ephemeral() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Database in `dir`, configured by `dir/tether.toml`
    ///
    /// A default `tether.toml` (file backend, records in `dir`) is written
    /// if none exists, then read back to select the backend.
    ///
    /// # Errors
    ///
    /// `Error::Storage` if the directory, config or data file cannot be
    /// opened; `Error::InvalidInput` for an invalid config.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        create_dir(dir)?;

        let config_path = dir.join(CONFIG_FILE_NAME);
        TetherConfig::write_default_if_missing(&config_path)?;
        let config = TetherConfig::from_file(&config_path)?;

        Self::open_resolved(config.resolve(dir)?)
    }

    /// Database in `dir` with an explicit configuration
    ///
    /// The config is written to `dir/tether.toml` so later `open` calls
    /// pick up the same settings.
    pub fn open_with_config(dir: impl AsRef<Path>, config: &TetherConfig) -> Result<Self> {
        let dir = dir.as_ref();
        create_dir(dir)?;
        let backend = config.resolve(dir)?;
        config.write_to_file(&dir.join(CONFIG_FILE_NAME))?;
        Self::open_resolved(backend)
    }

    /// Database for the backend a config selects
    ///
    /// A `"file"` config must name its `data_dir`; use `from_config_file`
    /// to resolve it against the config's location instead.
    pub fn from_config(config: &TetherConfig) -> Result<Self> {
        Self::open_resolved(config.backend_kind()?)
    }

    /// Database for the backend selected by the config file at `path`
    ///
    /// `data_dir` is resolved against the directory holding the file.
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let config = TetherConfig::from_file(path)?;
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::open_resolved(config.resolve(base)?)
    }

    fn open_resolved(backend: Backend) -> Result<Self> {
        match backend {
            Backend::Memory => Ok(Self::ephemeral()),
            Backend::File(dir) => {
                let store = FileStore::open(&dir)?;
                info!(target: "tether::db", path = ?dir, "Opened database");
                Ok(Self {
                    store: Arc::new(store),
                    data_dir: Some(dir),
                })
            }
        }
    }

    /// Database over a caller-supplied store
    pub fn with_store(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            data_dir: None,
        }
    }

    /// Open a new session
    pub fn session(&self) -> Session {
        Session::new(Arc::clone(&self.store))
    }

    /// The shared record store
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Data directory, for file-backed databases
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::storage(format!("failed to create '{}': {}", dir.display(), e)))
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

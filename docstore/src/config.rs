//! Service configuration.
//!
//! Configuration is read from TOML and may be overridden by environment variables:
//!
//! ```toml
//! api_host = "api.ft.com"
//! apply_indexes_on_startup = true
//!
//! [store]
//! backend = "mongodb"
//! dsn = "mongodb://localhost:27017"
//! database = "upp-store"
//! ```
//!
//! | Variable               | Overrides                                   |
//! |------------------------|---------------------------------------------|
//! | `DOCSTORE_CONFIG_PATH` | path read by [`DocumentStoreConfig::from_env`] |
//! | `DOCSTORE_MONGO_DSN`   | `store.dsn` of a MongoDB store              |
//! | `DOCSTORE_API_HOST`    | `api_host`                                  |

use std::path::Path;

use serde::{Deserialize, Serialize};

use docstore_core::error::{DocumentStoreError, DocumentStoreResult};

pub const CONFIG_PATH_ENV: &str = "DOCSTORE_CONFIG_PATH";
pub const MONGO_DSN_ENV: &str = "DOCSTORE_MONGO_DSN";
pub const API_HOST_ENV: &str = "DOCSTORE_API_HOST";

const DEFAULT_API_HOST: &str = "localhost";

/// Top-level configuration of a [`DocumentStoreService`](crate::service::DocumentStoreService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    /// Host that outbound `apiUrl` fields and rewritten links point at.
    pub api_host: String,
    /// Ensure every registered collection's indexes exist when the service starts.
    pub apply_indexes_on_startup: bool,
    pub store: StoreConfig,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            apply_indexes_on_startup: true,
            store: StoreConfig::Memory,
        }
    }
}

/// Which backend to run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// The in-memory backend.
    #[default]
    Memory,
    /// A MongoDB deployment. Requires the `mongodb` feature.
    Mongodb { dsn: String, database: String },
}

impl StoreConfig {
    /// Short name of the backend kind, as written in the `backend` key.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::Mongodb { .. } => "mongodb",
        }
    }
}

impl DocumentStoreConfig {
    /// Parses a TOML document, then applies environment overrides.
    pub fn from_toml_str(input: &str) -> DocumentStoreResult<Self> {
        let mut config: Self = toml::from_str(input)
            .map_err(|e| DocumentStoreError::Initialization(format!("invalid configuration: {e}")))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Reads and parses a TOML file, then applies environment overrides.
    pub fn from_path(path: impl AsRef<Path>) -> DocumentStoreResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| {
            DocumentStoreError::Initialization(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&input)
    }

    /// Loads the file named by `DOCSTORE_CONFIG_PATH`, or the defaults when it is unset.
    /// Environment overrides apply either way.
    pub fn from_env() -> DocumentStoreResult<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_path(path),
            Err(_) => {
                let mut config = Self::default();
                config.apply_overrides(|key| std::env::var(key).ok());
                Ok(config)
            }
        }
    }

    /// Applies overrides looked up through `lookup`. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key| lookup(key).filter(|value: &String| !value.is_empty());

        if let Some(host) = lookup(API_HOST_ENV) {
            self.api_host = host;
        }
        if let (StoreConfig::Mongodb { dsn, .. }, Some(value)) = (&mut self.store, lookup(MONGO_DSN_ENV)) {
            *dsn = value;
        }
    }
}

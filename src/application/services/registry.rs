//! Registry persistence service
//!
//! Loads the ABL from the local cache or the remote source, and writes it back.

use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{DomainError, Registry};
use crate::infrastructure::traits::{FileSystem, HttpClient};

/// Service for moving the ABL between the remote source, the cache file and memory.
pub struct RegistryService {
    fs: Arc<dyn FileSystem>,
    http: Arc<dyn HttpClient>,
    settings: Arc<Settings>,
}

impl RegistryService {
    /// Create a new registry service.
    pub fn new(fs: Arc<dyn FileSystem>, http: Arc<dyn HttpClient>, settings: Arc<Settings>) -> Self {
        Self { fs, http, settings }
    }

    /// Location of the local cache file.
    pub fn cache_path(&self) -> &Path {
        &self.settings.cache_path
    }

    /// Download and decode the most recent ABL.
    pub fn fetch(&self) -> ApplicationResult<Registry> {
        let url = &self.settings.remote_url;
        info!("fetching ABL from {}", url);
        let body = self.http.get(url)?;
        let registry = decode(&body, "remote")?;
        debug!(
            "fetch: {} schema, {} entries",
            registry.schema(),
            registry.count()
        );
        Ok(registry)
    }

    /// Decode the cached ABL, falling back to [`fetch`](Self::fetch) when there is no cache.
    ///
    /// Never writes the cache.
    pub fn load_or_fetch(&self) -> ApplicationResult<Registry> {
        let path = self.cache_path();
        let content = match self.fs.read_to_string(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("load_or_fetch: no cache at {}", path.display());
                return self.fetch();
            }
            read => read.with_path_context("read ABL", path)?,
        };
        debug!("load_or_fetch: using cache {}", path.display());
        decode(&content, "local")
    }

    /// Overwrite the cache file with `registry` as indented JSON.
    pub fn persist(&self, registry: &Registry) -> ApplicationResult<()> {
        let path = self.cache_path();
        let mut json = serde_json::to_string_pretty(registry).map_err(ApplicationError::Encode)?;
        json.push('\n');
        self.fs
            .ensure_parent(path)
            .with_path_context("create cache directory", path)?;
        self.fs.write(path, &json).with_path_context("write ABL", path)?;
        debug!("persist: wrote {} bytes to {}", json.len(), path.display());
        Ok(())
    }

    /// Publish the local ABL to the remote source of truth.
    pub fn push(&self, _registry: &Registry) -> ApplicationResult<()> {
        Err(ApplicationError::Unsupported(format!(
            "pushing the ABL to {}",
            self.settings.remote_url
        )))
    }

    /// Load, apply one edit, persist.
    ///
    /// A failing edit returns before anything is written.
    pub fn apply<T, F>(&self, edit: F) -> ApplicationResult<T>
    where
        F: FnOnce(&mut Registry) -> Result<T, DomainError>,
    {
        let mut registry = self.load_or_fetch()?;
        let outcome = edit(&mut registry)?;
        self.persist(&registry)?;
        Ok(outcome)
    }
}

fn decode(content: &str, origin: &str) -> ApplicationResult<Registry> {
    serde_json::from_str(content).map_err(|source| ApplicationError::Decode {
        origin: origin.to_string(),
        source,
    })
}

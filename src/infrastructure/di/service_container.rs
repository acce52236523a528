//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::RegistryService;
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, HttpClient, RealFileSystem, ReqwestClient};
use crate::infrastructure::InfraResult;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Load, fetch and persist the ABL
    pub registry: RegistryService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        Ok(Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(ReqwestClient::new()?),
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let settings = Arc::new(settings);
        let registry = RegistryService::new(fs.clone(), http, settings.clone());

        Self {
            settings,
            fs,
            registry,
        }
    }
}

//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mable/mable.toml`
//! 3. Local config: `<project_dir>/.mable.toml`
//! 4. Environment variables: `MABLE_*` prefix
//!
//! Command line flags are applied on top by the CLI layer.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Canonical location of the published ABL.
pub const DEFAULT_REMOTE_URL: &str =
    "https://raw.githubusercontent.com/openstax/content-manager-approved-books/master/approved-book-list.json";

/// File name of the local ABL copy.
pub const DEFAULT_CACHE_FILE: &str = "approved-book-list.json";

/// Unified configuration for mable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Local ABL copy, relative paths resolve against the project directory
    pub cache_path: PathBuf,
    /// Where `update` and first runs download the ABL from
    pub remote_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            remote_url: DEFAULT_REMOTE_URL.to_string(),
        }
    }
}

/// Get the XDG config directory for mable.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mable").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mable.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".mable.toml")
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Directory holding `.mable.toml` and the cache (default: cwd)
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default(
                "cache_path",
                defaults.cache_path.to_string_lossy().to_string(),
            )
            .map_err(config_err)?
            .set_default("remote_url", defaults.remote_url)
            .map_err(config_err)?;

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).format(FileFormat::Toml));
            }
        }

        let project_dir = project_dir.unwrap_or(Path::new("."));
        let local_path = local_config_path(project_dir);
        if local_path.exists() {
            builder = builder.add_source(File::from(local_path).format(FileFormat::Toml));
        }

        builder = builder.add_source(Environment::with_prefix("MABLE").separator("__"));

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;
        settings.expand_paths();
        settings.anchor_cache(project_dir);

        Ok(settings)
    }

    /// Apply command line overrides.
    pub fn with_overrides(mut self, cache_path: Option<&Path>, remote_url: Option<&str>) -> Self {
        if let Some(path) = cache_path {
            self.cache_path = path.to_path_buf();
            self.expand_paths();
        }
        if let Some(url) = remote_url {
            self.remote_url = url.to_string();
        }
        self
    }

    /// Expand `~`, `$VAR` and `${VAR}` in the cache path.
    fn expand_paths(&mut self) {
        let raw = self.cache_path.to_string_lossy();
        let expanded = shellexpand::full(raw.as_ref())
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        self.cache_path = PathBuf::from(expanded);
    }

    fn anchor_cache(&mut self, project_dir: &Path) {
        if self.cache_path.is_relative() && project_dir != Path::new(".") {
            self.cache_path = project_dir.join(&self.cache_path);
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        format!(
            r#"# mable configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/mable/mable.toml
#   Local:  <project_dir>/.mable.toml
#   Env:    MABLE_* environment variables (MABLE_CACHE_PATH, MABLE_REMOTE_URL)
#   Flags:  --cache, --url

# Local copy of the ABL, relative to the project directory
# cache_path = "{DEFAULT_CACHE_FILE}"

# Source of the published ABL
# remote_url = "{DEFAULT_REMOTE_URL}"
"#
        )
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_default_settings_when_created_then_points_at_published_abl() {
        let settings = Settings::default();
        assert_eq!(settings.cache_path, PathBuf::from("approved-book-list.json"));
        assert!(settings.remote_url.starts_with("https://"));
    }

    #[test]
    fn given_tilde_in_cache_path_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            cache_path: PathBuf::from("~/abl/approved-book-list.json"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let path = settings.cache_path.to_string_lossy();
        assert!(path.starts_with(&home), "cache_path should start with home: {}", path);
        assert!(!path.contains('~'));
    }

    #[test]
    fn given_overrides_when_applied_then_replace_loaded_values() {
        let settings = Settings::default()
            .with_overrides(Some(Path::new("/tmp/abl.json")), Some("http://mirror/abl.json"));
        assert_eq!(settings.cache_path, PathBuf::from("/tmp/abl.json"));
        assert_eq!(settings.remote_url, "http://mirror/abl.json");
    }

    #[test]
    fn given_settings_when_rendering_toml_then_contains_both_keys() {
        let toml = Settings::default().to_toml().unwrap();
        assert!(toml.contains("cache_path"));
        assert!(toml.contains("remote_url"));
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let parsed: Settings = toml::from_str(&Settings::template()).unwrap();
        assert_eq!(parsed, Settings::default());
    }
}

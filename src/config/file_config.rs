//! Writing configuration files. Reading goes through
//! [`load_config`](super::load_config), which also layers environment
//! overrides.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! token = "your-api-token"
//! base_url = "https://lumendatabase.org"
//!
//! [cache]
//! enabled = true
//! directory = "~/.cache/lumen-client"
//!
//! [rate_limits]
//! interval_ms = 2000
//!
//! [pagination]
//! concurrent = true
//! space_launches = true
//!
//! [logging]
//! level = "warn"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{ApiConfig, CacheConfig, LoggingConfig, PaginationConfig, RateLimitConfig};

/// Configuration file structure
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Save configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }

    /// Template written by `lumen config init`. The token is left out so
    /// it is never persisted by accident.
    pub fn template() -> Self {
        let mut file = Self::default();
        file.api.token = None;
        file
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use tempfile::tempdir;

    #[test]
    fn test_saved_file_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut file = ConfigFile::template();
        file.rate_limits.interval_ms = 1500;
        file.pagination.space_launches = false;
        file.logging.format = Some("json".to_string());

        file.save(&path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.rate_limits.interval_ms, 1500);
        assert!(!loaded.pagination.space_launches);
        assert!(loaded.logging.is_json());
        assert_eq!(loaded.api.base_url, "https://lumendatabase.org");
    }

    #[test]
    fn test_template_omits_token() {
        let content = toml::to_string_pretty(&ConfigFile::template()).unwrap();
        assert!(!content.contains("token"));
    }

    #[test]
    fn test_save_into_unwritable_path_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        let result = ConfigFile::template().save(&blocker.join("config.toml"));
        assert!(matches!(result, Err(ConfigFileError::Io(_))));
    }
}

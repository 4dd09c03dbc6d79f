//! User configuration management
//!
//! Configuration is stored in TOML format at `~/.ethpm/config.toml`. Every section is
//! optional; a missing file yields the defaults.
//!
//! ```toml
//! [ipfs]
//! backend = "local"
//!
//! [github]
//! token = "ghp_..."
//!
//! [registry]
//! index_path = "~/.ethpm/registry.json"
//!
//! [install]
//! verify_sources = true
//! max_depth = 100
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use ethpm::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//!
//! println!("IPFS backend: {:?}", config.ipfs.backend);
//! println!("Registry index: {}", config.registry.resolved_index_path().display());
//! # Ok(())
//! # }
//! ```

use crate::installer::DEFAULT_MAX_DEPTH;
use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// User configuration file (`~/.ethpm/config.toml`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// IPFS gateway settings
    #[serde(default)]
    pub ipfs: IpfsConfig,

    /// GitHub blob API settings
    #[serde(default)]
    pub github: GithubConfig,

    /// Registry release index settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Installer settings
    #[serde(default)]
    pub install: InstallConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpfsBackendKind {
    #[default]
    Infura,
    Local,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpfsConfig {
    #[serde(default)]
    pub backend: IpfsBackendKind,

    /// Explicit IPFS HTTP API base URL, overriding `backend`
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// API token, raises the unauthenticated rate limit
    #[serde(default)]
    pub token: Option<String>,
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Release index consulted for registry URIs
    #[serde(default = "default_index_path")]
    pub index_path: String,
}

fn default_index_path() -> String {
    "~/.ethpm/registry.json".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
        }
    }
}

impl RegistryConfig {
    /// `index_path` with a leading `~` expanded
    pub fn resolved_index_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.index_path).as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallConfig {
    /// Hash-check content-addressed sources before writing them
    #[serde(default = "default_verify_sources")]
    pub verify_sources: bool,

    /// Maximum build dependency depth to stop registry cycles (default: 100)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_verify_sources() -> bool {
    true
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            verify_sources: default_verify_sources(),
            max_depth: default_max_depth(),
        }
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// Uses ETHPM_CONFIG_DIR if set, otherwise ~/.ethpm/config.toml
    pub fn default_path() -> Result<PathBuf> {
        // Check for custom config directory (useful for testing)
        if let Ok(config_dir) = std::env::var("ETHPM_CONFIG_DIR") {
            return Ok(PathBuf::from(config_dir).join("config.toml"));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Other("Could not find home directory".to_string()))?;

        Ok(home.join(".ethpm").join("config.toml"))
    }

    /// Load config from the default path, or defaults if it doesn't exist
    ///
    /// Environment variable overrides:
    /// - `GITHUB_TOKEN`: Overrides `github.token`
    /// - `ETHPM_IPFS_URL`: Overrides `ipfs.url`
    /// - `ETHPM_CONFIG_DIR`: Overrides the config directory location
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Self::default_path()?)?;

        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                config.github.token = Some(token);
            }
        }

        if let Ok(url) = std::env::var("ETHPM_IPFS_URL") {
            if !url.is_empty() {
                config.ipfs.url = Some(url);
            }
        }

        Ok(config)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ipfs.backend, IpfsBackendKind::Infura);
        assert!(config.ipfs.url.is_none());
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert!(config.install.verify_sources);
        assert_eq!(config.install.max_depth, 100);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config.registry.index_path, "~/.ethpm/registry.json");
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[ipfs]\nbackend = \"local\"\n\n[install]\nmax_depth = 8\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.ipfs.backend, IpfsBackendKind::Local);
        assert_eq!(config.install.max_depth, 8);
        assert!(config.install.verify_sources);
        assert_eq!(config.github.api_url, "https://api.github.com");
    }

    #[test]
    fn test_load_rejects_unknown_backend() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[ipfs]\nbackend = \"pinata\"\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::TomlDe(_))));
    }

    #[test]
    fn test_resolved_index_path() {
        let registry = RegistryConfig {
            index_path: "/srv/ethpm/registry.json".to_string(),
        };
        assert_eq!(
            registry.resolved_index_path(),
            PathBuf::from("/srv/ethpm/registry.json")
        );

        let home = dirs::home_dir().unwrap();
        assert_eq!(
            RegistryConfig::default().resolved_index_path(),
            home.join(".ethpm/registry.json")
        );
    }
}

//! Configuration management for Trellis.
//!
//! Parses `trellis.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `storage.snapshot`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override snapshot file path.
    pub snapshot: Option<PathBuf>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override the redirect hop bound.
    pub max_hops: Option<u32>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "trellis.toml";

/// Default snapshot location relative to the project directory.
const DEFAULT_SNAPSHOT: &str = ".trellis/site.json";

/// Largest accepted `redirects.max_hops`.
const MAX_HOPS_LIMIT: u32 = 16;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration (paths are relative strings from TOML).
    storage: StorageConfigRaw,
    /// Fragment cache configuration.
    pub cache: CacheConfig,
    /// Redirect ledger configuration.
    pub redirects: RedirectsConfig,

    /// Resolved storage configuration (set after loading).
    #[serde(skip)]
    pub storage_resolved: StorageConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw storage configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StorageConfigRaw {
    snapshot: Option<String>,
}

/// Resolved storage configuration with absolute paths.
#[derive(Debug, Default)]
pub struct StorageConfig {
    /// JSON snapshot file holding pages, menus and redirects.
    pub snapshot_path: PathBuf,
}

/// Fragment cache configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether menu caching is enabled.
    pub enabled: bool,
    /// Expiry for cached menu item listings, in seconds.
    pub menu_ttl_secs: u64,
}

impl CacheConfig {
    /// Expiry for cached menu item listings.
    #[must_use]
    pub fn menu_ttl(&self) -> Duration {
        Duration::from_secs(self.menu_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            menu_ttl_secs: 3600,
        }
    }
}

/// Redirect ledger configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RedirectsConfig {
    /// Status code recorded for redirects created by page renames.
    pub default_status: u16,
    /// Maximum number of chained redirects followed on resolution.
    pub max_hops: u32,
}

impl Default for RedirectsConfig {
    fn default() -> Self {
        Self {
            default_status: 301,
            max_hops: 2,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`storage.snapshot`").
        field: String,
        /// Error message (e.g., "${`TRELLIS_DATA`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `trellis.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(snapshot) = &settings.snapshot {
            self.storage_resolved.snapshot_path.clone_from(snapshot);
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.cache.enabled = cache_enabled;
        }
        if let Some(max_hops) = settings.max_hops {
            self.redirects.max_hops = max_hops;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            storage: StorageConfigRaw::default(),
            cache: CacheConfig::default(),
            redirects: RedirectsConfig::default(),
            storage_resolved: StorageConfig {
                snapshot_path: base.join(DEFAULT_SNAPSHOT),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_cache()?;
        self.validate_redirects()?;
        Ok(())
    }

    fn validate_cache(&self) -> Result<(), ConfigError> {
        if self.cache.menu_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "cache.menu_ttl_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_redirects(&self) -> Result<(), ConfigError> {
        if !(300..=399).contains(&self.redirects.default_status) {
            return Err(ConfigError::Validation(format!(
                "redirects.default_status must be a 3xx code, got {}",
                self.redirects.default_status
            )));
        }
        if self.redirects.max_hops == 0 {
            return Err(ConfigError::Validation(
                "redirects.max_hops must be greater than 0".to_owned(),
            ));
        }
        if self.redirects.max_hops > MAX_HOPS_LIMIT {
            return Err(ConfigError::Validation(format!(
                "redirects.max_hops cannot exceed {MAX_HOPS_LIMIT}"
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref snapshot) = self.storage.snapshot {
            require_non_empty(snapshot, "storage.snapshot")?;
            self.storage.snapshot = Some(expand::expand_env(snapshot, "storage.snapshot")?);
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let snapshot = self.storage.snapshot.as_deref().unwrap_or(DEFAULT_SNAPSHOT);
        self.storage_resolved = StorageConfig {
            snapshot_path: config_dir.join(snapshot),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(
            config.storage_resolved.snapshot_path,
            PathBuf::from("/test/.trellis/site.json")
        );
        assert!(config.cache.enabled);
        assert_eq!(config.cache.menu_ttl(), Duration::from_secs(3600));
        assert_eq!(config.redirects.default_status, 301);
        assert_eq!(config.redirects.max_hops, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.cache.enabled);
        assert_eq!(config.redirects.max_hops, 2);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[storage]
snapshot = "data/site.json"

[cache]
enabled = false
menu_ttl_secs = 60

[redirects]
default_status = 302
max_hops = 5
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.storage_resolved.snapshot_path,
            PathBuf::from("/project/data/site.json")
        );
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.menu_ttl_secs, 60);
        assert_eq!(config.redirects.default_status, 302);
        assert_eq!(config.redirects.max_hops, 5);
    }

    #[test]
    fn test_non_redirect_status_rejected() {
        let toml = r"
[redirects]
default_status = 200
";
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();

        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        assert!(err.to_string().contains("default_status"));
    }

    #[test]
    fn test_zero_hops_rejected() {
        let toml = r"
[redirects]
max_hops = 0
";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_excessive_hops_rejected() {
        let toml = r"
[redirects]
max_hops = 100
";
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_hops"));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let toml = r"
[cache]
menu_ttl_secs = 0
";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            snapshot: Some(PathBuf::from("/custom/site.json")),
            cache_enabled: Some(false),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.storage_resolved.snapshot_path,
            PathBuf::from("/custom/site.json")
        );
        assert!(!config.cache.enabled);
        assert_eq!(config.redirects.max_hops, 2); // Unchanged
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/trellis.toml")), None);

        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_file_resolves_relative_to_config_dir() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            "[storage]\nsnapshot = \"${TRELLIS_TEST_SURELY_UNSET_VAR:-state}/site.json\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(
            config.storage_resolved.snapshot_path,
            temp.path().join("state/site.json")
        );
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_rejects_invalid_cli_override() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();
        let overrides = CliSettings {
            max_hops: Some(0),
            ..Default::default()
        };

        let result = Config::load(Some(&path), Some(&overrides));

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}

//! Hierarchical configuration loader with precedence
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. Config file (~/.settle/settle.yaml)
//! 3. Environment variables (SETTLE_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::{RetryStrategy, RuntimeConfig};
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde_yaml_ng::Value;
use std::env;
use std::fs;
use std::str::FromStr;

/// File name looked up inside the config directory
pub const CONFIG_FILE_NAME: &str = "settle.yaml";

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a loader rooted at the standard config directory (~/.settle)
    pub fn new() -> Result<Self> {
        let config_dir = Self::default_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// The standard config directory. Not created if missing.
    pub fn default_config_dir() -> Result<Utf8PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?;
        let home = Utf8PathBuf::from_path_buf(home)
            .map_err(|p| Error::invalid_config(format!("Home directory is not UTF-8: {}", p.display())))?;

        Ok(home.join(".settle"))
    }

    /// Load runtime configuration with hierarchical precedence
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        // Start with embedded defaults
        let mut merged = Self::load_embedded_value("runtime-defaults.yaml")?;

        // Keys present in the config file override the defaults one by one
        let config_path = self.config_file();
        if config_path.exists() {
            tracing::debug!(path = %config_path, "loading config file");
            let overlay = Self::load_yaml_value(&config_path)?;
            merge_values(&mut merged, overlay);
        }

        let config: RuntimeConfig = serde_yaml_ng::from_value(merged)
            .map_err(|e| Error::invalid_config(format!("Failed to parse runtime config: {}", e)))?;

        let config = Self::apply_env_overrides(config)?;
        config.validate()?;

        Ok(config)
    }

    /// Load an embedded configuration file
    fn load_embedded_value(filename: &str) -> Result<Value> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })
    }

    /// Load a YAML file and parse it
    fn load_yaml_value(path: &Utf8Path) -> Result<Value> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;

        // An empty file parses as null
        Ok(if value.is_null() {
            Value::Mapping(Default::default())
        } else {
            value
        })
    }

    /// Apply environment variable overrides to runtime config
    fn apply_env_overrides(mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        // Condition checker budget
        if let Ok(val) = env::var("SETTLE_CHECK_MAX_ATTEMPTS") {
            config.check.max_attempts = val.parse().map_err(|_| {
                Error::invalid_config("SETTLE_CHECK_MAX_ATTEMPTS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("SETTLE_CHECK_DELAY_MS") {
            config.check.delay_ms = val.parse().map_err(|_| {
                Error::invalid_config("SETTLE_CHECK_DELAY_MS must be a valid number")
            })?;
        }

        // Default retry policy
        let retry = &mut config.retry_policies.default;

        if let Ok(val) = env::var("SETTLE_RETRY_MAX_ATTEMPTS") {
            retry.max_attempts = val.parse().map_err(|_| {
                Error::invalid_config("SETTLE_RETRY_MAX_ATTEMPTS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("SETTLE_RETRY_INITIAL_DELAY_MS") {
            retry.initial_delay_ms = val.parse().map_err(|_| {
                Error::invalid_config("SETTLE_RETRY_INITIAL_DELAY_MS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("SETTLE_RETRY_MAX_DELAY_MS") {
            retry.max_delay_ms = val.parse().map_err(|_| {
                Error::invalid_config("SETTLE_RETRY_MAX_DELAY_MS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("SETTLE_RETRY_STRATEGY") {
            retry.strategy = RetryStrategy::from_str(&val)?;
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Path of the user config file, whether or not it exists
    pub fn config_file(&self) -> Utf8PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

/// Deep-merge `overlay` into `base`: mappings merge key by key, anything else is replaced
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn create_temp_loader() -> (HierarchicalConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir =
            Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).expect("Invalid UTF-8 path");
        let loader = HierarchicalConfigLoader::with_dir(config_dir);
        (loader, temp_dir)
    }

    #[test]
    #[serial]
    fn test_load_runtime_config_defaults() {
        let (loader, _temp) = create_temp_loader();
        let config = loader.load_runtime_config().unwrap();

        assert_eq!(config.check.max_attempts, 10);
        assert_eq!(config.check.delay_ms, 1000);
        assert_eq!(config.retry_policies.default.max_attempts, 3);
        assert_eq!(
            config.retry_policies.for_operation("search-job").strategy,
            RetryStrategy::FixedDelay
        );
    }

    #[test]
    #[serial]
    fn test_file_overrides_single_keys() {
        let (loader, _temp) = create_temp_loader();

        let config_content = r#"
check:
  delay-ms: 250
retry-policies:
  operations:
    plugin-install:
      max-attempts: 6
"#;
        fs::write(loader.config_file(), config_content).unwrap();

        let config = loader.load_runtime_config().unwrap();
        assert_eq!(config.check.delay_ms, 250);
        // Untouched keys keep their embedded values
        assert_eq!(config.check.max_attempts, 10);

        let install = config.retry_policies.for_operation("plugin-install");
        assert_eq!(install.max_attempts, 6);
        assert_eq!(install.initial_delay_ms, 2000);
        assert!(config.retry_policies.operations.contains_key("search-job"));
    }

    #[test]
    #[serial]
    fn test_empty_file_is_ignored() {
        let (loader, _temp) = create_temp_loader();
        fs::write(loader.config_file(), "").unwrap();

        let config = loader.load_runtime_config().unwrap();
        assert_eq!(config.check.max_attempts, 10);
    }

    #[test]
    #[serial]
    fn test_invalid_file_policy_is_rejected() {
        let (loader, _temp) = create_temp_loader();
        fs::write(loader.config_file(), "check:\n  max-attempts: 0\n").unwrap();

        let err = loader.load_runtime_config().unwrap_err();
        assert!(matches!(err, Error::InvalidPolicy { ref name, .. } if name == "check"));
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_reported() {
        let (loader, _temp) = create_temp_loader();
        fs::write(loader.config_file(), "check: [unclosed").unwrap();

        let err = loader.load_runtime_config().unwrap_err();
        assert!(err.to_string().contains("settle.yaml"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("SETTLE_CHECK_MAX_ATTEMPTS", "4");
        env::set_var("SETTLE_CHECK_DELAY_MS", "50");
        env::set_var("SETTLE_RETRY_MAX_ATTEMPTS", "7");
        env::set_var("SETTLE_RETRY_STRATEGY", "linear");

        let config = loader.load_runtime_config().unwrap();
        assert_eq!(config.check.max_attempts, 4);
        assert_eq!(config.check.delay_ms, 50);
        assert_eq!(config.retry_policies.default.max_attempts, 7);
        assert_eq!(
            config.retry_policies.default.strategy,
            RetryStrategy::LinearBackoff
        );

        env::remove_var("SETTLE_CHECK_MAX_ATTEMPTS");
        env::remove_var("SETTLE_CHECK_DELAY_MS");
        env::remove_var("SETTLE_RETRY_MAX_ATTEMPTS");
        env::remove_var("SETTLE_RETRY_STRATEGY");
    }

    #[test]
    #[serial]
    fn test_env_override_must_be_numeric() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("SETTLE_RETRY_MAX_DELAY_MS", "soon");
        let result = loader.load_runtime_config();
        env::remove_var("SETTLE_RETRY_MAX_DELAY_MS");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("SETTLE_RETRY_MAX_DELAY_MS"));
    }

    #[test]
    fn test_merge_values_replaces_scalars_and_keeps_siblings() {
        let mut base: Value = serde_yaml_ng::from_str("a: 1\nb:\n  c: 2\n  d: 3\n").unwrap();
        let overlay: Value = serde_yaml_ng::from_str("b:\n  d: 4\ne: 5\n").unwrap();

        merge_values(&mut base, overlay);

        let expected: Value = serde_yaml_ng::from_str("a: 1\nb:\n  c: 2\n  d: 4\ne: 5\n").unwrap();
        assert_eq!(base, expected);
    }

    #[test]
    fn test_config_dir_is_not_created() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = Utf8PathBuf::from_path_buf(temp_dir.path().join("new_config"))
            .expect("Invalid UTF-8 path");

        let loader = HierarchicalConfigLoader::with_dir(config_dir.clone());
        assert_eq!(loader.config_dir(), config_dir);
        assert_eq!(loader.config_file(), config_dir.join("settle.yaml"));
        assert!(!config_dir.exists());
    }
}

//! Configuration file resolution and TOML loading
//!
//! EchoNav keeps configuration minimal: every setting has a built-in default
//! defined in code, and an optional TOML file may override any of them.
//!
//! # Config File Priority
//!
//! 1. Environment variable (e.g. `ECHONAV_CONFIG`)
//! 2. User config dir: `<config_dir>/echonav/config.toml`
//! 3. System config: `/etc/echonav/config.toml` (Linux only)
//! 4. None found: caller falls back to built-in defaults

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ECHONAV_CONFIG";

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locate the configuration file following the priority order above.
///
/// Returns `Ok(None)` when no file exists anywhere; an explicit environment
/// variable pointing at a missing file is an error.
pub fn resolve_config_path(env_var_name: &str) -> Result<Option<PathBuf>> {
    if let Ok(path) = std::env::var(env_var_name) {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(Error::Config(format!(
                "{} points at missing file: {}",
                env_var_name,
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("echonav").join("config.toml")) {
        if user_config.exists() {
            return Ok(Some(user_config));
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/echonav/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }
    }

    debug!("No EchoNav config file found, using built-in defaults");
    Ok(None)
}

/// Read and deserialize a TOML file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let value = toml::from_str(&content)?;
    debug!("Loaded configuration from {}", path.display());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"probe\"").unwrap();

        let sample: Sample = load_toml(file.path()).unwrap();
        assert_eq!(sample.name, "probe");
        assert_eq!(sample.logging.level, "info");
    }

    #[test]
    fn test_load_toml_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = ").unwrap();

        let result: Result<Sample> = load_toml(file.path());
        assert!(matches!(result, Err(Error::TomlParse(_))));
    }

    #[test]
    fn test_load_toml_missing_file() {
        let result: Result<Sample> = load_toml(Path::new("/nonexistent/echonav.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    #[serial]
    fn test_resolve_from_env_var() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::env::set_var("ECHONAV_TEST_CONFIG", file.path());

        let resolved = resolve_config_path("ECHONAV_TEST_CONFIG").unwrap();
        assert_eq!(resolved.as_deref(), Some(file.path()));

        std::env::remove_var("ECHONAV_TEST_CONFIG");
    }

    #[test]
    #[serial]
    fn test_resolve_env_var_missing_file_is_error() {
        std::env::set_var("ECHONAV_TEST_CONFIG", "/nonexistent/echonav.toml");

        let resolved = resolve_config_path("ECHONAV_TEST_CONFIG");
        assert!(matches!(resolved, Err(Error::Config(_))));

        std::env::remove_var("ECHONAV_TEST_CONFIG");
    }
}

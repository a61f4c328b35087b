use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub validator: ValidatorConfig,
    pub attributes: AttributesConfig,
}

/// How to start the external validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Seconds to wait for each validator response; 0 waits forever.
    pub timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            command: "python3".to_string(),
            args: vec!["scripts/vupreprocessor.py".to_string()],
            timeout_secs: 60,
        }
    }
}

impl ValidatorConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Attribute name prefixes that mark versions and extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributesConfig {
    pub version_prefix: String,
    pub extension_prefix: String,
}

impl Default for AttributesConfig {
    fn default() -> Self {
        Self {
            version_prefix: "vk_version_".to_string(),
            extension_prefix: "vk_".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the validator invocation
        config.validator.command = Self::expand(&config.validator.command);
        config.validator.args = config.validator.args.iter().map(|a| Self::expand(a)).collect();

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Loads from `path` if given, else from the default location, falling
    /// back to defaults when no file exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let loaded = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::load()?,
        };
        Ok(loaded.unwrap_or_default())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/vu-formatter");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand(value: &str) -> String {
        match shellexpand::full(value) {
            Ok(expanded) => expanded.into_owned(),
            Err(_) => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/vu-formatter/config.toml"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.validator.command, "python3");
        assert_eq!(config.validator.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.attributes.version_prefix, "vk_version_");
        assert_eq!(config.attributes.extension_prefix, "vk_");
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let validator = ValidatorConfig {
            timeout_secs: 0,
            ..ValidatorConfig::default()
        };
        assert_eq!(validator.timeout(), None);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[validator]
timeout_secs = 5
"#,
        )
        .unwrap();

        assert_eq!(config.validator.timeout_secs, 5);
        assert_eq!(config.validator.command, "python3");
        assert_eq!(config.attributes, AttributesConfig::default());
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_or_default_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_or_default(Some(&temp_dir.path().join("missing.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[validator\ncommand = ").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested/config.toml");
        let test_config = Config {
            validator: ValidatorConfig {
                command: "/usr/bin/python3".to_string(),
                args: vec!["/opt/spec/scripts/vupreprocessor.py".to_string()],
                timeout_secs: 30,
            },
            attributes: AttributesConfig::default(),
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_validator_paths_are_expanded() {
        unsafe {
            env::set_var("VU_SPEC_ROOT", "/custom/spec");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            r#"
[validator]
command = "~/bin/validator"
args = ["$VU_SPEC_ROOT/scripts/vupreprocessor.py", "--strict"]
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert!(!config.validator.command.starts_with('~'));
        assert!(config.validator.command.ends_with("bin/validator"));
        assert_eq!(
            config.validator.args,
            vec!["/custom/spec/scripts/vupreprocessor.py", "--strict"]
        );

        unsafe {
            env::remove_var("VU_SPEC_ROOT");
        }
    }

    #[test]
    fn test_unknown_variable_is_left_alone() {
        assert_eq!(
            Config::expand("$VU_FORMATTER_SURELY_UNSET_12345/x"),
            "$VU_FORMATTER_SURELY_UNSET_12345/x"
        );
    }
}

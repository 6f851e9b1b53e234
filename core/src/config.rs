//! Layered configuration for the `uvo` tooling
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. an optional TOML file: the explicit path, else `UVO_CONFIG_PATH`,
//!    else `uvo.toml` in the working directory
//! 3. `UVO__SECTION__KEY` environment variables (`.env` is loaded first)

use anyhow::{Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "uvo.toml";
const CONFIG_PATH_VAR: &str = "UVO_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// JSON array used as the errors binding when `--errors` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors_path: Option<PathBuf>,
    /// JSON array used as the injections binding when `--injections` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injections_path: Option<PathBuf>,
    /// Pretty-print JSON output
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_level() -> String {
    "warn".to_string()
}

fn default_pretty() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            errors_path: None,
            injections_path: None,
            pretty: default_pretty(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load using the default search path and the environment
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    use_env: Option<bool>,
}

impl ConfigBuilder {
    /// Explicit config file; it must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Whether `.env` and `UVO__*` variables are read (on by default)
    pub fn environment(mut self, enabled: bool) -> Self {
        self.use_env = Some(enabled);
        self
    }

    pub fn build(self) -> Result<Config> {
        let use_env = self.use_env.unwrap_or(true);
        if use_env {
            dotenvy::dotenv().ok();
        }

        let explicit = self.config_path.or_else(|| {
            use_env
                .then(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from))
                .flatten()
        });

        let defaults = Config::default();
        let mut builder = config::Config::builder()
            .set_default("logging.level", defaults.logging.level)?
            .set_default("validation.pretty", defaults.validation.pretty)?;

        let (path, required) = match &explicit {
            Some(path) => (path.as_path(), true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(required));

        if use_env {
            builder = builder.add_source(
                Environment::with_prefix("UVO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: Config = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .with_context(|| match &explicit {
                Some(path) => format!("Failed to load configuration from {}", path.display()),
                None => "Failed to load configuration".to_string(),
            })?;

        tracing::debug!(level = %config.logging.level, "configuration loaded");
        Ok(config)
    }
}

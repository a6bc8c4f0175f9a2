//! Application configuration
//!
//! Loaded once at startup from TOML and passed by reference to every
//! command. Resolution of the file path:
//!
//! 1. `--config PATH`
//! 2. `CONFIG_FILE` environment variable
//! 3. `./config.toml`, silently falling back to defaults when absent
//!
//! `BUDGET_YEAR` and `PROVINCE_CODE` override the `[default]` section.

use hdc_codegen::{TemplateStore, DEFAULT_TEMPLATE};
use hdc_runner::{ProcessExecutor, DEFAULT_INTERPRETER};
use hdc_store::{FiscalYear, PartitionedStore, StoreConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_FILE_ENV: &str = "CONFIG_FILE";
/// Environment variable overriding the fiscal year
pub const BUDGET_YEAR_ENV: &str = "BUDGET_YEAR";
/// Environment variable overriding the province code
pub const PROVINCE_CODE_ENV: &str = "PROVINCE_CODE";
/// Configuration file used when none is named
pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for [`AppConfig`]
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Environment override has an unusable value
    #[error("invalid {name}='{value}': {message}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        message: String,
    },
}

/// Whole application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Partition storage
    pub storage: StoreConfig,
    /// Execution context shared with generated scripts
    pub default: DefaultsConfig,
    /// Script generation
    pub codegen: CodegenConfig,
    /// Script execution
    pub runner: RunnerConfig,
    /// File this configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// `[default]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Province (region) code
    pub province_code: Option<String>,
    /// Fiscal year
    pub budget_year: Option<FiscalYear>,
}

/// `[codegen]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Directory searched for `{name}.py` templates before the built-ins
    pub template_dir: Option<PathBuf>,
    /// Template used when none is requested or the requested one is missing
    pub default_template: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            template_dir: None,
            default_template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// `[runner]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Interpreter for generated scripts
    pub interpreter: PathBuf,
    /// Workers used when `-w` is not given
    pub workers: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            workers: 1,
        }
    }
}

impl AppConfig {
    /// Parse TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` attributed to `path`.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration and apply environment overrides
    ///
    /// `env` looks up environment variables; pass
    /// `|name| std::env::var(name).ok()` in production.
    ///
    /// # Errors
    /// A named file that is missing or malformed, or a malformed override.
    pub fn load(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| env(CONFIG_FILE_ENV).filter(|v| !v.is_empty()).map(PathBuf::from));

        let mut config = match named {
            Some(path) => Self::read(&path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.is_file() {
                    Self::read(path)?
                } else {
                    tracing::debug!("no config file, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_env(env)?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text, path)?;
        config.source = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Apply `BUDGET_YEAR` / `PROVINCE_CODE` overrides; empty values are ignored
    ///
    /// # Errors
    /// `ConfigError::InvalidEnv` for a fiscal year that does not parse.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = env(BUDGET_YEAR_ENV).filter(|v| !v.trim().is_empty()) {
            let year = value.parse().map_err(|e: hdc_store::StoreError| ConfigError::InvalidEnv {
                name: BUDGET_YEAR_ENV,
                value: value.clone(),
                message: e.to_string(),
            })?;
            self.default.budget_year = Some(year);
        }
        if let Some(value) = env(PROVINCE_CODE_ENV).filter(|v| !v.trim().is_empty()) {
            self.default.province_code = Some(value);
        }
        Ok(())
    }

    /// Template store honoring `[codegen]`
    #[must_use]
    pub fn template_store(&self) -> TemplateStore {
        let store = match &self.codegen.template_dir {
            Some(dir) => TemplateStore::with_dir(dir),
            None => TemplateStore::builtin(),
        };
        store.with_default(&self.codegen.default_template)
    }

    /// Partitioned store honoring `[storage]`
    #[must_use]
    pub fn partitioned_store(&self) -> PartitionedStore {
        PartitionedStore::new(&self.storage)
    }

    /// Executor for generated scripts
    ///
    /// Children receive the resolved config path, fiscal year and province
    /// code so they run in the same context as this process.
    #[must_use]
    pub fn executor(&self) -> ProcessExecutor {
        let mut executor = ProcessExecutor::new(&self.runner.interpreter);
        if let Some(path) = &self.source {
            executor = executor.with_env(CONFIG_FILE_ENV, path);
        }
        if let Some(year) = self.default.budget_year {
            executor = executor.with_env(BUDGET_YEAR_ENV, year.to_string());
        }
        if let Some(code) = &self.default.province_code {
            executor = executor.with_env(PROVINCE_CODE_ENV, code);
        }
        executor
    }
}

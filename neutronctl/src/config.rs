//! CLI preferences
//!
//! Handles loading and saving `cli.toml`. Connection settings do not live
//! here: they come from `--os-*` options, `OS_*` variables and cloud profiles.

use anyhow::{Context, Result};
use neutron_core::config::default_cli_config_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FORMAT_ENV: &str = "NEUTRON_FORMAT";
const VERBOSE_ENV: &str = "NEUTRON_VERBOSE";
const TIMEOUT_ENV: &str = "NEUTRON_TIMEOUT";

/// CLI preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    /// Default output format
    pub output_format: String,

    /// Enable verbose logging by default
    pub verbose: bool,

    /// Per-request timeout in seconds; unset waits indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_format: "table".to_string(),
            verbose: false,
            timeout: None,
        }
    }
}

impl CliConfig {
    /// Default location of the preferences file
    pub fn config_path() -> PathBuf {
        default_cli_config_path()
    }

    /// Load preferences from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read CLI config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse CLI config file {}", path.display()))
    }

    /// Save preferences to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize CLI config")?;
        std::fs::write(path, content).context("Failed to write CLI config file")?;

        Ok(())
    }

    /// Create a new builder for constructing configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for CLI preferences with validation and priority chain support
///
/// Priority chain (lowest to highest):
/// 1. Defaults
/// 2. Config file
/// 3. Environment variables
/// 4. CLI arguments
///
/// Higher-priority sources are applied first; a later call never replaces
/// a value that is already set.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    output_format: Option<String>,
    verbose: Option<bool>,
    timeout: Option<u64>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output format (with validation)
    pub fn with_output_format(mut self, format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        Self::validate_output_format(&format)?;
        self.output_format = Some(format);
        Ok(self)
    }

    /// Set verbose flag
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Set timeout (with validation)
    pub fn with_timeout(mut self, timeout: u64) -> Result<Self> {
        Self::validate_timeout(timeout)?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Fill unset values from the preferences file at `path`, if any
    pub fn with_config_file(self, path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(self);
        };

        let config = CliConfig::load(path)?;
        Ok(Self {
            output_format: self.output_format.or(Some(config.output_format)),
            verbose: self.verbose.or(Some(config.verbose)),
            timeout: self.timeout.or(config.timeout),
        })
    }

    /// Fill unset values from `NEUTRON_*` variables; invalid values are ignored
    pub fn with_env_overrides(mut self) -> Self {
        if self.output_format.is_none() {
            if let Ok(format) = std::env::var(FORMAT_ENV) {
                if Self::validate_output_format(&format).is_ok() {
                    self.output_format = Some(format);
                }
            }
        }

        if self.verbose.is_none() {
            if let Ok(verbose) = std::env::var(VERBOSE_ENV) {
                self.verbose = Some(verbose.to_lowercase() == "true" || verbose == "1");
            }
        }

        if self.timeout.is_none() {
            if let Ok(timeout) = std::env::var(TIMEOUT_ENV) {
                if let Ok(timeout) = timeout.parse() {
                    if Self::validate_timeout(timeout).is_ok() {
                        self.timeout = Some(timeout);
                    }
                }
            }
        }

        self
    }

    /// Build the final configuration with validation
    pub fn build(self) -> Result<CliConfig> {
        let defaults = CliConfig::default();

        let output_format = self.output_format.unwrap_or(defaults.output_format);
        Self::validate_output_format(&output_format)?;
        if let Some(timeout) = self.timeout {
            Self::validate_timeout(timeout)?;
        }

        Ok(CliConfig {
            output_format,
            verbose: self.verbose.unwrap_or(defaults.verbose),
            timeout: self.timeout.or(defaults.timeout),
        })
    }

    fn validate_output_format(format: &str) -> Result<()> {
        match format {
            "table" | "json" => Ok(()),
            _ => Err(anyhow::anyhow!(
                "Invalid output format '{}'. Must be 'table' or 'json'",
                format
            )),
        }
    }

    fn validate_timeout(timeout: u64) -> Result<()> {
        if timeout == 0 {
            return Err(anyhow::anyhow!("Timeout must be greater than 0"));
        }
        Ok(())
    }
}

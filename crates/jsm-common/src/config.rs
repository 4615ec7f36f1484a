//! ---
//! jsm_section: "01-core-functionality"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Shared primitives and utilities for the translator runtime."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

/// Smallest buffer that still fits an error-only response.
pub const MIN_JSON_BUFFER: usize = 64;

fn default_json_buffer() -> usize {
    512
}

fn default_max_nesting() -> usize {
    10
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_max_current_limit() -> u16 {
    60
}

fn default_max_voltage_limit() -> u16 {
    260
}

fn default_min_voltage_limit() -> u16 {
    180
}

fn default_nominal_voltage() -> f32 {
    230.0
}

fn default_nominal_frequency() -> f32 {
    50.0
}

fn default_price_kwh() -> f32 {
    0.15
}

/// Primary configuration object for the translator runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub translator: TranslatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub meter: MeterConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "JSM_CONFIG";

    /// Load configuration from disk, respecting the `JSM_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        Self::discover(candidates)?.ok_or_else(|| {
            anyhow!(
                "no configuration files found. inspected: {}",
                candidates
                    .iter()
                    .map(|p| p.as_ref().display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }

    /// Like [`AppConfig::load_with_source`] but returns `None` when neither the
    /// environment override nor any candidate exists.
    pub fn discover<P: AsRef<Path>>(candidates: &[P]) -> Result<Option<LoadedAppConfig>> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                return Self::from_path(PathBuf::from(env_path)).map(Some);
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                return Self::from_path(candidate.as_ref().to_path_buf()).map(Some);
            }
        }

        Ok(None)
    }

    /// Read and validate a single configuration file.
    pub fn from_path(path: PathBuf) -> Result<LoadedAppConfig> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(LoadedAppConfig {
            config,
            source: path,
        })
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.translator.validate()?;
        self.meter.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// How payload fields of the wrong JSON type are read.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Mismatched fields read as zero, `false` or an empty string.
    #[default]
    Lenient,
    /// Mismatched fields reject the payload.
    Strict,
}

impl std::str::FromStr for CoercionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lenient" => Ok(CoercionPolicy::Lenient),
            "strict" => Ok(CoercionPolicy::Strict),
            other => Err(format!("unknown coercion policy: {}", other)),
        }
    }
}

/// Request decoding and response rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslatorConfig {
    /// Upper bound in bytes for both inbound requests and rendered responses.
    #[serde(default = "default_json_buffer")]
    pub json_buffer: usize,
    /// Render responses with indentation.
    #[serde(default)]
    pub pretty: bool,
    /// Maximum object/array nesting accepted in a request.
    #[serde(default = "default_max_nesting")]
    pub max_nesting: usize,
    #[serde(default)]
    pub coercion: CoercionPolicy,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            json_buffer: default_json_buffer(),
            pretty: false,
            max_nesting: default_max_nesting(),
            coercion: CoercionPolicy::default(),
        }
    }
}

impl TranslatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.json_buffer < MIN_JSON_BUFFER {
            return Err(anyhow!(
                "translator json_buffer must be at least {} bytes (got {})",
                MIN_JSON_BUFFER,
                self.json_buffer
            ));
        }
        if self.max_nesting == 0 {
            return Err(anyhow!("translator max_nesting must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Initial register contents for the simulated meter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeterConfig {
    #[serde(default = "default_max_current_limit")]
    pub max_current_limit: u16,
    #[serde(default = "default_max_voltage_limit")]
    pub max_voltage_limit: u16,
    #[serde(default = "default_min_voltage_limit")]
    pub min_voltage_limit: u16,
    #[serde(default = "default_nominal_voltage")]
    pub nominal_voltage: f32,
    #[serde(default = "default_nominal_frequency")]
    pub nominal_frequency: f32,
    #[serde(default)]
    pub starting_kwh: f32,
    #[serde(default = "default_price_kwh")]
    pub price_kwh: f32,
    #[serde(default)]
    pub energy_purchase: f32,
    #[serde(default)]
    pub energy_purchase_alarm: f32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            max_current_limit: default_max_current_limit(),
            max_voltage_limit: default_max_voltage_limit(),
            min_voltage_limit: default_min_voltage_limit(),
            nominal_voltage: default_nominal_voltage(),
            nominal_frequency: default_nominal_frequency(),
            starting_kwh: 0.0,
            price_kwh: default_price_kwh(),
            energy_purchase: 0.0,
            energy_purchase_alarm: 0.0,
        }
    }
}

impl MeterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_voltage_limit >= self.max_voltage_limit {
            return Err(anyhow!(
                "meter min_voltage_limit ({}) must be below max_voltage_limit ({})",
                self.min_voltage_limit,
                self.max_voltage_limit
            ));
        }
        if self.price_kwh < 0.0 {
            return Err(anyhow!("meter price_kwh cannot be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.translator.json_buffer, 512);
        assert_eq!(config.translator.max_nesting, 10);
        assert_eq!(config.translator.coercion, CoercionPolicy::Lenient);
        assert!(!config.translator.pretty);
    }

    #[test]
    fn parses_partial_toml() {
        let config: AppConfig = r#"
            [translator]
            pretty = true
            coercion = "strict"

            [meter]
            price_kwh = 0.31
        "#
        .parse()
        .unwrap();
        assert!(config.translator.pretty);
        assert_eq!(config.translator.coercion, CoercionPolicy::Strict);
        assert_eq!(config.translator.json_buffer, 512);
        assert!((config.meter.price_kwh - 0.31).abs() < f32::EPSILON);
        assert_eq!(config.meter.max_voltage_limit, 260);
    }

    #[test]
    fn rejects_tiny_buffer() {
        let err = "[translator]\njson_buffer = 16\n"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("json_buffer"));
    }

    #[test]
    fn rejects_inverted_voltage_window() {
        let err = "[meter]\nmin_voltage_limit = 250\nmax_voltage_limit = 240\n"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("min_voltage_limit"));
    }

    #[test]
    fn coercion_policy_from_str() {
        assert_eq!("Strict".parse::<CoercionPolicy>(), Ok(CoercionPolicy::Strict));
        assert!("loose".parse::<CoercionPolicy>().is_err());
    }
}

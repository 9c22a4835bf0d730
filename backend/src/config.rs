//! Pipeline configuration.
//!
//! Every default lives on [`PipelineConfig`]; nothing is a module-level
//! constant read behind the caller's back. The binary loads `.env` with
//! `dotenvy`, overlays `WELLFLOW_*` variables through
//! [`PipelineConfig::from_env`], then applies command-line flags.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::transform::normalize::NormalizeMethod;

/// Prefix shared by all configuration variables.
pub const ENV_PREFIX: &str = "WELLFLOW_";

/// Settings for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Top-left cell of the region to transpose.
    pub start_cell: String,

    /// Normalizer variant used by `normalize` and `run`.
    pub method: NormalizeMethod,

    /// Time-zero window: only rows up to this many seconds are normalized.
    pub max_seconds: Option<f64>,

    /// Number of leading reads averaged into the baseline.
    pub first_n_reads: usize,

    /// Well row letters to keep, e.g. `"A, B"`.
    pub filter_letters: Option<String>,

    /// Well column numbers to keep, e.g. `"1 to 12"`.
    pub filter_range: Option<String>,

    /// HTTP server port.
    pub port: u16,

    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_cell: "B8".to_string(),
            method: NormalizeMethod::Average,
            max_seconds: None,
            first_n_reads: 30,
            filter_letters: None,
            filter_range: None,
            port: 3000,
            log_level: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `WELLFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup` (keyed by full variable name).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(v) = get("START_CELL") {
            config.start_cell = v;
        }
        if let Some(v) = get("METHOD") {
            config.method = parse_value("METHOD", &v)?;
        }
        if let Some(v) = get("MAX_SECONDS") {
            config.max_seconds = Some(parse_value("MAX_SECONDS", &v)?);
        }
        if let Some(v) = get("FIRST_N_READS") {
            config.first_n_reads = parse_value("FIRST_N_READS", &v)?;
        }
        if let Some(v) = get("FILTER_LETTERS") {
            config.filter_letters = Some(v);
        }
        if let Some(v) = get("FILTER_RANGE") {
            config.filter_range = Some(v);
        }
        if let Some(v) = get("PORT") {
            config.port = parse_value("PORT", &v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: format!("{}{}", ENV_PREFIX, name),
        value: value.to_string(),
    })
}

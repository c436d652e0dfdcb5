//! Configuration System
//!
//! Hierarchical configuration loading from:
//! - optmodel.toml (default configuration)
//! - optmodel.local.toml (git-ignored local overrides)
//! - Environment variables (OPTMODEL_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # optmodel.toml
//! [limits]
//! max_sum_nesting = 100
//! script_timeout_secs = 5
//! script_recursion_limit = 100
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! OPTMODEL_LIMITS__MAX_SUM_NESTING=50
//! OPTMODEL_LOGGING__LEVEL=debug
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Expansion and scripting limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum summation-expansion nesting depth before the preprocessor
    /// gives up (runaway `sum` rewriting guard)
    #[serde(default = "default_sum_nesting")]
    pub max_sum_nesting: usize,

    /// Wall-clock budget for one `execute` block, in seconds
    #[serde(default = "default_script_timeout")]
    pub script_timeout_secs: u64,

    /// Recursion limit handed to the embedded script engine
    #[serde(default = "default_script_recursion")]
    pub script_recursion_limit: usize,
}

fn default_sum_nesting() -> usize {
    100
}

fn default_script_timeout() -> u64 {
    5
}

fn default_script_recursion() -> usize {
    100
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_sum_nesting: default_sum_nesting(),
            script_timeout_secs: default_script_timeout(),
            script_recursion_limit: default_script_recursion(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("optmodel.toml"))
            .merge(Toml::file("optmodel.local.toml"))
            .merge(Env::prefixed("OPTMODEL_").split("__"))
            .extract()
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # hexzip Configuration System
//!
//! Type-safe configuration loader for the hexzip hierarchy builder with support for:
//! - TOML file parsing (`hexzip.toml`)
//! - Environment variable overrides (`HEXZIP_*`)
//! - CLI argument overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hexzip_config::{load_config, HexzipConfig};
//!
//! let config = load_config(None, None).expect("Failed to load config");
//!
//! println!("Batch size: {}", config.build.batch_size);
//! println!("Workers: {}", config.build.workers);
//! ```
//!
//! Every value has a default, so a missing section (or a missing file, see
//! [`load_config_or_default`]) still yields a complete configuration.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    load_config_or_default, CONFIG_FILE_NAME, CONFIG_PATH_ENV,
};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

pub use serde;

/// Errors raised while locating, reading or checking `hexzip.toml`
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no hexzip.toml found (searched: {0})")]
    FileNotFound(String),

    #[error("cannot read hexzip.toml: {0}")]
    IoError(#[from] std::io::Error),

    #[error("malformed hexzip.toml: {0}")]
    ParseError(String),

    /// One or more settings out of range; the message lists each offending key
    #[error("invalid hexzip configuration: {0}")]
    ValidationError(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = HexzipConfig::default();
        let text = toml::to_string(&config).expect("serialize default config");
        let parsed: HexzipConfig = toml::from_str(&text).expect("parse default config");
        assert_eq!(parsed.build.batch_size, config.build.batch_size);
        assert_eq!(parsed.orphans.top_k, config.orphans.top_k);
    }

    #[test]
    fn test_parse_error_is_mapped() {
        let err: ConfigError = toml::from_str::<HexzipConfig>("[build\nbatch_size = ")
            .unwrap_err()
            .into();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! consistent and within valid ranges.

use crate::{ConfigError, ConfigResult, HexzipConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MustBePositive { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MustBePositive { field } => write!(f, "{} must be greater than zero", field),
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Positive batch size, worker count, iteration cap and top-K
/// - Non-negative, finite scoring weights that do not all vanish
/// - A non-empty, strictly increasing radius schedule
/// - A recognised log level
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &HexzipConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_build(config, &mut errors);
    validate_scoring(config, &mut errors);
    validate_orphans(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_build(config: &HexzipConfig, errors: &mut Vec<ConfigValidationError>) {
    let positives = [
        ("build.batch_size", config.build.batch_size),
        ("build.workers", config.build.workers),
        ("build.max_repair_iterations", config.build.max_repair_iterations),
        ("build.eta_window_batches", config.build.eta_window_batches),
    ];
    for (field, value) in positives {
        if value == 0 {
            errors.push(ConfigValidationError::MustBePositive {
                field: field.to_string(),
            });
        }
    }
}

fn validate_scoring(config: &HexzipConfig, errors: &mut Vec<ConfigValidationError>) {
    let weights = [
        ("scoring.area_weight", config.scoring.area_weight),
        ("scoring.population_weight", config.scoring.population_weight),
        ("scoring.proximity_weight", config.scoring.proximity_weight),
    ];
    for (field, weight) in weights {
        if !weight.is_finite() || weight < 0.0 {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: "must be a finite, non-negative number".to_string(),
            });
        }
    }
    let total: f64 = weights.iter().map(|(_, w)| *w).sum();
    if total <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "scoring".to_string(),
            reason: "at least one weight must be positive".to_string(),
        });
    }
}

fn validate_orphans(config: &HexzipConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.orphans.top_k == 0 {
        errors.push(ConfigValidationError::MustBePositive {
            field: "orphans.top_k".to_string(),
        });
    }

    let radii = &config.orphans.radius_schedule_km;
    if radii.is_empty() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "orphans.radius_schedule_km".to_string(),
            reason: "needs at least one radius".to_string(),
        });
    }
    if radii.iter().any(|r| !r.is_finite() || *r <= 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "orphans.radius_schedule_km".to_string(),
            reason: "radii must be positive".to_string(),
        });
    }
    if radii.windows(2).any(|pair| pair[1] <= pair[0]) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "orphans.radius_schedule_km".to_string(),
            reason: "radii must be strictly increasing".to_string(),
        });
    }
}

fn validate_logging(config: &HexzipConfig, errors: &mut Vec<ConfigValidationError>) {
    const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
    if !LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("must be one of {}", LEVELS.join(", ")),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HexzipConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = HexzipConfig::default();
        config.build.batch_size = 0;

        let result = validate_config(&config);
        match result {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("build.batch_size")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_all_problems_are_reported_together() {
        let mut config = HexzipConfig::default();
        config.orphans.top_k = 0;
        config.orphans.radius_schedule_km = vec![10.0, 5.0];
        config.scoring.population_weight = -1.0;

        let Err(ConfigError::ValidationError(msg)) = validate_config(&config) else {
            panic!("expected validation error");
        };
        assert!(msg.contains("orphans.top_k"));
        assert!(msg.contains("strictly increasing"));
        assert!(msg.contains("scoring.population_weight"));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = HexzipConfig::default();
        config.logging.level = "WARNING".to_string();
        assert!(validate_config(&config).is_err());
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, HexzipConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "hexzip.toml";

/// Environment variable pointing at an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "HEXZIP_CONFIG_PATH";

/// Find the hexzip configuration file
///
/// Search order:
/// 1. `HEXZIP_CONFIG_PATH` environment variable
/// 2. Current working directory: `./hexzip.toml`
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "hexzip configuration file '{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<HexzipConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: HexzipConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Like [`load_config`], but falls back to built-in defaults when no file can be found.
///
/// An explicitly given path that does not exist is still an error.
pub fn load_config_or_default(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<HexzipConfig> {
    if config_path.is_some() {
        return load_config(config_path, cli_args);
    }
    match find_config_file() {
        Ok(path) => load_config(Some(&path), cli_args),
        Err(ConfigError::FileNotFound(_)) if env::var(CONFIG_PATH_ENV).is_err() => {
            let mut config = HexzipConfig::default();
            apply_environment_overrides(&mut config);
            if let Some(cli) = cli_args {
                apply_cli_overrides(&mut config, cli);
            }
            Ok(config)
        }
        Err(e) => Err(e),
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `HEXZIP_BATCH_SIZE` -> `build.batch_size`
/// - `HEXZIP_WORKERS` -> `build.workers`
/// - `HEXZIP_MAX_REPAIR_ITERATIONS` -> `build.max_repair_iterations`
/// - `HEXZIP_ORPHAN_TOP_K` -> `orphans.top_k`
/// - `HEXZIP_SEARCH_RADII_KM` -> `orphans.radius_schedule_km` (comma-separated)
/// - `HEXZIP_LOG_LEVEL` -> `logging.level`
/// - `HEXZIP_LOG_DIR` -> `logging.log_dir`
/// - `HEXZIP_OUTPUT_DIR` -> `output.output_dir`
pub fn apply_environment_overrides(config: &mut HexzipConfig) {
    if let Ok(value) = env::var("HEXZIP_BATCH_SIZE") {
        if let Ok(size) = value.parse::<usize>() {
            config.build.batch_size = size;
        }
    }
    if let Ok(value) = env::var("HEXZIP_WORKERS") {
        if let Ok(workers) = value.parse::<usize>() {
            config.build.workers = workers;
        }
    }
    if let Ok(value) = env::var("HEXZIP_MAX_REPAIR_ITERATIONS") {
        if let Ok(cap) = value.parse::<usize>() {
            config.build.max_repair_iterations = cap;
        }
    }
    if let Ok(value) = env::var("HEXZIP_ORPHAN_TOP_K") {
        if let Ok(k) = value.parse::<usize>() {
            config.orphans.top_k = k;
        }
    }
    if let Ok(value) = env::var("HEXZIP_SEARCH_RADII_KM") {
        if let Some(radii) = parse_radii(&value) {
            config.orphans.radius_schedule_km = radii;
        }
    }
    if let Ok(value) = env::var("HEXZIP_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Ok(value) = env::var("HEXZIP_LOG_DIR") {
        config.logging.log_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("HEXZIP_OUTPUT_DIR") {
        config.output.output_dir = PathBuf::from(value);
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"batch_size": "50", "workers": "8"}`)
pub fn apply_cli_overrides(config: &mut HexzipConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("batch_size") {
        if let Ok(size) = value.parse::<usize>() {
            config.build.batch_size = size;
        }
    }
    if let Some(value) = cli_args.get("workers") {
        if let Ok(workers) = value.parse::<usize>() {
            config.build.workers = workers;
        }
    }
    if let Some(value) = cli_args.get("max_repair_iterations") {
        if let Ok(cap) = value.parse::<usize>() {
            config.build.max_repair_iterations = cap;
        }
    }
    if let Some(value) = cli_args.get("top_k") {
        if let Ok(k) = value.parse::<usize>() {
            config.orphans.top_k = k;
        }
    }
    if let Some(value) = cli_args.get("search_radii_km") {
        if let Some(radii) = parse_radii(value) {
            config.orphans.radius_schedule_km = radii;
        }
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("output_dir") {
        config.output.output_dir = PathBuf::from(value);
    }
}

fn parse_radii(value: &str) -> Option<Vec<f64>> {
    let radii = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    if radii.is_empty() {
        None
    } else {
        Some(radii)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_missing_env_path_is_an_error() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var(CONFIG_PATH_ENV, "/definitely/not/here/hexzip.toml");
        let result = load_config_or_default(None, None);
        env::remove_var(CONFIG_PATH_ENV);

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[build]").unwrap();
        writeln!(file, "batch_size = 25").unwrap();
        writeln!(file, "[orphans]").unwrap();
        writeln!(file, "radius_schedule_km = [2.5, 7.5]").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.build.batch_size, 25);
        assert_eq!(config.build.workers, 4);
        assert_eq!(config.orphans.radius_schedule_km, vec![2.5, 7.5]);
        assert_eq!(config.orphans.top_k, 3);
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = HexzipConfig::default();

        env::set_var("HEXZIP_WORKERS", "12");
        env::set_var("HEXZIP_SEARCH_RADII_KM", "1, 2,4");
        apply_environment_overrides(&mut config);
        env::remove_var("HEXZIP_WORKERS");
        env::remove_var("HEXZIP_SEARCH_RADII_KM");

        assert_eq!(config.build.workers, 12);
        assert_eq!(config.orphans.radius_schedule_km, vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_malformed_radii_are_ignored() {
        let mut config = HexzipConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("search_radii_km".to_string(), "5,abc".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.orphans.radius_schedule_km, vec![5.0, 10.0, 20.0]);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[build]").unwrap();
        writeln!(file, "batch_size = 10").unwrap();
        writeln!(file, "workers = 2").unwrap();

        env::set_var("HEXZIP_BATCH_SIZE", "20");
        env::set_var("HEXZIP_WORKERS", "3");

        let mut cli_args = HashMap::new();
        cli_args.insert("batch_size".to_string(), "30".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("HEXZIP_BATCH_SIZE");
        env::remove_var("HEXZIP_WORKERS");

        // CLI wins for batch size, env wins for workers (no CLI override)
        assert_eq!(config.build.batch_size, 30);
        assert_eq!(config.build.workers, 3);
    }
}

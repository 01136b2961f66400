//! Application configuration loader.
//!
//! Reads `simsearch.toml` (or an explicit path) into [`AppConfig`], applies
//! environment overrides, and validates the result. Configuration is loaded
//! once at startup; nothing downstream reads the environment.
//!
//! Environment overrides:
//! - `GCP_PROJECT` -> `gcp.project`
//! - `GCP_BQ_DATASET` -> `gcp.bq_dataset`
//! - `GCP_BUCKET` -> `gcp.bucket`
//! - `GCP_ACCESS_TOKEN` -> `gcp.access_token` (never read from the file)

use std::path::Path;

use secrecy::SecretString;

use simsearch_types::config::AppConfig;
use simsearch_types::error::ConfigError;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "simsearch.toml";

/// Load, override from the process environment, and validate.
///
/// - With `path`, the file must exist.
/// - Without, `simsearch.toml` is used when present and defaults otherwise.
pub async fn load_app_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = read_config_file(path).await?;
    let config = apply_env_overrides(config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

async fn read_config_file(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let (config_path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (Path::new(DEFAULT_CONFIG_FILE).to_path_buf(), false),
    };

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
            tracing::debug!("No {} found, using defaults", config_path.display());
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: config_path.display().to_string(),
                message: err.to_string(),
            });
        }
    };

    toml::from_str::<AppConfig>(&content).map_err(|err| ConfigError::Parse {
        path: config_path.display().to_string(),
        message: err.to_string(),
    })
}

/// Apply `GCP_*` overrides using `lookup` to read variables.
///
/// Empty values are ignored.
pub fn apply_env_overrides(
    mut config: AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> AppConfig {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(project) = get("GCP_PROJECT") {
        config.gcp.project = project;
    }
    if let Some(dataset) = get("GCP_BQ_DATASET") {
        config.gcp.bq_dataset = dataset;
    }
    if let Some(bucket) = get("GCP_BUCKET") {
        config.gcp.bucket = Some(bucket);
    }
    if let Some(token) = get("GCP_ACCESS_TOKEN") {
        config.gcp.access_token = Some(SecretString::from(token));
    }
    config
}

//! Application configuration types.
//!
//! `AppConfig` is built once at startup from `simsearch.toml` plus environment
//! overrides, validated, and then shared read-only with every component.

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::table::{ATTEMPT_TOKEN_LEN, MAX_QUALIFIED_NAME_LEN, YEAR_TAG_LEN};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gcp: GcpConfig,

    #[serde(default)]
    pub earthengine: EarthEngineConfig,

    #[serde(default)]
    pub bigquery: BigQueryConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Cloud project and warehouse dataset the pipeline writes into.
#[derive(Debug, Default, Deserialize)]
pub struct GcpConfig {
    #[serde(default)]
    pub project: String,

    #[serde(default, alias = "bq-dataset")]
    pub bq_dataset: String,

    #[serde(default)]
    pub bucket: Option<String>,

    /// OAuth bearer token for Google APIs. Only ever set from the environment.
    #[serde(skip)]
    pub access_token: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct EarthEngineConfig {
    #[serde(default = "default_ee_base_url")]
    pub base_url: String,

    /// Sent as `workloadTag` on every export for usage attribution.
    #[serde(default = "default_workload_tag")]
    pub workload_tag: String,
}

fn default_ee_base_url() -> String {
    "https://earthengine-highvolume.googleapis.com".to_string()
}

fn default_workload_tag() -> String {
    "gcp-sim-search-api".to_string()
}

impl Default for EarthEngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_ee_base_url(),
            workload_tag: default_workload_tag(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BigQueryConfig {
    #[serde(default = "default_bq_base_url")]
    pub base_url: String,

    /// Dataset location, passed on job insertion when set (e.g. "US").
    #[serde(default)]
    pub location: Option<String>,

    /// Server-side timeout for synchronous search queries.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

fn default_bq_base_url() -> String {
    "https://bigquery.googleapis.com".to_string()
}

fn default_query_timeout_ms() -> u64 {
    60_000
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            base_url: default_bq_base_url(),
            location: None,
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_base_url")]
    pub base_url: String,
}

fn default_storage_base_url() -> String {
    "https://storage.googleapis.com".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_storage_base_url(),
        }
    }
}

/// Remote task polling cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,

    /// Give up waiting after this long. `None` waits indefinitely.
    #[serde(default = "default_poll_timeout_secs")]
    pub timeout_secs: Option<u64>,
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_poll_timeout_secs() -> Option<u64> {
    Some(6 * 60 * 60)
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Check the settings every pipeline run depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gcp.project.trim().is_empty() {
            return Err(ConfigError::Missing("gcp.project"));
        }
        if self.gcp.bq_dataset.trim().is_empty() {
            return Err(ConfigError::Missing("gcp.bq_dataset"));
        }

        // project.dataset. + base + _yyyy_nnn must leave at least one base char
        let fixed = self.gcp.project.chars().count()
            + self.gcp.bq_dataset.chars().count()
            + 4
            + YEAR_TAG_LEN
            + ATTEMPT_TOKEN_LEN;
        if fixed >= MAX_QUALIFIED_NAME_LEN {
            return Err(ConfigError::Invalid {
                key: "gcp.bq_dataset",
                message: format!(
                    "project and dataset names leave no room for tables within {MAX_QUALIFIED_NAME_LEN} characters"
                ),
            });
        }

        if self.polling.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "polling.interval_secs",
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(timeout) = self.polling.timeout_secs {
            if timeout < self.polling.interval_secs {
                return Err(ConfigError::Invalid {
                    key: "polling.timeout_secs",
                    message: format!(
                        "{timeout}s is shorter than the poll interval ({}s)",
                        self.polling.interval_secs
                    ),
                });
            }
        }
        Ok(())
    }
}

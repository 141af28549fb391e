//! Application settings
//!
//! Layered configuration: optional TOML file, then environment variables
//! with the `BACKFILL_` prefix (e.g. `BACKFILL_STORE__DATA_DIR=/var/data`).
//! Every field has a default so the binary runs with no config at all.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::backfill::{OrchestratorSettings, DEFAULT_STALENESS_MINUTES};
use crate::fetch::{FetchPolicy, DEFAULT_PERIOD_SKIPS, DEFAULT_RETRY_ATTEMPTS};
use crate::interval::Interval;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub backfill: BackfillSettings,
    #[serde(default)]
    pub source: SourceSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// Directory the local store keeps its items in
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    /// Window size in intervals per page request
    #[serde(default = "default_window_size")]
    pub window_size: u32,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_period_skips")]
    pub period_skips: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackfillSettings {
    /// Trading pairs to keep backfilled
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default = "default_interval")]
    pub interval: Interval,
    #[serde(default = "default_staleness_minutes")]
    pub staleness_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    /// REST base URL of the candle source
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_window_size() -> u32 {
    100
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_period_skips() -> u32 {
    DEFAULT_PERIOD_SKIPS
}

fn default_symbols() -> Vec<String> {
    vec!["BTC-USDT".to_string()]
}

fn default_interval() -> Interval {
    Interval::Day1
}

fn default_staleness_minutes() -> i64 {
    DEFAULT_STALENESS_MINUTES
}

fn default_base_url() -> String {
    "https://api.kucoin.com".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            retry_attempts: default_retry_attempts(),
            period_skips: default_period_skips(),
        }
    }
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            interval: default_interval(),
            staleness_minutes: default_staleness_minutes(),
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSettings::default(),
            fetch: FetchSettings::default(),
            backfill: BackfillSettings::default(),
            source: SourceSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus `BACKFILL_*` environment
    /// variables, env taking precedence.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        } else {
            builder = builder.add_source(File::with_name("config/default").required(false));
        }
        builder
            .add_source(Environment::with_prefix("BACKFILL").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            max_retry_attempts: self.fetch.retry_attempts,
            max_period_skips: self.fetch.period_skips,
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            staleness_minutes: self.backfill.staleness_minutes,
            policy: self.fetch_policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.store.data_dir, "./data");
        assert_eq!(settings.fetch.window_size, 100);
        assert_eq!(settings.backfill.staleness_minutes, 60);
        assert_eq!(settings.backfill.interval, Interval::Day1);
        assert_eq!(settings.source.base_url, "https://api.kucoin.com");
    }

    #[test]
    fn test_deserializes_partial_toml() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                r#"
                [store]
                data_dir = "/tmp/series"

                [backfill]
                symbols = ["ETH-USDT", "SOL-USDT"]
                interval = "4h"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.store.data_dir, "/tmp/series");
        assert_eq!(settings.backfill.symbols.len(), 2);
        assert_eq!(settings.backfill.interval, Interval::Hour4);
        // untouched sections keep their defaults
        assert_eq!(settings.fetch.retry_attempts, 2);
    }

    #[test]
    fn test_policy_mapping() {
        let mut settings = Settings::default();
        settings.fetch.retry_attempts = 5;
        settings.fetch.period_skips = 1;
        let policy = settings.fetch_policy();
        assert_eq!(policy.max_retry_attempts, 5);
        assert_eq!(policy.max_period_skips, 1);
    }
}

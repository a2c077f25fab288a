//! Serializable collection configuration.
//!
//! Every field has a default, so an empty TOML file is a valid configuration
//! that reproduces the historical run: 2023-01-01 to 2024-01-01, five workers,
//! Yahoo prices into `collected_data/`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tickerlab_core::data::{DateRange, SourceKind};

use crate::throttle::Throttle;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Parameters for one collection run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectConfig {
    /// First date requested (inclusive)
    pub start_date: NaiveDate,

    /// Last date requested (inclusive)
    pub end_date: NaiveDate,

    /// Upper bound on concurrently running tasks
    pub max_workers: usize,

    /// Directory receiving `{ticker}_{source}.csv`, the manifest and the report
    pub output_dir: PathBuf,

    /// Adapters to run for every ticker, in order
    pub sources: Vec<SourceKind>,

    /// Universe file (TOML or line list); `None` means the built-in S&P 500 list
    pub universe: Option<PathBuf>,

    /// Stop starting new tasks after this many seconds
    pub deadline_secs: Option<u64>,

    pub throttle: ThrottleConfig,
    pub polygon: PolygonConfig,
    pub trends: TrendsConfig,
    pub stocktwits: StockTwitsConfig,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid constant date"),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid constant date"),
            max_workers: 5,
            output_dir: PathBuf::from("collected_data"),
            sources: vec![SourceKind::YahooFinance],
            universe: None,
            deadline_secs: None,
            throttle: ThrottleConfig::default(),
            polygon: PolygonConfig::default(),
            trends: TrendsConfig::default(),
            stocktwits: StockTwitsConfig::default(),
        }
    }
}

/// Randomized pause after each executed task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThrottleConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1_000,
            max_delay_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolygonConfig {
    /// Falls back to `POLYGON_API_KEY` when absent from the file.
    pub api_key: Option<String>,
    pub multiplier: u32,
    pub timespan: String,
}

impl Default for PolygonConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("POLYGON_API_KEY").ok().filter(|k| !k.is_empty()),
            multiplier: 1,
            timespan: "day".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrendsConfig {
    /// Explicit Trends timeframe such as `"today 3-m"`. Derived from the date
    /// range when absent.
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StockTwitsConfig {
    pub limit: u32,
}

impl Default for StockTwitsConfig {
    fn default() -> Self {
        Self { limit: 50 }
    }
}

impl CollectConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject configurations the orchestrator cannot run. Date order is left
    /// to the adapters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid("max_workers must be at least 1".into()));
        }
        if self.throttle.min_delay_ms > self.throttle.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "throttle range is inverted: {} > {}",
                self.throttle.min_delay_ms, self.throttle.max_delay_ms
            )));
        }
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("no sources selected".into()));
        }
        if self.sources.contains(&SourceKind::Polygon) && self.polygon.api_key.is_none() {
            return Err(ConfigError::Invalid(
                "polygon source requires an API key (set POLYGON_API_KEY)".into(),
            ));
        }
        Ok(())
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn throttle(&self) -> Throttle {
        Throttle::new(
            Duration::from_millis(self.throttle.min_delay_ms),
            Duration::from_millis(self.throttle.max_delay_ms),
        )
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(crate::manifest::MANIFEST_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_historical_defaults() {
        let config = CollectConfig::from_toml("").unwrap();
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(config.max_workers, 5);
        assert_eq!(config.output_dir, PathBuf::from("collected_data"));
        assert_eq!(config.sources, vec![SourceKind::YahooFinance]);
        assert_eq!(config.throttle, ThrottleConfig::default());
        assert_eq!(config.stocktwits.limit, 50);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let config = CollectConfig::from_toml(
            r#"
            max_workers = 12
            sources = ["yahoo_finance", "google_trends"]

            [throttle]
            max_delay_ms = 500
            min_delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.max_workers, 12);
        assert_eq!(
            config.sources,
            vec![SourceKind::YahooFinance, SourceKind::GoogleTrends]
        );
        assert_eq!(config.throttle.max_delay_ms, 500);
        assert_eq!(config.polygon.timespan, "day");
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = CollectConfig::default();
        config.deadline_secs = Some(30);
        config.polygon.api_key = Some("k".into());
        let parsed = CollectConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = CollectConfig {
            max_workers: 0,
            ..CollectConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_inverted_throttle() {
        let mut config = CollectConfig::default();
        config.throttle = ThrottleConfig {
            min_delay_ms: 10,
            max_delay_ms: 1,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_polygon_key() {
        let mut config = CollectConfig::default();
        config.sources = vec![SourceKind::Polygon];
        config.polygon.api_key = None;
        assert!(config.validate().is_err());
        config.polygon.api_key = Some("key".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn inverted_dates_are_not_a_config_error() {
        let mut config = CollectConfig::default();
        std::mem::swap(&mut config.start_date, &mut config.end_date);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_source_is_a_parse_error() {
        let err = CollectConfig::from_toml(r#"sources = ["bloomberg"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}

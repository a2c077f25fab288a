//! Adapter construction from configuration.

use std::sync::Arc;
use tickerlab_core::data::{
    DataError, PolygonAdapter, SourceAdapter, SourceKind, StockTwitsAdapter, SyntheticAdapter,
    TrendsAdapter, YahooAdapter,
};

use crate::config::CollectConfig;

/// One adapter per configured source, in configuration order.
pub fn build_adapters(config: &CollectConfig) -> Result<Vec<Arc<dyn SourceAdapter>>, DataError> {
    config
        .sources
        .iter()
        .map(|kind| build_adapter(*kind, config))
        .collect()
}

pub fn build_adapter(
    kind: SourceKind,
    config: &CollectConfig,
) -> Result<Arc<dyn SourceAdapter>, DataError> {
    let adapter: Arc<dyn SourceAdapter> = match kind {
        SourceKind::YahooFinance => Arc::new(YahooAdapter::new()?),
        SourceKind::Polygon => {
            let key = config
                .polygon
                .api_key
                .as_deref()
                .ok_or_else(|| DataError::Config("POLYGON_API_KEY is not set".into()))?;
            Arc::new(PolygonAdapter::new(
                key,
                config.polygon.multiplier,
                config.polygon.timespan.as_str(),
            )?)
        }
        SourceKind::GoogleTrends => Arc::new(TrendsAdapter::new(config.trends.timeframe.clone())?),
        SourceKind::StockTwits => Arc::new(StockTwitsAdapter::new(config.stocktwits.limit)?),
        SourceKind::Synthetic => Arc::new(SyntheticAdapter::new()),
    };
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapters_follow_configured_order() {
        let mut config = CollectConfig::default();
        config.sources = vec![SourceKind::Synthetic, SourceKind::YahooFinance];
        let kinds: Vec<SourceKind> = build_adapters(&config)
            .unwrap()
            .iter()
            .map(|a| a.kind())
            .collect();
        assert_eq!(kinds, config.sources);
    }

    #[test]
    fn polygon_without_key_is_a_config_error() {
        let mut config = CollectConfig::default();
        config.polygon.api_key = None;
        assert!(matches!(
            build_adapter(SourceKind::Polygon, &config),
            Err(DataError::Config(_))
        ));
    }
}

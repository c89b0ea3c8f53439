//! Indicator endpoints: support/resistance, market structure, Elliott waves.
//!
//! Every endpoint takes `symbol`, `timeframe` and `limit` plus the
//! indicator-specific parameters from [`IndicatorSettings`].

use crate::client::ChartApiClient;
use crate::constants::{ELLIOTT_WAVE_PATH, MARKET_STRUCTURE_PATH, SUPPORT_RESISTANCE_PATH};
use crate::error::Result;
use crate::types::candle::Interval;
use crate::types::indicators::*;
use crate::types::lenient::Lenient;

impl ChartApiClient {
    /// Retrieve support/resistance bands.
    ///
    /// **Endpoint:** `GET /indicators/support-resistance`
    pub async fn get_support_resistance(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
        settings: &IndicatorSettings,
    ) -> Result<Vec<SrLevel>> {
        let query = indicator_query(symbol, interval, limit, settings, IndicatorKind::SupportResistance);
        let levels: Lenient<SrLevel> = self.get_with_query(SUPPORT_RESISTANCE_PATH, &query).await?;
        Ok(levels.into_inner())
    }

    /// Retrieve order blocks, breaker blocks and market structure breaks.
    ///
    /// **Endpoint:** `GET /indicators/market-structure`
    pub async fn get_market_structure(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
        settings: &IndicatorSettings,
    ) -> Result<StructureResult> {
        let query = indicator_query(symbol, interval, limit, settings, IndicatorKind::MarketStructure);
        self.get_with_query(MARKET_STRUCTURE_PATH, &query).await
    }

    /// Retrieve zig-zag points and Elliott-wave patterns.
    ///
    /// **Endpoint:** `GET /indicators/elliott-wave`
    pub async fn get_elliott_wave(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
        settings: &IndicatorSettings,
    ) -> Result<ElliottWaveResult> {
        let query = indicator_query(symbol, interval, limit, settings, IndicatorKind::ElliottWave);
        self.get_with_query(ELLIOTT_WAVE_PATH, &query).await
    }

    /// Fetch any indicator kind as an [`IndicatorSnapshot`].
    pub async fn get_indicator(
        &self,
        kind: IndicatorKind,
        symbol: &str,
        interval: Interval,
        limit: u32,
        settings: &IndicatorSettings,
    ) -> Result<IndicatorSnapshot> {
        Ok(match kind {
            IndicatorKind::SupportResistance => IndicatorSnapshot::SupportResistance(
                self.get_support_resistance(symbol, interval, limit, settings).await?,
            ),
            IndicatorKind::MarketStructure => IndicatorSnapshot::MarketStructure(
                self.get_market_structure(symbol, interval, limit, settings).await?,
            ),
            IndicatorKind::ElliottWave => IndicatorSnapshot::ElliottWave(
                self.get_elliott_wave(symbol, interval, limit, settings).await?,
            ),
        })
    }
}

fn indicator_query(
    symbol: &str,
    interval: Interval,
    limit: u32,
    settings: &IndicatorSettings,
    kind: IndicatorKind,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("symbol", symbol.to_owned()),
        ("timeframe", interval.as_str().to_owned()),
        ("limit", limit.to_string()),
    ];
    query.extend(settings.query_pairs(kind));
    query
}

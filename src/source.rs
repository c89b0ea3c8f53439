//! The data provider seam used by the chart engine.
//!
//! [`ChartDataSource`] is everything the synchronizer, live feed and
//! indicator cache need from a backend. [`ChartApiClient`] implements it
//! over REST; tests and embedders can plug in their own provider.

use std::future::Future;

use crate::client::ChartApiClient;
use crate::error::Result;
use crate::types::candle::{Candle, SessionKey};
use crate::types::indicators::{IndicatorKind, IndicatorSettings, IndicatorSnapshot};

/// Asynchronous provider of candles, last prices and indicator geometry.
///
/// Implementations must be shareable across tasks: the controller holds
/// the source in an `Arc` and issues requests from spawned tasks.
pub trait ChartDataSource: Send + Sync + 'static {
    /// Up to `limit` candles for the session, oldest first. With
    /// `end_time_ms`, only candles at or before that instant.
    fn candles(
        &self,
        key: &SessionKey,
        limit: u32,
        end_time_ms: Option<i64>,
    ) -> impl Future<Output = Result<Vec<Candle>>> + Send;

    /// Last traded price of `symbol`.
    fn latest_price(&self, symbol: &str) -> impl Future<Output = Result<f64>> + Send;

    /// One indicator response computed over the last `limit` candles.
    fn indicator(
        &self,
        kind: IndicatorKind,
        key: &SessionKey,
        limit: u32,
        settings: &IndicatorSettings,
    ) -> impl Future<Output = Result<IndicatorSnapshot>> + Send;
}

impl ChartDataSource for ChartApiClient {
    async fn candles(
        &self,
        key: &SessionKey,
        limit: u32,
        end_time_ms: Option<i64>,
    ) -> Result<Vec<Candle>> {
        self.get_candles(&key.symbol, key.interval, limit, end_time_ms)
            .await
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64> {
        self.get_latest_price(symbol).await
    }

    async fn indicator(
        &self,
        kind: IndicatorKind,
        key: &SessionKey,
        limit: u32,
        settings: &IndicatorSettings,
    ) -> Result<IndicatorSnapshot> {
        self.get_indicator(kind, &key.symbol, key.interval, limit, settings)
            .await
    }
}

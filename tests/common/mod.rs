//! Scripted in-memory data source shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use livechart_rs::error::{ChartError, Result};
use livechart_rs::source::ChartDataSource;
use livechart_rs::types::*;

pub const BAR: i64 = 300;
pub const T0: i64 = 1_700_000_100;

pub fn bar_time(i: i64) -> i64 {
    T0 + i * BAR
}

pub fn candle(i: i64, close: f64) -> Candle {
    Candle::new(bar_time(i), close, close + 1.0, close - 1.0, close)
}

pub fn bars(range: std::ops::Range<i64>) -> Vec<Candle> {
    range.map(|i| candle(i, 100.0 + i as f64)).collect()
}

/// Backend-style date string of bar `i`.
pub fn bar_date(i: i64) -> String {
    chrono::DateTime::from_timestamp(bar_time(i), 0)
        .unwrap()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

pub fn key(symbol: &str) -> SessionKey {
    SessionKey::new(symbol, Interval::M5)
}

/// Serves candles from a fixed per-symbol history and counts every call.
#[derive(Default)]
pub struct FakeSource {
    history: Mutex<HashMap<String, Vec<Candle>>>,
    delays: Mutex<HashMap<String, Duration>>,
    snapshots: Mutex<HashMap<IndicatorKind, IndicatorSnapshot>>,
    failing_loads: AtomicUsize,
    pub latest_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
    pub price_calls: AtomicUsize,
    pub indicator_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.history.lock().unwrap().insert(symbol.to_owned(), candles);
        self
    }

    /// Delay every candle response for `symbol`.
    pub fn with_delay(self, symbol: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(symbol.to_owned(), delay);
        self
    }

    pub fn with_snapshot(self, snapshot: IndicatorSnapshot) -> Self {
        self.snapshots.lock().unwrap().insert(snapshot.kind(), snapshot);
        self
    }

    /// Fail the next `n` latest-candle requests.
    pub fn failing_loads(self, n: usize) -> Self {
        self.failing_loads.store(n, Ordering::SeqCst);
        self
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn indicator_calls(&self) -> usize {
        self.indicator_calls.load(Ordering::SeqCst)
    }

    fn slice(&self, symbol: &str, limit: u32, end_time_ms: Option<i64>) -> Vec<Candle> {
        let history = self.history.lock().unwrap();
        let all = history.get(symbol).cloned().unwrap_or_default();
        let eligible: Vec<Candle> = all
            .into_iter()
            .filter(|c| end_time_ms.is_none_or(|end| c.time * 1000 <= end))
            .collect();
        let skip = eligible.len().saturating_sub(limit as usize);
        eligible[skip..].to_vec()
    }
}

impl ChartDataSource for FakeSource {
    async fn candles(&self, key: &SessionKey, limit: u32, end_time_ms: Option<i64>) -> Result<Vec<Candle>> {
        match end_time_ms {
            Some(_) => self.page_calls.fetch_add(1, Ordering::SeqCst),
            None => self.latest_calls.fetch_add(1, Ordering::SeqCst),
        };

        let delay = self.delays.lock().unwrap().get(&key.symbol).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if end_time_ms.is_none()
            && self
                .failing_loads
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(ChartError::InvalidArgument("scripted failure".to_owned()));
        }
        Ok(self.slice(&key.symbol, limit, end_time_ms))
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let last = self.slice(symbol, 1, None);
        Ok(last.first().map(|c| c.close + 0.5).unwrap_or(1.0))
    }

    async fn indicator(
        &self,
        kind: IndicatorKind,
        _key: &SessionKey,
        _limit: u32,
        _settings: &IndicatorSettings,
    ) -> Result<IndicatorSnapshot> {
        self.indicator_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.snapshots.lock().unwrap().get(&kind).cloned();
        Ok(scripted.unwrap_or(match kind {
            IndicatorKind::SupportResistance => IndicatorSnapshot::SupportResistance(Vec::new()),
            IndicatorKind::MarketStructure => IndicatorSnapshot::MarketStructure(StructureResult::default()),
            IndicatorKind::ElliottWave => IndicatorSnapshot::ElliottWave(ElliottWaveResult::default()),
        }))
    }
}

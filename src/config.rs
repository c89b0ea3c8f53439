//! Runtime configuration for the chart engine.
//!
//! [`ChartConfig`] holds every cadence, page size and threshold the engine
//! uses. Build one with [`ChartConfigBuilder`], start from
//! [`ChartConfig::default`], or read `CHART_*` environment variables with
//! [`ChartConfig::from_env`].

use std::env;
use std::time::Duration;

use crate::constants::*;

/// Configuration for the [`ChartController`](crate::chart::controller::ChartController).
#[derive(Debug, Clone)]
pub struct ChartConfig {
    /// Base URL of the chart backend.
    pub base_url: String,
    /// Candles requested by the initial load.
    pub initial_candles: u32,
    /// Candles requested per backward history page.
    pub history_page: u32,
    /// Left-edge distance (in bars) that triggers a backward page.
    pub backward_threshold_bars: u32,
    /// Candles requested by each live candle poll.
    pub poll_candles: u32,
    /// Last-price tick cadence.
    pub price_tick_interval: Duration,
    /// Full-candle poll cadence.
    pub candle_poll_interval: Duration,
    /// Delay applied to indicator setting changes before refetching.
    pub indicator_debounce: Duration,
    /// Animation frame cadence used to coalesce redraws.
    pub frame_interval: Duration,
    /// Pane width (CSS pixels) below which labels are hidden.
    pub compact_width: f64,
    /// Bars that order/breaker blocks extend past the last candle.
    pub block_extension_bars: u32,
    /// Whether the live feed (ticks + polls) runs after the initial load.
    pub live_updates: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            base_url: API_BASE_URL.to_owned(),
            initial_candles: DEFAULT_INITIAL_CANDLES,
            history_page: DEFAULT_HISTORY_PAGE,
            backward_threshold_bars: DEFAULT_BACKWARD_THRESHOLD_BARS,
            poll_candles: DEFAULT_POLL_CANDLES,
            price_tick_interval: Duration::from_millis(DEFAULT_PRICE_TICK_MS),
            candle_poll_interval: Duration::from_millis(DEFAULT_CANDLE_POLL_MS),
            indicator_debounce: Duration::from_millis(DEFAULT_INDICATOR_DEBOUNCE_MS),
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            compact_width: DEFAULT_COMPACT_WIDTH,
            block_extension_bars: DEFAULT_BLOCK_EXTENSION_BARS,
            live_updates: true,
        }
    }
}

impl ChartConfig {
    /// Read configuration from `CHART_*` environment variables.
    ///
    /// Missing or unparsable variables fall back to the defaults.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `CHART_API_URL` | `base_url` |
    /// | `CHART_INITIAL_CANDLES` | `initial_candles` |
    /// | `CHART_HISTORY_PAGE` | `history_page` |
    /// | `CHART_BACKWARD_THRESHOLD` | `backward_threshold_bars` |
    /// | `CHART_PRICE_TICK_MS` | `price_tick_interval` |
    /// | `CHART_CANDLE_POLL_MS` | `candle_poll_interval` |
    /// | `CHART_DEBOUNCE_MS` | `indicator_debounce` |
    /// | `CHART_COMPACT_WIDTH` | `compact_width` |
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: env_str("CHART_API_URL", &d.base_url),
            initial_candles: env_parse("CHART_INITIAL_CANDLES", d.initial_candles),
            history_page: env_parse("CHART_HISTORY_PAGE", d.history_page),
            backward_threshold_bars: env_parse(
                "CHART_BACKWARD_THRESHOLD",
                d.backward_threshold_bars,
            ),
            poll_candles: d.poll_candles,
            price_tick_interval: env_millis("CHART_PRICE_TICK_MS", d.price_tick_interval),
            candle_poll_interval: env_millis("CHART_CANDLE_POLL_MS", d.candle_poll_interval),
            indicator_debounce: env_millis("CHART_DEBOUNCE_MS", d.indicator_debounce),
            frame_interval: d.frame_interval,
            compact_width: env_parse("CHART_COMPACT_WIDTH", d.compact_width),
            block_extension_bars: d.block_extension_bars,
            live_updates: d.live_updates,
        }
    }
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_millis(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`ChartConfig`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use livechart_rs::config::ChartConfigBuilder;
///
/// let config = ChartConfigBuilder::new("http://localhost:8080/api")
///     .initial_candles(500)
///     .indicator_debounce(Duration::from_millis(250))
///     .build();
/// assert_eq!(config.initial_candles, 500);
/// ```
#[derive(Debug, Clone)]
pub struct ChartConfigBuilder {
    config: ChartConfig,
}

impl ChartConfigBuilder {
    /// Start from the defaults with the given backend base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: ChartConfig {
                base_url: base_url.into(),
                ..ChartConfig::default()
            },
        }
    }

    /// Candles requested by the initial load. Default: 1,000.
    pub fn initial_candles(mut self, n: u32) -> Self {
        self.config.initial_candles = n.max(1);
        self
    }

    /// Candles requested per backward page. Default: 500.
    pub fn history_page(mut self, n: u32) -> Self {
        self.config.history_page = n.max(1);
        self
    }

    /// Paging trigger distance in bars. Default: 10.
    pub fn backward_threshold_bars(mut self, n: u32) -> Self {
        self.config.backward_threshold_bars = n;
        self
    }

    /// Candles requested per live poll (1–2 is typical). Default: 2.
    pub fn poll_candles(mut self, n: u32) -> Self {
        self.config.poll_candles = n.max(1);
        self
    }

    /// Last-price tick cadence. Default: 500 ms.
    pub fn price_tick_interval(mut self, every: Duration) -> Self {
        self.config.price_tick_interval = every;
        self
    }

    /// Full-candle poll cadence. Default: 5 s.
    pub fn candle_poll_interval(mut self, every: Duration) -> Self {
        self.config.candle_poll_interval = every;
        self
    }

    /// Indicator setting debounce. Default: 300 ms.
    pub fn indicator_debounce(mut self, delay: Duration) -> Self {
        self.config.indicator_debounce = delay;
        self
    }

    /// Redraw coalescing cadence. Default: 16 ms.
    pub fn frame_interval(mut self, every: Duration) -> Self {
        self.config.frame_interval = every;
        self
    }

    /// Compact-mode width threshold. Default: 480 px.
    pub fn compact_width(mut self, px: f64) -> Self {
        self.config.compact_width = px;
        self
    }

    /// Order/breaker block extension past the last bar. Default: 20.
    pub fn block_extension_bars(mut self, n: u32) -> Self {
        self.config.block_extension_bars = n;
        self
    }

    /// Enable or disable the live feed. Default: true.
    pub fn live_updates(mut self, enable: bool) -> Self {
        self.config.live_updates = enable;
        self
    }

    /// Build the [`ChartConfig`].
    pub fn build(self) -> ChartConfig {
        self.config
    }
}

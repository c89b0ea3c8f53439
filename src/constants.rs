//! Constants for the chart engine.
//!
//! Contains the default backend URL, endpoint paths, cadence defaults and
//! fixed rendering values. Every cadence and threshold here is only a
//! default: [`ChartConfig`](crate::config::ChartConfig) carries the values
//! actually used at runtime.

// ---------------------------------------------------------------------------
// Base URL & endpoints
// ---------------------------------------------------------------------------

/// Default base URL for the chart backend.
pub const API_BASE_URL: &str = "http://localhost:8080/api";

/// Candle history endpoint.
pub const CANDLES_PATH: &str = "/candles";

/// Latest price endpoint prefix (`/price/{symbol}`).
pub const PRICE_PATH: &str = "/price";

/// Support/resistance indicator endpoint.
pub const SUPPORT_RESISTANCE_PATH: &str = "/indicators/support-resistance";

/// Market structure (order blocks, breaker blocks, MSB) endpoint.
pub const MARKET_STRUCTURE_PATH: &str = "/indicators/market-structure";

/// Elliott wave endpoint.
pub const ELLIOTT_WAVE_PATH: &str = "/indicators/elliott-wave";

// ---------------------------------------------------------------------------
// Synchronizer defaults
// ---------------------------------------------------------------------------

/// Candles requested by the initial load.
pub const DEFAULT_INITIAL_CANDLES: u32 = 1000;

/// Candles requested per backward history page.
pub const DEFAULT_HISTORY_PAGE: u32 = 500;

/// Bars between the visible left edge and the array start that trigger paging.
pub const DEFAULT_BACKWARD_THRESHOLD_BARS: u32 = 10;

/// Candles requested by each live candle poll.
pub const DEFAULT_POLL_CANDLES: u32 = 2;

/// Last-price tick cadence (milliseconds).
pub const DEFAULT_PRICE_TICK_MS: u64 = 500;

/// Full-candle poll cadence (milliseconds).
pub const DEFAULT_CANDLE_POLL_MS: u64 = 5_000;

/// Delay applied to indicator parameter changes (milliseconds).
pub const DEFAULT_INDICATOR_DEBOUNCE_MS: u64 = 300;

/// Animation frame cadence (milliseconds).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Pane width (CSS pixels) below which labels are suppressed.
pub const DEFAULT_COMPACT_WIDTH: f64 = 480.0;

/// Bars that order/breaker blocks extend past the last candle.
pub const DEFAULT_BLOCK_EXTENSION_BARS: u32 = 20;

/// Fibonacci retracement ratios, in drawing order.
pub const FIBONACCI_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// Colour palette cycled through by new drawings.
pub const DRAWING_PALETTE: [&str; 6] = [
    "#2962ff", "#f23645", "#089981", "#ff9800", "#9c27b0", "#00bcd4",
];

//! # livechart-rs
//!
//! A live candlestick chart engine: it keeps a candle series in sync with a
//! chart backend (initial load, backward history paging, price ticks and
//! candle polls), caches indicator geometry, and turns indicators and user
//! drawings into a draw-command list for an overlay canvas.
//!
//! ## Quick Start
//!
//! ```no_run
//! use livechart_rs::ChartApiClient;
//! use livechart_rs::types::{Interval, SessionKey};
//!
//! #[tokio::main]
//! async fn main() -> livechart_rs::Result<()> {
//!     let client = ChartApiClient::with_base_url("http://localhost:8080/api");
//!     let key = SessionKey::new("BTCUSDT", Interval::H1);
//!     let candles = client.get_candles(&key.symbol, key.interval, 500, None).await?;
//!     println!("{} candles", candles.len());
//!     Ok(())
//! }
//! ```
//!
//! To drive a full chart, hand a [`ChartController`] a host implementing
//! [`BaseChart`](chart::BaseChart) and [`OverlaySurface`](chart::OverlaySurface)
//! and call [`ChartController::run`].

pub mod api;
pub mod chart;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod live;
pub mod source;
pub mod types;

/// Re-export the backend client at crate root for convenience.
pub use client::ChartApiClient;
/// Re-export the error type and Result alias.
pub use error::{ChartError, Result};

pub use chart::ChartController;
pub use config::ChartConfig;

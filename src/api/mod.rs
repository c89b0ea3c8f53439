//! REST API endpoint implementations.
//!
//! Each sub-module adds `async` methods to
//! [`ChartApiClient`](crate::client::ChartApiClient) via `impl` blocks.
//!
//! ## Modules
//!
//! | Module | Endpoints | Description |
//! |---|---|---|
//! | [`candles`] | 1 | OHLC candles, latest or ending at a time |
//! | [`price`] | 1 | Last traded price |
//! | [`indicators`] | 3 | Support/resistance, market structure, Elliott waves |

pub mod candles;
pub mod indicators;
pub mod price;

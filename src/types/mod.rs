//! Data types shared by the client and the chart engine.
//!
//! ## Organization
//!
//! - [`candle`]: Candles, intervals and the `(symbol, interval)` session key
//! - [`indicators`]: Support/resistance, market-structure and Elliott-wave geometry
//! - [`drawing`]: User drawings and the in-progress drawing state
//! - [`lenient`]: Array decoding that skips malformed elements
//!
//! The most used types are re-exported at the module root.

pub mod candle;
pub mod drawing;
pub mod indicators;
pub mod lenient;

pub use candle::{Candle, Interval, SessionKey};
pub use drawing::{Drawing, DrawingPoint, DrawingState, DrawingType};
pub use indicators::*;
pub use lenient::Lenient;

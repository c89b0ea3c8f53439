//! The chart engine.
//!
//! ## Organization
//!
//! - [`coords`]: date parsing, nearest-candle snapping and the [`Projector`](coords::Projector) seam
//! - [`session`]: history/live candle synchronizer with session guards
//! - [`indicators`]: indicator geometry cache with generation-tagged refreshes
//! - [`drawing`]: gesture state for user drawings
//! - [`geometry`]: draw commands for drawings, Fibonacci levels
//! - [`overlay`]: draw commands for indicator geometry
//! - [`render`]: draw-command list, frame composition and redraw coalescing
//! - [`controller`]: single owner tying the pieces to a host chart

pub mod controller;
pub mod coords;
pub mod drawing;
pub mod geometry;
pub mod indicators;
pub mod overlay;
pub mod render;
pub mod session;

pub use controller::{BaseChart, ChartCommand, ChartController, ChartUpdate, OverlaySurface, SeriesUpdate};
pub use coords::{CoordinateMapper, LogicalScale, Projector};
pub use render::{DrawCommand, Frame, FrameScheduler, OverlayRenderer, Pane};
pub use session::{SessionId, Synchronizer};

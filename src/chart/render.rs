//! Overlay rendering: draw commands, frames and redraw coalescing.
//!
//! Geometry layers never touch a canvas. They append [`DrawCommand`]s to a
//! list, and the host paints a finished [`Frame`] in a single pass. The
//! [`OverlayRenderer`] fixes the layer order; the [`FrameScheduler`]
//! collapses any number of redraw requests between two animation frames
//! into one paint.

use crate::chart::coords::{CoordinateMapper, Projector};
use crate::chart::indicators::IndicatorCache;
use crate::chart::{geometry, overlay};
use crate::config::ChartConfig;
use crate::types::drawing::DrawingState;

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Host pane metrics, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pane {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Pane {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }
}

/// A point in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An sRGB colour with alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rrggbb` or `#rgb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
                Some(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => None,
        }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

pub const BULLISH: Rgba = Rgba::rgb(8, 153, 129);
pub const BEARISH: Rgba = Rgba::rgb(242, 54, 69);
pub const NEUTRAL: Rgba = Rgba::rgb(120, 123, 134);

/// Stroke pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// Line colour, width and pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgba,
    pub width: f64,
    pub style: LineStyle,
}

impl Stroke {
    pub fn solid(color: Rgba, width: f64) -> Self {
        Self {
            color,
            width,
            style: LineStyle::Solid,
        }
    }

    pub fn dashed(color: Rgba, width: f64) -> Self {
        Self {
            color,
            width,
            style: LineStyle::Dashed,
        }
    }
}

/// Horizontal anchoring of a label relative to its point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// One paint operation, in CSS pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Clear the whole overlay.
    Clear,
    /// Axis-aligned box.
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Option<Rgba>,
        stroke: Option<Stroke>,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Polyline {
        points: Vec<Point>,
        stroke: Stroke,
    },
    Label {
        at: Point,
        text: String,
        color: Rgba,
        align: TextAlign,
    },
    /// Filled circle marking a drawing anchor.
    Handle {
        at: Point,
        radius: f64,
        color: Rgba,
    },
}

impl DrawCommand {
    pub fn is_label(&self) -> bool {
        matches!(self, Self::Label { .. })
    }
}

/// Per-frame inputs shared by every geometry function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub pane: Pane,
    /// Labels are suppressed in compact mode.
    pub compact: bool,
}

impl RenderContext {
    /// Push a label unless the pane is in compact mode.
    pub fn label(&self, out: &mut Vec<DrawCommand>, at: Point, text: String, color: Rgba, align: TextAlign) {
        if !self.compact {
            out.push(DrawCommand::Label {
                at,
                text,
                color,
                align,
            });
        }
    }
}

/// Backing-store size of the overlay canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub css_width: f64,
    pub css_height: f64,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub device_pixel_ratio: f64,
}

impl CanvasSize {
    /// Size the backing store for `pane`, rounding to whole device pixels.
    pub fn for_pane(pane: Pane) -> Self {
        let dpr = if pane.device_pixel_ratio.is_finite() && pane.device_pixel_ratio > 0.0 {
            pane.device_pixel_ratio
        } else {
            1.0
        };
        let px = |css: f64| (css.max(0.0) * dpr).round() as u32;
        Self {
            css_width: pane.width,
            css_height: pane.height,
            pixel_width: px(pane.width),
            pixel_height: px(pane.height),
            device_pixel_ratio: dpr,
        }
    }
}

/// A complete overlay picture.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub canvas: CanvasSize,
    pub compact: bool,
    pub commands: Vec<DrawCommand>,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Composes indicator geometry and drawings into a [`Frame`].
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    compact_width: f64,
    block_extension_bars: u32,
}

impl OverlayRenderer {
    pub fn new(compact_width: f64, block_extension_bars: u32) -> Self {
        Self {
            compact_width,
            block_extension_bars,
        }
    }

    pub fn from_config(config: &ChartConfig) -> Self {
        Self::new(config.compact_width, config.block_extension_bars)
    }

    /// Paint everything in layer order: support/resistance, order and
    /// breaker blocks, structure breaks, Elliott waves, drawings, then the
    /// drawing being dragged.
    pub fn render<P: Projector + ?Sized>(
        &self,
        candle_times: &[i64],
        indicators: &IndicatorCache,
        drawings: &DrawingState,
        projector: &P,
        pane: Pane,
    ) -> Frame {
        let ctx = RenderContext {
            pane,
            compact: pane.width < self.compact_width,
        };
        let mapper = CoordinateMapper::new(candle_times, projector);
        let mut out = vec![DrawCommand::Clear];

        let future_x = match (mapper.last_x(), mapper.average_bar_width()) {
            (Some(last), Some(bar)) => last + bar * self.block_extension_bars as f64,
            _ => pane.width,
        };

        if let Some(levels) = indicators.support_resistance() {
            overlay::support_resistance(levels, &mapper, &ctx, &mut out);
        }
        if let Some(structure) = indicators.market_structure() {
            overlay::order_blocks(&structure.order_blocks, future_x, &mapper, &ctx, &mut out);
            overlay::breaker_blocks(&structure.breaker_blocks, future_x, &mapper, &ctx, &mut out);
            overlay::structure_breaks(&structure.market_structure_breaks, &mapper, &ctx, &mut out);
        }
        if let Some(waves) = indicators.elliott_wave() {
            overlay::elliott_waves(waves, &mapper, &ctx, &mut out);
        }

        for drawing in &drawings.drawings {
            geometry::render_drawing(drawing, &mapper, &ctx, &mut out);
        }
        if let Some(active) = &drawings.active_drawing {
            geometry::render_drawing(active, &mapper, &ctx, &mut out);
        }

        Frame {
            canvas: CanvasSize::for_pane(pane),
            compact: ctx.compact,
            commands: out,
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Collapses redraw requests into at most one paint per animation frame.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: bool,
    requested: u64,
    painted: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a repaint on the next frame.
    pub fn request(&mut self) {
        self.pending = true;
        self.requested += 1;
    }

    /// Called once per frame: `true` if a paint is due.
    pub fn take(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        self.pending = false;
        self.painted += 1;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Total `request()` calls.
    pub fn requested(&self) -> u64 {
        self.requested
    }

    /// Total paints handed out by `take()`.
    pub fn painted(&self) -> u64 {
        self.painted
    }
}

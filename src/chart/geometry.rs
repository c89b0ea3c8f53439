//! Drawing geometry: horizontal lines, trend lines, rectangles and
//! Fibonacci retracements.
//!
//! Pure functions from a [`Drawing`] to draw commands. A drawing in
//! progress goes through exactly the same path as a committed one.

use crate::chart::coords::{CoordinateMapper, Projector};
use crate::chart::overlay::format_price;
use crate::chart::render::{DrawCommand, Point, RenderContext, Rgba, Stroke, TextAlign};
use crate::constants::{DRAWING_PALETTE, FIBONACCI_RATIOS};
use crate::types::drawing::{Drawing, DrawingPoint, DrawingType};

/// One Fibonacci retracement level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Retracement levels between `p0` (ratio 0) and `p1` (ratio 1).
///
/// Interpolated as `p0 * (1 - r) + p1 * r` so the end levels equal the
/// anchors exactly.
///
/// ```
/// use livechart_rs::chart::geometry::fibonacci_levels;
///
/// let levels = fibonacci_levels(100.0, 200.0);
/// assert_eq!(levels[0].price, 100.0);
/// assert_eq!(levels[6].price, 200.0);
/// assert!((levels[4].price - 161.8).abs() < 1e-9);
/// ```
pub fn fibonacci_levels(p0: f64, p1: f64) -> Vec<FibLevel> {
    FIBONACCI_RATIOS
        .iter()
        .map(|&ratio| FibLevel {
            ratio,
            price: p0 * (1.0 - ratio) + p1 * ratio,
        })
        .collect()
}

fn drawing_color(drawing: &Drawing) -> Rgba {
    Rgba::from_hex(&drawing.color)
        .or_else(|| Rgba::from_hex(DRAWING_PALETTE[0]))
        .unwrap_or(Rgba::rgb(41, 98, 255))
}

fn project<P: Projector + ?Sized>(mapper: &CoordinateMapper<'_, P>, point: &DrawingPoint) -> Option<Point> {
    Some(Point::new(mapper.time_to_x(point.time)?, mapper.price_to_y(point.price)?))
}

fn anchors<P: Projector + ?Sized>(drawing: &Drawing, mapper: &CoordinateMapper<'_, P>) -> Option<(Point, Point)> {
    match drawing.points.as_slice() {
        [a, b] => Some((project(mapper, a)?, project(mapper, b)?)),
        _ => None,
    }
}

/// Render any drawing by dispatching on its type.
pub fn render_drawing<P: Projector + ?Sized>(
    drawing: &Drawing,
    mapper: &CoordinateMapper<'_, P>,
    ctx: &RenderContext,
    out: &mut Vec<DrawCommand>,
) {
    match drawing.kind {
        DrawingType::HorizontalLine => horizontal_line(drawing, mapper, ctx, out),
        DrawingType::TrendLine => trend_line(drawing, mapper, ctx, out),
        DrawingType::Rectangle => rectangle(drawing, mapper, ctx, out),
        DrawingType::Fibonacci => fibonacci(drawing, mapper, ctx, out),
    }
}

/// Full-width line at the drawing's price, labelled at the right edge.
pub fn horizontal_line<P: Projector + ?Sized>(
    drawing: &Drawing,
    mapper: &CoordinateMapper<'_, P>,
    ctx: &RenderContext,
    out: &mut Vec<DrawCommand>,
) {
    let Some(price) = drawing.price.or_else(|| drawing.points.first().map(|p| p.price)) else {
        return;
    };
    let Some(y) = mapper.price_to_y(price) else {
        return;
    };
    let color = drawing_color(drawing);
    out.push(DrawCommand::Line {
        from: Point::new(0.0, y),
        to: Point::new(ctx.pane.width, y),
        stroke: Stroke::solid(color, 1.0),
    });
    ctx.label(
        out,
        Point::new(ctx.pane.width - 4.0, y - 4.0),
        format_price(price),
        color,
        TextAlign::Right,
    );
}

/// Segment between the two anchors, with a handle on each end.
pub fn trend_line<P: Projector + ?Sized>(
    drawing: &Drawing,
    mapper: &CoordinateMapper<'_, P>,
    _ctx: &RenderContext,
    out: &mut Vec<DrawCommand>,
) {
    let Some((a, b)) = anchors(drawing, mapper) else {
        return;
    };
    let color = drawing_color(drawing);
    out.push(DrawCommand::Line {
        from: a,
        to: b,
        stroke: Stroke::solid(color, 2.0),
    });
    for at in [a, b] {
        out.push(DrawCommand::Handle {
            at,
            radius: 4.0,
            color,
        });
    }
}

/// Box spanned by the two anchors: translucent fill plus border.
pub fn rectangle<P: Projector + ?Sized>(
    drawing: &Drawing,
    mapper: &CoordinateMapper<'_, P>,
    _ctx: &RenderContext,
    out: &mut Vec<DrawCommand>,
) {
    let Some((a, b)) = anchors(drawing, mapper) else {
        return;
    };
    let color = drawing_color(drawing);
    out.push(DrawCommand::Rect {
        x: a.x.min(b.x),
        y: a.y.min(b.y),
        width: (a.x - b.x).abs(),
        height: (a.y - b.y).abs(),
        fill: Some(color.with_alpha(0.15)),
        stroke: Some(Stroke::solid(color, 1.0)),
    });
}

/// Retracement guides between the anchors' X span, one per ratio, plus a
/// faint connector from anchor to anchor.
pub fn fibonacci<P: Projector + ?Sized>(
    drawing: &Drawing,
    mapper: &CoordinateMapper<'_, P>,
    ctx: &RenderContext,
    out: &mut Vec<DrawCommand>,
) {
    let Some((a, b)) = anchors(drawing, mapper) else {
        return;
    };
    let (p0, p1) = (drawing.points[0].price, drawing.points[1].price);
    let color = drawing_color(drawing);
    let (left, right) = (a.x.min(b.x), a.x.max(b.x));

    for level in fibonacci_levels(p0, p1) {
        let Some(y) = mapper.price_to_y(level.price) else {
            continue;
        };
        out.push(DrawCommand::Line {
            from: Point::new(left, y),
            to: Point::new(right, y),
            stroke: Stroke::solid(color.with_alpha(0.8), 1.0),
        });
        ctx.label(
            out,
            Point::new(left + 4.0, y - 3.0),
            format!("{:.1}% ({})", level.ratio * 100.0, format_price(level.price)),
            color,
            TextAlign::Left,
        );
    }

    out.push(DrawCommand::Line {
        from: a,
        to: b,
        stroke: Stroke::dashed(color.with_alpha(0.35), 1.0),
    });
}

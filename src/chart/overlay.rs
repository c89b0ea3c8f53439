//! Indicator geometry: support/resistance boxes, order and breaker
//! blocks, market structure breaks and Elliott-wave polylines.
//!
//! Each function resolves dates and prices through the
//! [`CoordinateMapper`] and skips any element it cannot place.

use crate::chart::coords::{CoordinateMapper, Projector};
use crate::chart::render::{
    BEARISH, BULLISH, DrawCommand, NEUTRAL, Point, RenderContext, Rgba, Stroke, TextAlign,
};
use crate::types::indicators::*;

fn bias_color(bias: Bias) -> Rgba {
    match bias {
        Bias::Bullish => BULLISH,
        Bias::Bearish => BEARISH,
    }
}

/// Support/resistance bands from their start date to the right edge.
pub fn support_resistance<P: Projector + ?Sized>(
    levels: &[SrLevel],
    mapper: &CoordinateMapper<'_, P>,
    ctx: &RenderContext,
    out: &mut Vec<DrawCommand>,
) {
    for level in levels {
        let Some(x) = mapper.date_to_x(&level.date) else {
            continue;
        };
        let (Some(y_a), Some(y_b)) = (mapper.price_to_y(level.y), mapper.price_to_y(level.area)) else {
            continue;
        };
        let color = if level.is_support { BULLISH } else { BEARISH };
        let top = y_a.min(y_b);
        out.push(DrawCommand::Rect {
            x,
            y: top,
            width: (ctx.pane.width - x).max(0.0),
            height: (y_a - y_b).abs(),
            fill: Some(color.with_alpha(0.15)),
            stroke: Some(Stroke::solid(color.with_alpha(0.6), 1.0)),
        });
        let tag = if level.is_support { "S" } else { "R" };
        ctx.label(
            out,
            Point::new(ctx.pane.width - 4.0, top - 2.0),
            format!("{tag} {}", format_price(level.y)),
            color,
            TextAlign::Right,
        );
    }
}

fn blocks<P: Projector + ?Sized>(
    blocks: &[PriceBlock],
    tag: &str,
    border: fn(Rgba) -> Stroke,
    future_x: f64,
    mapper: &CoordinateMapper<'_, P>,
    ctx: &RenderContext,
    out: &mut Vec<DrawCommand>,
) {
    for block in blocks {
        let Some(x) = mapper.date_to_x(&block.candle_date) else {
            continue;
        };
        let (Some(y_high), Some(y_low)) = (mapper.price_to_y(block.high), mapper.price_to_y(block.low)) else {
            continue;
        };
        let color = bias_color(block.kind);
        let alpha = if block.is_mitigated { 0.08 } else { 0.2 };
        let top = y_high.min(y_low);
        out.push(DrawCommand::Rect {
            x,
            y: top,
            width: (future_x - x).max(0.0),
            height: (y_high - y_low).abs(),
            fill: Some(color.with_alpha(alpha)),
            stroke: Some(border(color.with_alpha(alpha * 3.0))),
        });
        ctx.label(out, Point::new(x + 4.0, top + 10.0), tag.to_owned(), color, TextAlign::Left);
    }
}

/// Order blocks, extended to `future_x`; mitigated blocks are fainter.
pub fn order_blocks<P: Projector + ?Sized>(
    order_blocks: &[PriceBlock],
    future_x: f64,
    mapper: &CoordinateMapper<'_, P>,
    ctx: &RenderContext,
    out: &mut Vec<DrawCommand>,
) {
    blocks(order_blocks, "OB", |c| Stroke::solid(c, 1.0), future_x, mapper, ctx, out);
}

/// Breaker blocks: same shape as order blocks, dashed border.
pub fn breaker_blocks<P: Projector + ?Sized>(
    breaker_blocks: &[PriceBlock],
    future_x: f64,
    mapper: &CoordinateMapper<'_, P>,
    ctx: &RenderContext,
    out: &mut Vec<DrawCommand>,
) {
    blocks(breaker_blocks, "BB", |c| Stroke::dashed(c, 1.0), future_x, mapper, ctx, out);
}

/// A dashed line at the broken swing level, from the swing to the break.
pub fn structure_breaks<P: Projector + ?Sized>(
    breaks: &[MarketStructureBreak],
    mapper: &CoordinateMapper<'_, P>,
    ctx: &RenderContext,
    out: &mut Vec<DrawCommand>,
) {
    for msb in breaks {
        let swing = msb.broken_swing();
        let (Some(x0), Some(x1)) = (mapper.date_to_x(&swing.date), mapper.date_to_x(&msb.break_date)) else {
            continue;
        };
        let Some(y) = mapper.price_to_y(swing.price) else {
            continue;
        };
        let color = bias_color(msb.break_type);
        out.push(DrawCommand::Line {
            from: Point::new(x0, y),
            to: Point::new(x1, y),
            stroke: Stroke::dashed(color, 1.5),
        });
        ctx.label(
            out,
            Point::new((x0 + x1) / 2.0, y - 4.0),
            "MSB".to_owned(),
            color,
            TextAlign::Center,
        );
    }
}

/// Zig-zag polyline plus one labelled polyline per wave pattern.
///
/// Vertices that cannot be placed are dropped; a polyline needs two.
pub fn elliott_waves<P: Projector + ?Sized>(
    waves: &ElliottWaveResult,
    mapper: &CoordinateMapper<'_, P>,
    ctx: &RenderContext,
    out: &mut Vec<DrawCommand>,
) {
    let zigzag: Vec<Point> = waves
        .zigzag_points
        .iter()
        .filter_map(|p| Some(Point::new(mapper.date_to_x(&p.date)?, mapper.price_to_y(p.price)?)))
        .collect();
    if zigzag.len() >= 2 {
        out.push(DrawCommand::Polyline {
            points: zigzag,
            stroke: Stroke::solid(NEUTRAL.with_alpha(0.5), 1.0),
        });
    }

    for pattern in &waves.patterns {
        let color = bias_color(pattern.direction);
        let width = match pattern.kind {
            WaveType::Motive => 2.0,
            WaveType::Corrective => 1.5,
        };
        let placed: Vec<(Point, &str)> = pattern
            .points
            .iter()
            .filter_map(|p| {
                let at = Point::new(mapper.date_to_x(&p.date)?, mapper.price_to_y(p.price)?);
                Some((at, p.label.as_str()))
            })
            .collect();
        if placed.len() < 2 {
            continue;
        }
        out.push(DrawCommand::Polyline {
            points: placed.iter().map(|(at, _)| *at).collect(),
            stroke: Stroke::solid(color, width),
        });
        for (at, label) in placed {
            ctx.label(
                out,
                Point::new(at.x, at.y - 6.0),
                label.to_owned(),
                color,
                TextAlign::Center,
            );
        }
    }
}

/// Price text with precision scaled to magnitude.
pub fn format_price(price: f64) -> String {
    if price.abs() >= 1.0 {
        format!("{price:.2}")
    } else {
        format!("{price:.6}")
    }
}

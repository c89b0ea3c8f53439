//! Drawing gestures and drawing geometry.

use livechart_rs::chart::coords::{CoordinateMapper, Projector};
use livechart_rs::chart::drawing::DrawingSession;
use livechart_rs::chart::geometry::{fibonacci_levels, render_drawing};
use livechart_rs::chart::render::{DrawCommand, Pane, Point, RenderContext, Rgba};
use livechart_rs::constants::{DRAWING_PALETTE, FIBONACCI_RATIOS};
use livechart_rs::types::{DrawingPoint, DrawingType};

const TIMES: [i64; 5] = [1_000, 2_000, 3_000, 4_000, 5_000];

/// Bar `i` at `x = 10 * i`; `y = price`.
struct Linear;

impl Projector for Linear {
    fn time_to_x(&self, time: i64) -> Option<f64> {
        TIMES.binary_search(&time).ok().map(|i| i as f64 * 10.0)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        Some(price)
    }
}

struct Unplaced;

impl Projector for Unplaced {
    fn time_to_x(&self, _time: i64) -> Option<f64> {
        None
    }

    fn price_to_y(&self, _price: f64) -> Option<f64> {
        None
    }
}

fn ctx(compact: bool) -> RenderContext {
    RenderContext {
        pane: Pane::new(800.0, 400.0, 1.0),
        compact,
    }
}

fn pt(price: f64, time: i64) -> DrawingPoint {
    DrawingPoint::new(price, time)
}

// ===================================================================
// Fibonacci levels
// ===================================================================

#[test]
fn test_fibonacci_levels_exact_ends() {
    for (p0, p1) in [(100.0, 200.0), (0.1, 0.3), (64_000.5, 61_234.25), (5.0, 5.0)] {
        let levels = fibonacci_levels(p0, p1);
        assert_eq!(levels.len(), FIBONACCI_RATIOS.len());
        assert_eq!(levels[0].price, p0);
        assert_eq!(levels[levels.len() - 1].price, p1);
    }
}

#[test]
fn test_fibonacci_golden_level() {
    let levels = fibonacci_levels(100.0, 200.0);
    let golden = levels.iter().find(|l| l.ratio == 0.618).unwrap();
    assert!((golden.price - 161.8).abs() < 1e-9);
    let half = levels.iter().find(|l| l.ratio == 0.5).unwrap();
    assert_eq!(half.price, 150.0);
}

#[test]
fn test_fibonacci_geometry_and_labels() {
    let mut session = DrawingSession::new();
    session.begin(DrawingType::Fibonacci, pt(100.0, 1_000));
    session.update(pt(200.0, 3_000));
    session.commit();

    let mapper = CoordinateMapper::new(&TIMES, &Linear);
    let mut out = Vec::new();
    render_drawing(&session.drawings()[0], &mapper, &ctx(false), &mut out);

    let guides: Vec<_> = out
        .iter()
        .filter_map(|c| match c {
            DrawCommand::Line { from, to, .. } if from.y == to.y => Some((from.x, to.x)),
            _ => None,
        })
        .collect();
    assert_eq!(guides.len(), FIBONACCI_RATIOS.len());
    assert!(guides.iter().all(|&(l, r)| l == 0.0 && r == 20.0));

    let labels: Vec<&str> = out
        .iter()
        .filter_map(|c| match c {
            DrawCommand::Label { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert!(labels.contains(&"61.8% (161.80)"), "labels: {labels:?}");
    assert!(labels.contains(&"0.0% (100.00)"));
    assert!(labels.contains(&"100.0% (200.00)"));
}

// ===================================================================
// Drawing session
// ===================================================================

#[test]
fn test_trend_line_gesture() {
    let mut session = DrawingSession::new();
    let id = session.begin(DrawingType::TrendLine, pt(100.0, 1_000));
    assert!(session.is_drawing());
    assert!(session.update(pt(150.0, 4_000)));
    assert_eq!(session.active().unwrap().points, vec![pt(100.0, 1_000), pt(150.0, 4_000)]);

    assert_eq!(session.commit(), Some(id));
    assert!(!session.is_drawing());
    assert!(session.active().is_none());
    assert_eq!(session.drawings().len(), 1);
    assert!(!session.update(pt(1.0, 1_000)));
}

#[test]
fn test_zero_length_drawing_is_discarded() {
    let mut session = DrawingSession::new();
    session.begin(DrawingType::Rectangle, pt(100.0, 1_000));
    assert_eq!(session.commit(), None);
    assert!(session.drawings().is_empty());
    assert!(!session.is_drawing());
}

#[test]
fn test_horizontal_line_follows_price() {
    let mut session = DrawingSession::new();
    session.begin(DrawingType::HorizontalLine, pt(100.0, 1_000));
    session.update(pt(120.0, 2_000));
    let id = session.commit().expect("horizontal lines need one anchor");
    let line = &session.drawings()[0];
    assert_eq!(line.id, id);
    assert_eq!(line.price, Some(120.0));
    assert_eq!(line.points.len(), 1);
}

#[test]
fn test_colors_cycle_and_ids_increase() {
    let mut session = DrawingSession::new();
    let mut ids = Vec::new();
    for i in 0..DRAWING_PALETTE.len() + 1 {
        ids.push(session.begin(DrawingType::TrendLine, pt(1.0, 1_000)));
        session.update(pt(2.0, 2_000 + i as i64));
        session.commit();
    }
    let colors: Vec<&str> = session.drawings().iter().map(|d| d.color.as_str()).collect();
    assert_eq!(&colors[..DRAWING_PALETTE.len()], &DRAWING_PALETTE[..]);
    assert_eq!(colors[DRAWING_PALETTE.len()], DRAWING_PALETTE[0]);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_cancel_remove_clear() {
    let mut session = DrawingSession::new();
    session.begin(DrawingType::TrendLine, pt(1.0, 1_000));
    session.update(pt(2.0, 2_000));
    let keep = session.commit().unwrap();

    session.begin(DrawingType::Rectangle, pt(1.0, 1_000));
    assert!(session.cancel());
    assert!(!session.cancel());
    assert_eq!(session.drawings().len(), 1);

    assert!(!session.remove(keep + 100));
    assert!(session.remove(keep));
    assert!(session.drawings().is_empty());

    session.begin(DrawingType::Fibonacci, pt(1.0, 1_000));
    session.clear();
    assert!(session.active().is_none());
    assert!(!session.is_drawing());
}

// ===================================================================
// Geometry
// ===================================================================

#[test]
fn test_trend_line_has_handles() {
    let mut session = DrawingSession::new();
    session.begin(DrawingType::TrendLine, pt(100.0, 1_000));
    session.update(pt(200.0, 3_000));
    session.commit();

    let mapper = CoordinateMapper::new(&TIMES, &Linear);
    let mut out = Vec::new();
    render_drawing(&session.drawings()[0], &mapper, &ctx(false), &mut out);

    assert!(matches!(
        &out[0],
        DrawCommand::Line { from, to, .. } if *from == Point::new(0.0, 100.0) && *to == Point::new(20.0, 200.0)
    ));
    let handles = out.iter().filter(|c| matches!(c, DrawCommand::Handle { .. })).count();
    assert_eq!(handles, 2);
}

#[test]
fn test_rectangle_normalizes_corners() {
    let mut session = DrawingSession::new();
    session.begin(DrawingType::Rectangle, pt(200.0, 4_000));
    session.update(pt(100.0, 2_000));
    session.commit();

    let mapper = CoordinateMapper::new(&TIMES, &Linear);
    let mut out = Vec::new();
    render_drawing(&session.drawings()[0], &mapper, &ctx(false), &mut out);

    let DrawCommand::Rect { x, y, width, height, fill, .. } = &out[0] else {
        panic!("expected a rect, got {:?}", out[0]);
    };
    assert_eq!((*x, *y, *width, *height), (10.0, 100.0, 20.0, 100.0));
    assert_eq!(fill.map(|f| f.a), Some(0.15));
}

#[test]
fn test_in_progress_drawing_snaps_to_candles() {
    let mut session = DrawingSession::new();
    session.begin(DrawingType::TrendLine, pt(100.0, 1_100));
    session.update(pt(200.0, 2_900));

    let mapper = CoordinateMapper::new(&TIMES, &Linear);
    let mut out = Vec::new();
    render_drawing(session.active().unwrap(), &mapper, &ctx(false), &mut out);
    assert!(matches!(
        &out[0],
        DrawCommand::Line { from, to, .. } if from.x == 0.0 && to.x == 20.0
    ));
}

#[test]
fn test_unplaceable_drawings_emit_nothing() {
    let mut session = DrawingSession::new();
    for kind in [DrawingType::HorizontalLine, DrawingType::TrendLine, DrawingType::Rectangle, DrawingType::Fibonacci] {
        session.begin(kind, pt(100.0, 1_000));
        session.update(pt(200.0, 3_000));
        session.commit();
    }
    assert_eq!(session.drawings().len(), 4);

    let mapper = CoordinateMapper::new(&TIMES, &Unplaced);
    let mut out = Vec::new();
    for drawing in session.drawings() {
        render_drawing(drawing, &mapper, &ctx(false), &mut out);
    }
    assert!(out.is_empty(), "unexpected commands: {out:?}");

    let empty = CoordinateMapper::new(&[], &Linear);
    render_drawing(&session.drawings()[1], &empty, &ctx(false), &mut out);
    assert!(out.is_empty());
}

#[test]
fn test_compact_mode_keeps_shapes_drops_labels() {
    let mut session = DrawingSession::new();
    session.begin(DrawingType::HorizontalLine, pt(150.0, 1_000));
    session.commit();

    let mapper = CoordinateMapper::new(&TIMES, &Linear);
    let mut wide = Vec::new();
    render_drawing(&session.drawings()[0], &mapper, &ctx(false), &mut wide);
    let mut compact = Vec::new();
    render_drawing(&session.drawings()[0], &mapper, &ctx(true), &mut compact);

    assert_eq!(wide.len(), 2);
    assert!(wide[1].is_label());
    assert_eq!(compact.len(), 1);
    assert!(matches!(
        &compact[0],
        DrawCommand::Line { from, to, .. } if from.x == 0.0 && to.x == 800.0 && from.y == 150.0
    ));
}

#[test]
fn test_invalid_color_falls_back_to_palette() {
    let mut session = DrawingSession::new();
    session.begin(DrawingType::TrendLine, pt(100.0, 1_000));
    session.update(pt(200.0, 3_000));
    session.commit();
    let mut drawing = session.drawings()[0].clone();
    drawing.color = "not-a-color".to_owned();

    let mapper = CoordinateMapper::new(&TIMES, &Linear);
    let mut out = Vec::new();
    render_drawing(&drawing, &mapper, &ctx(false), &mut out);
    let DrawCommand::Line { stroke, .. } = &out[0] else {
        panic!("expected a line");
    };
    assert_eq!(Some(stroke.color), Rgba::from_hex(DRAWING_PALETTE[0]));
}

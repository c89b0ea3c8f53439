//! Date parsing, snapping and projection through the coordinate mapper.

use livechart_rs::chart::coords::{CoordinateMapper, LogicalScale, Projector, parse_server_date, snap_to_nearest};
use livechart_rs::chart::render::Pane;
use livechart_rs::types::Candle;

/// Small deterministic generator so the property checks need no extra crate.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

fn sorted_times(rng: &mut Lcg, n: usize) -> Vec<i64> {
    let mut t = 1_700_000_000;
    (0..n)
        .map(|_| {
            t += 1 + (rng.next() % 900) as i64;
            t
        })
        .collect()
}

/// Projects a bar to its index times ten; prices pass through.
struct IndexProjector<'a>(&'a [i64]);

impl Projector for IndexProjector<'_> {
    fn time_to_x(&self, time: i64) -> Option<f64> {
        self.0.binary_search(&time).ok().map(|i| i as f64 * 10.0)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        Some(price)
    }
}

/// A chart that cannot place anything yet.
struct Unplaced;

impl Projector for Unplaced {
    fn time_to_x(&self, _time: i64) -> Option<f64> {
        None
    }

    fn price_to_y(&self, _price: f64) -> Option<f64> {
        None
    }
}

// ===================================================================
// parse_server_date
// ===================================================================

#[test]
fn test_parse_zone_less_dates_as_utc() {
    assert_eq!(parse_server_date("2023-11-14T22:13:20"), Some(1_700_000_000));
    assert_eq!(parse_server_date("2023-11-14 22:13:20"), Some(1_700_000_000));
    assert_eq!(parse_server_date("2023-11-14T22:13:20.500"), Some(1_700_000_000));
    assert_eq!(parse_server_date("2023-11-14T22:13"), Some(1_699_999_980));
}

#[test]
fn test_parse_dates_with_offsets() {
    assert_eq!(parse_server_date("2023-11-14T22:13:20Z"), Some(1_700_000_000));
    assert_eq!(parse_server_date("2023-11-15T00:13:20+02:00"), Some(1_700_000_000));
    assert_eq!(parse_server_date("2023-11-14T22:13:20+0000"), Some(1_700_000_000));
}

#[test]
fn test_parse_bare_date_is_midnight_utc() {
    assert_eq!(parse_server_date("2023-11-14"), Some(1_699_920_000));
}

#[test]
fn test_parse_rejects_garbage() {
    for raw in ["", "   ", "yesterday", "2023-13-45", "14/11/2023"] {
        assert_eq!(parse_server_date(raw), None, "{raw:?} should not parse");
    }
}

// ===================================================================
// snap_to_nearest
// ===================================================================

#[test]
fn test_snap_exact_clamped_and_ties() {
    let times = [100, 200, 300];
    assert_eq!(snap_to_nearest(&times, 200), Some(200));
    assert_eq!(snap_to_nearest(&times, 10), Some(100));
    assert_eq!(snap_to_nearest(&times, 10_000), Some(300));
    assert_eq!(snap_to_nearest(&times, 249), Some(200));
    assert_eq!(snap_to_nearest(&times, 251), Some(300));
    // exactly between two candles resolves to the earlier one
    assert_eq!(snap_to_nearest(&times, 250), Some(200));
    assert_eq!(snap_to_nearest(&[], 250), None);
}

#[test]
fn test_snap_returns_member_and_is_monotonic() {
    let mut rng = Lcg(7);
    for _ in 0..50 {
        let n = 1 + (rng.next() % 200) as usize;
        let times = sorted_times(&mut rng, n);
        let lo = times[0] - 5_000;
        let hi = times[times.len() - 1] + 5_000;

        let mut queries: Vec<i64> = (0..200)
            .map(|_| lo + (rng.next() % (hi - lo) as u64) as i64)
            .collect();
        queries.sort_unstable();

        let mut previous = i64::MIN;
        for q in queries {
            let snapped = snap_to_nearest(&times, q).unwrap();
            assert!(times.binary_search(&snapped).is_ok(), "{snapped} not in array");
            assert!(snapped >= previous, "snap went backwards at {q}");
            assert_eq!(snap_to_nearest(&times, q), Some(snapped), "snap not deterministic");
            previous = snapped;
        }
    }
}

#[test]
fn test_snap_is_nearest() {
    let mut rng = Lcg(42);
    let times = sorted_times(&mut rng, 300);
    for _ in 0..1_000 {
        let q = times[0] + (rng.next() % (times[299] - times[0]) as u64) as i64;
        let snapped = snap_to_nearest(&times, q).unwrap();
        let best = times.iter().map(|t| (t - q).abs()).min().unwrap();
        assert_eq!((snapped - q).abs(), best);
    }
}

// ===================================================================
// CoordinateMapper
// ===================================================================

#[test]
fn test_mapper_snaps_before_projecting() {
    let times = [1_000, 2_000, 3_000];
    let projector = IndexProjector(&times);
    let mapper = CoordinateMapper::new(&times, &projector);

    assert_eq!(mapper.time_to_x(1_400), Some(0.0));
    assert_eq!(mapper.time_to_x(1_600), Some(10.0));
    assert_eq!(mapper.time_to_x(99_999), Some(20.0));
    assert_eq!(mapper.last_x(), Some(20.0));
    assert_eq!(mapper.average_bar_width(), Some(10.0));
}

#[test]
fn test_mapper_rejects_unplaceable_values() {
    let times = [1_000, 2_000];
    let projector = IndexProjector(&times);
    let mapper = CoordinateMapper::new(&times, &projector);
    assert_eq!(mapper.price_to_y(f64::NAN), None);
    assert_eq!(mapper.price_to_y(f64::INFINITY), None);
    assert_eq!(mapper.date_to_x("garbage"), None);

    let empty = CoordinateMapper::new(&[], &projector);
    assert_eq!(empty.time_to_x(1_000), None);

    let unplaced = CoordinateMapper::new(&times, &Unplaced);
    assert_eq!(unplaced.time_to_x(1_000), None);
    assert_eq!(unplaced.price_to_y(10.0), None);
    assert_eq!(unplaced.average_bar_width(), None);
}

#[test]
fn test_logical_scale_fit() {
    let candles: Vec<Candle> = (0..10)
        .map(|i| Candle::new(1_000 + i * 60, 100.0, 110.0, 90.0, 105.0))
        .collect();
    let pane = Pane::new(500.0, 200.0, 1.0);
    let mut scale = LogicalScale::fit(&candles, pane);

    assert_eq!(scale.time_to_x(1_000), Some(0.0));
    assert_eq!(scale.time_to_x(1_060), Some(50.0));
    assert_eq!(scale.time_to_x(1_001), None);
    assert_eq!(scale.visible_logical_range(500.0), (0.0, 10.0));

    // 5% padding: 111 maps to the top edge, 89 to the bottom
    assert!((scale.price_to_y(111.0).unwrap() - 0.0).abs() < 1e-9);
    assert!((scale.price_to_y(89.0).unwrap() - 200.0).abs() < 1e-9);

    scale.scroll_by(-3.0);
    assert_eq!(scale.left_index(), -3.0);
    assert_eq!(scale.time_to_x(1_000), Some(150.0));
}

//! Coordinate mapping: server dates → candle times → pixels.
//!
//! Indicator dates come from the backend at a different granularity than
//! the candle array, so nothing is projected directly. A date is parsed to
//! unix seconds, snapped to the nearest known candle time, and only then
//! handed to the base chart's projection. Every overlay element goes
//! through [`CoordinateMapper`], so the snap must stay deterministic and
//! monotonic as the candle array grows.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::chart::render::Pane;
use crate::types::candle::Candle;

/// Zone-less layouts accepted by [`parse_server_date`], tried in order.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a backend date string to unix seconds.
///
/// RFC 3339 strings keep their offset; a string without a zone is read as
/// UTC, as if `Z` had been appended. A bare `YYYY-MM-DD` is midnight UTC.
/// Returns `None` for anything unparsable.
///
/// ```
/// use livechart_rs::chart::coords::parse_server_date;
///
/// assert_eq!(parse_server_date("2023-11-14T22:13:20"), Some(1_700_000_000));
/// assert_eq!(parse_server_date("2023-11-14T22:13:20Z"), Some(1_700_000_000));
/// assert_eq!(parse_server_date("not a date"), None);
/// ```
pub fn parse_server_date(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.timestamp());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp())
}

/// Snap `time` to the nearest entry of the sorted `times` array.
///
/// Queries outside the array clamp to the first/last entry; a query
/// exactly between two entries resolves to the earlier one. The result is
/// always an element of `times` and is non-decreasing in `time`.
/// Returns `None` only for an empty array.
pub fn snap_to_nearest(times: &[i64], time: i64) -> Option<i64> {
    let first = *times.first()?;
    let last = *times.last()?;
    if time <= first {
        return Some(first);
    }
    if time >= last {
        return Some(last);
    }
    match times.binary_search(&time) {
        Ok(i) => Some(times[i]),
        Err(i) => {
            // first < time < last, so 0 < i < len
            let before = times[i - 1];
            let after = times[i];
            if time - before <= after - time {
                Some(before)
            } else {
                Some(after)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Projector
// ---------------------------------------------------------------------------

/// The base chart's native projection.
///
/// `time_to_x` is only asked about times that exist in the candle array.
/// Either function may return `None` when the chart cannot place the
/// value (not laid out yet, empty price scale).
pub trait Projector {
    /// Pixel X of the bar at `time` (unix seconds).
    fn time_to_x(&self, time: i64) -> Option<f64>;
    /// Pixel Y of `price`.
    fn price_to_y(&self, price: f64) -> Option<f64>;
}

impl<P: Projector + ?Sized> Projector for &P {
    fn time_to_x(&self, time: i64) -> Option<f64> {
        (**self).time_to_x(time)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        (**self).price_to_y(price)
    }
}

/// Snap-then-project helper shared by every overlay layer.
pub struct CoordinateMapper<'a, P: ?Sized> {
    times: &'a [i64],
    projector: &'a P,
}

impl<'a, P: Projector + ?Sized> CoordinateMapper<'a, P> {
    /// Wrap the sorted candle `times` and the chart's projector.
    pub fn new(times: &'a [i64], projector: &'a P) -> Self {
        Self { times, projector }
    }

    /// The candle times used for snapping.
    pub fn times(&self) -> &[i64] {
        self.times
    }

    /// Nearest candle time to `time`.
    pub fn snap(&self, time: i64) -> Option<i64> {
        snap_to_nearest(self.times, time)
    }

    /// Pixel X of the candle nearest to `time`.
    pub fn time_to_x(&self, time: i64) -> Option<f64> {
        let snapped = self.snap(time)?;
        self.projector.time_to_x(snapped).filter(|x| x.is_finite())
    }

    /// Pixel X of a backend date string.
    pub fn date_to_x(&self, date: &str) -> Option<f64> {
        self.time_to_x(parse_server_date(date)?)
    }

    /// Pixel Y of `price`; non-finite prices are rejected.
    pub fn price_to_y(&self, price: f64) -> Option<f64> {
        if !price.is_finite() {
            return None;
        }
        self.projector.price_to_y(price).filter(|y| y.is_finite())
    }

    /// Pixel X of the last candle.
    pub fn last_x(&self) -> Option<f64> {
        let last = *self.times.last()?;
        self.projector.time_to_x(last).filter(|x| x.is_finite())
    }

    /// Mean pixel distance between consecutive candles.
    pub fn average_bar_width(&self) -> Option<f64> {
        if self.times.len() < 2 {
            return None;
        }
        let first = self.projector.time_to_x(*self.times.first()?)?;
        let last = self.projector.time_to_x(*self.times.last()?)?;
        let width = (last - first) / (self.times.len() - 1) as f64;
        (width.is_finite() && width > 0.0).then_some(width)
    }
}

// ---------------------------------------------------------------------------
// LogicalScale
// ---------------------------------------------------------------------------

/// A linear [`Projector`] over logical bar indices.
///
/// Bar `i` sits at `(i - left_index) * bar_spacing`; prices map linearly
/// from `price_top` (y = 0) to `price_bottom` (y = height). Used by
/// headless hosts that have no charting library behind them.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalScale {
    times: Vec<i64>,
    bar_spacing: f64,
    left_index: f64,
    price_top: f64,
    price_bottom: f64,
    height: f64,
}

impl LogicalScale {
    /// A scale over `times` with the given horizontal layout and price range.
    pub fn new(
        times: Vec<i64>,
        bar_spacing: f64,
        left_index: f64,
        price_top: f64,
        price_bottom: f64,
        height: f64,
    ) -> Self {
        Self {
            times,
            bar_spacing,
            left_index,
            price_top,
            price_bottom,
            height,
        }
    }

    /// Fit all `candles` into `pane`, padding the price range by 5%.
    pub fn fit(candles: &[Candle], pane: Pane) -> Self {
        let times: Vec<i64> = candles.iter().map(|c| c.time).collect();
        let bar_spacing = if candles.is_empty() {
            0.0
        } else {
            pane.width / candles.len() as f64
        };
        let (low, high) = candles.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.low), hi.max(c.high))
        });
        let pad = if high > low { (high - low) * 0.05 } else { 1.0 };
        Self::new(times, bar_spacing, 0.0, high + pad, low - pad, pane.height)
    }

    /// Logical index at the left edge of the pane.
    pub fn left_index(&self) -> f64 {
        self.left_index
    }

    /// Logical range `(from, to)` visible in a pane `width` pixels wide.
    pub fn visible_logical_range(&self, width: f64) -> (f64, f64) {
        if self.bar_spacing <= 0.0 {
            return (self.left_index, self.left_index);
        }
        (self.left_index, self.left_index + width / self.bar_spacing)
    }

    /// Scroll by `bars` (negative scrolls toward older history).
    pub fn scroll_by(&mut self, bars: f64) {
        self.left_index += bars;
    }
}

impl Projector for LogicalScale {
    fn time_to_x(&self, time: i64) -> Option<f64> {
        let index = self.times.binary_search(&time).ok()?;
        Some((index as f64 - self.left_index) * self.bar_spacing)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        let span = self.price_top - self.price_bottom;
        if span == 0.0 || !span.is_finite() {
            return None;
        }
        Some((self.price_top - price) / span * self.height)
    }
}

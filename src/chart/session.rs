//! History/live candle synchronizer.
//!
//! The [`Synchronizer`] owns the authoritative candle array of the active
//! `(symbol, interval)` session and merges the three data paths into it:
//!
//! - **initial load**: replaces the array;
//! - **backward paging**: prepends strictly older candles until the
//!   backend runs out of history;
//! - **live updates**: price ticks move the forming candle, candle polls
//!   update it in place or append the next bar.
//!
//! Every operation carries the [`SessionId`] it was issued under. When
//! that id is no longer current the call returns [`SyncOutcome::Stale`]
//! and touches nothing, so a response that outlives a symbol switch can
//! never write into the new session.
//!
//! The array stays strictly increasing in `time` with no duplicates, and
//! the sorted `candle_times` cache is rebuilt or extended by every path
//! that mutates the array.

use std::fmt;

use crate::config::ChartConfig;
use crate::types::candle::{Candle, SessionKey};

/// Monotonically increasing identifier of a chart session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

/// A backward history request produced by [`Synchronizer::request_backward_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub session: SessionId,
    /// Only candles at or before this instant (ms) are wanted.
    pub end_time_ms: i64,
    pub limit: u32,
}

/// What a synchronizer operation did.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Issued under a superseded session; nothing changed.
    Stale,
    /// Current session, but there was nothing to apply.
    Ignored,
    /// Initial load replaced the array.
    Loaded { count: usize },
    /// A history page was merged. `exhausted` is set once the backend has
    /// no older candles.
    Prepended { added: usize, exhausted: bool },
    /// A history page failed; the page can be requested again.
    PageFailed,
    /// A price tick moved the forming candle.
    Ticked(Candle),
    /// A candle poll changed the array.
    Polled {
        /// Candles written, oldest first.
        updated: Vec<Candle>,
        /// At least one candle newer than the previous last was appended.
        bar_closed: bool,
        /// A candle older than the previous last was rewritten.
        rewrote_history: bool,
    },
}

impl SyncOutcome {
    /// `true` when a new bar was appended by a candle poll.
    pub fn is_bar_close(&self) -> bool {
        matches!(self, Self::Polled { bar_closed: true, .. })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// State of one `(symbol, interval)` session.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    key: SessionKey,
    candles: Vec<Candle>,
    times: Vec<i64>,
    loaded: bool,
    has_more_history: bool,
    backward_in_flight: bool,
}

impl Session {
    fn new(id: SessionId, key: SessionKey) -> Self {
        Self {
            id,
            key,
            candles: Vec::new(),
            times: Vec::new(),
            loaded: false,
            has_more_history: true,
            backward_in_flight: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Candles, oldest first; the last one is still forming.
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Sorted candle times, always in step with [`candles`](Self::candles).
    pub fn candle_times(&self) -> &[i64] {
        &self.times
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Whether the initial load has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// `false` once the backend returned no older candles.
    pub fn has_more_history(&self) -> bool {
        self.has_more_history
    }

    /// Whether a backward page is in flight.
    pub fn is_paging(&self) -> bool {
        self.backward_in_flight
    }

    fn rebuild_times(&mut self) {
        self.times.clear();
        self.times.extend(self.candles.iter().map(|c| c.time));
    }
}

/// Drop candles with non-finite prices, sort by time and keep the last
/// candle of any duplicated timestamp.
pub fn normalize_candles(candles: Vec<Candle>) -> Vec<Candle> {
    let mut sorted: Vec<Candle> = candles.into_iter().filter(Candle::is_finite).collect();
    sorted.sort_by_key(|c| c.time);

    let mut out: Vec<Candle> = Vec::with_capacity(sorted.len());
    for candle in sorted {
        match out.last_mut() {
            Some(prev) if prev.time == candle.time => *prev = candle,
            _ => out.push(candle),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

/// Owner of the candle state machine.
#[derive(Debug)]
pub struct Synchronizer {
    next_id: u64,
    session: Option<Session>,
    history_page: u32,
    backward_threshold_bars: u32,
}

impl Synchronizer {
    /// A synchronizer paging `history_page` candles at a time once the
    /// visible range comes within `backward_threshold_bars` of the start.
    pub fn new(history_page: u32, backward_threshold_bars: u32) -> Self {
        Self {
            next_id: 0,
            session: None,
            history_page,
            backward_threshold_bars,
        }
    }

    /// A synchronizer using the paging values of `config`.
    pub fn from_config(config: &ChartConfig) -> Self {
        Self::new(config.history_page, config.backward_threshold_bars)
    }

    /// Start a new session, discarding the previous one.
    pub fn begin(&mut self, key: SessionKey) -> SessionId {
        self.next_id += 1;
        let id = SessionId(self.next_id);
        tracing::debug!(session = %id, key = %key, "session started");
        self.session = Some(Session::new(id, key));
        id
    }

    /// The active session.
    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(Session::id)
    }

    /// Whether `id` is the active session.
    pub fn is_current(&self, id: SessionId) -> bool {
        self.current_id() == Some(id)
    }

    /// Candles of the active session (empty without one).
    pub fn candles(&self) -> &[Candle] {
        self.session.as_ref().map(Session::candles).unwrap_or(&[])
    }

    /// Sorted candle times of the active session.
    pub fn candle_times(&self) -> &[i64] {
        self.session.as_ref().map(Session::candle_times).unwrap_or(&[])
    }

    fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.session.as_mut().filter(|s| s.id == id)
    }

    /// Replace the array with the initial fetch.
    pub fn apply_initial_load(&mut self, id: SessionId, candles: Vec<Candle>) -> SyncOutcome {
        let Some(session) = self.session_mut(id) else {
            return SyncOutcome::Stale;
        };
        session.candles = normalize_candles(candles);
        session.rebuild_times();
        session.loaded = true;
        session.has_more_history = true;
        session.backward_in_flight = false;
        SyncOutcome::Loaded {
            count: session.candles.len(),
        }
    }

    /// Decide whether the view at logical index `visible_from` needs older
    /// history, and if so mark a page in flight.
    pub fn request_backward_page(&mut self, id: SessionId, visible_from: f64) -> Option<PageRequest> {
        let threshold = self.backward_threshold_bars as f64;
        let limit = self.history_page;
        let session = self.session_mut(id)?;
        if !session.loaded || !session.has_more_history || session.backward_in_flight {
            return None;
        }
        if visible_from > threshold {
            return None;
        }
        let earliest = *session.times.first()?;
        let Some(end_time_ms) = earliest.checked_mul(1000).and_then(|ms| ms.checked_sub(1)) else {
            tracing::warn!(session = %id, earliest, "earliest candle time out of range, paging stopped");
            session.has_more_history = false;
            return None;
        };
        session.backward_in_flight = true;
        Some(PageRequest {
            session: id,
            end_time_ms,
            limit,
        })
    }

    /// Merge a backward page: skip known timestamps, prepend, re-sort.
    ///
    /// An empty page, or one with nothing new in it, ends paging for the
    /// session.
    pub fn apply_backward_page(&mut self, id: SessionId, candles: Vec<Candle>) -> SyncOutcome {
        let Some(session) = self.session_mut(id) else {
            return SyncOutcome::Stale;
        };
        session.backward_in_flight = false;

        let fresh: Vec<Candle> = normalize_candles(candles)
            .into_iter()
            .filter(|c| session.times.binary_search(&c.time).is_err())
            .collect();

        if fresh.is_empty() {
            session.has_more_history = false;
            tracing::info!(session = %id, key = %session.key, "no more history");
            return SyncOutcome::Prepended {
                added: 0,
                exhausted: true,
            };
        }

        let added = fresh.len();
        session.candles.extend(fresh);
        session.candles.sort_by_key(|c| c.time);
        session.rebuild_times();
        SyncOutcome::Prepended {
            added,
            exhausted: false,
        }
    }

    /// A backward page failed; allow it to be requested again.
    pub fn fail_backward_page(&mut self, id: SessionId) -> SyncOutcome {
        match self.session_mut(id) {
            Some(session) => {
                session.backward_in_flight = false;
                SyncOutcome::PageFailed
            }
            None => SyncOutcome::Stale,
        }
    }

    /// Move the forming candle to `price`.
    pub fn apply_price_tick(&mut self, id: SessionId, price: f64) -> SyncOutcome {
        let Some(session) = self.session_mut(id) else {
            return SyncOutcome::Stale;
        };
        if !price.is_finite() {
            return SyncOutcome::Ignored;
        }
        match session.candles.last_mut() {
            Some(last) if session.loaded => {
                last.apply_price(price);
                SyncOutcome::Ticked(*last)
            }
            _ => SyncOutcome::Ignored,
        }
    }

    /// Merge the last few candles from a live poll.
    ///
    /// A candle newer than the tracked last is appended (a bar closed);
    /// a known timestamp is updated in place. Polls before the initial
    /// load are ignored.
    pub fn apply_candle_poll(&mut self, id: SessionId, candles: Vec<Candle>) -> SyncOutcome {
        let Some(session) = self.session_mut(id) else {
            return SyncOutcome::Stale;
        };
        let Some(previous_last) = session.last().map(|c| c.time) else {
            return SyncOutcome::Ignored;
        };
        if !session.loaded {
            return SyncOutcome::Ignored;
        }

        let mut updated = Vec::new();
        let mut bar_closed = false;
        let mut rewrote_history = false;

        for candle in normalize_candles(candles) {
            let last_time = session.times.last().copied().unwrap_or(previous_last);
            if candle.time > last_time {
                session.candles.push(candle);
                session.times.push(candle.time);
                updated.push(candle);
                bar_closed = true;
                continue;
            }
            if let Ok(i) = session.times.binary_search(&candle.time) {
                if session.candles[i] != candle {
                    session.candles[i] = candle;
                    updated.push(candle);
                    rewrote_history |= candle.time < previous_last;
                }
            }
        }

        if updated.is_empty() {
            return SyncOutcome::Ignored;
        }
        SyncOutcome::Polled {
            updated,
            bar_closed,
            rewrote_history,
        }
    }
}

//! The chart controller: one owner for all chart state.
//!
//! [`ChartController`] owns the [`Synchronizer`], [`IndicatorCache`],
//! [`DrawingSession`] and [`FrameScheduler`]. Network work runs in spawned
//! tasks that report back over a channel, tagged with the [`SessionId`]
//! they were issued under; the controller applies each completion on its
//! own task, so no state is shared between tasks.
//!
//! # Architecture
//!
//! ```text
//!   host commands ──┐        ┌── initial load / history page tasks
//!                   ▼        ▼
//!             ┌────────────────────┐      ┌──────────────┐
//!             │  ChartController   │◄─────│   LiveFeed   │ price ticks,
//!             │  (session guard)   │      └──────────────┘ candle polls
//!             └─────────┬──────────┘◄──── indicator tasks, debounce timer
//!                       │ frame tick
//!                       ▼
//!          BaseChart (series)  +  OverlaySurface (Frame)
//! ```
//!
//! A symbol/interval switch starts a new session: the live feed, any
//! history page, indicator requests and the debounce timer are aborted,
//! and whatever still arrives for the old id is dropped.
//!
//! # Example
//!
//! ```no_run
//! use livechart_rs::chart::controller::{ChartCommand, ChartController};
//! # use livechart_rs::chart::controller::{BaseChart, OverlaySurface};
//! # use livechart_rs::chart::coords::Projector;
//! # use livechart_rs::chart::render::{Frame, Pane};
//! # use livechart_rs::types::Candle;
//! use livechart_rs::client::ChartApiClient;
//! use livechart_rs::config::ChartConfig;
//! use livechart_rs::types::{Interval, SessionKey};
//!
//! # struct Host;
//! # impl Projector for Host {
//! #     fn time_to_x(&self, _: i64) -> Option<f64> { None }
//! #     fn price_to_y(&self, _: f64) -> Option<f64> { None }
//! # }
//! # impl BaseChart for Host {
//! #     fn pane(&self) -> Pane { Pane::new(800.0, 400.0, 1.0) }
//! #     fn set_candles(&mut self, _: &[Candle]) {}
//! #     fn update_candle(&mut self, _: &Candle) {}
//! #     fn fit_content(&mut self) {}
//! # }
//! # impl OverlaySurface for Host { fn present(&mut self, _: &Frame) {} }
//! # #[tokio::main]
//! # async fn main() {
//! let config = ChartConfig::from_env();
//! let client = ChartApiClient::with_base_url(&config.base_url);
//! let controller = ChartController::new(client, config);
//!
//! let (commands, rx) = tokio::sync::mpsc::channel(32);
//! let task = tokio::spawn(controller.run(Host, rx));
//! commands
//!     .send(ChartCommand::SetSession(SessionKey::new("BTCUSDT", Interval::H1)))
//!     .await
//!     .ok();
//! # drop(commands);
//! # let _ = task.await;
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::chart::coords::Projector;
use crate::chart::drawing::DrawingSession;
use crate::chart::indicators::{DebounceElapsed, IndicatorCache, IndicatorCompletion};
use crate::chart::render::{Frame, FrameScheduler, OverlayRenderer, Pane};
use crate::chart::session::{SessionId, SyncOutcome, Synchronizer};
use crate::config::ChartConfig;
use crate::error::Result;
use crate::live::{LiveEvent, LiveFeed};
use crate::source::ChartDataSource;
use crate::types::candle::{Candle, SessionKey};
use crate::types::drawing::{DrawingPoint, DrawingType};
use crate::types::indicators::{IndicatorKind, IndicatorSet, IndicatorSettings};

// ---------------------------------------------------------------------------
// Host seams
// ---------------------------------------------------------------------------

/// The charting library that renders the candlestick series.
pub trait BaseChart: Projector {
    /// Current pane metrics.
    fn pane(&self) -> Pane;
    /// Replace the whole series.
    fn set_candles(&mut self, candles: &[Candle]);
    /// Update the last bar or append a newer one.
    fn update_candle(&mut self, candle: &Candle);
    /// Fit the visible range to the data.
    fn fit_content(&mut self);
}

/// The transparent canvas layered above the base chart.
pub trait OverlaySurface {
    /// Paint a finished frame, resizing the backing store first.
    fn present(&mut self, frame: &Frame);
}

/// A change the base series must mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesUpdate {
    /// Re-send every candle; `fit` also fits the visible range.
    Replace { fit: bool },
    /// Update-or-append these candles, oldest first.
    Upsert(Vec<Candle>),
}

/// Input from the host.
#[derive(Debug, Clone)]
pub enum ChartCommand {
    SetSession(SessionKey),
    /// The visible logical range changed (pan/zoom).
    VisibleRangeChanged { from: f64, to: f64 },
    SetIndicators {
        enabled: IndicatorSet,
        settings: IndicatorSettings,
    },
    BeginDrawing {
        kind: DrawingType,
        at: DrawingPoint,
    },
    UpdateDrawing(DrawingPoint),
    CommitDrawing,
    CancelDrawing,
    RemoveDrawing(u64),
    ClearDrawings,
    /// Repaint the overlay (resize, theme change).
    Redraw,
    Shutdown,
}

/// What handling one completion or event did.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartUpdate {
    /// Belonged to a superseded session; dropped.
    Stale,
    /// Nothing to apply.
    Ignored,
    Loaded { count: usize },
    /// Retried on the next candle poll, or after one poll interval when
    /// live updates are off.
    InitialLoadFailed,
    HistoryPrepended { added: usize, exhausted: bool },
    HistoryPageFailed,
    PriceTick(Candle),
    Polled { bar_closed: bool, refresh_issued: usize },
    IndicatorStored(IndicatorKind),
    IndicatorDropped(IndicatorKind),
    DebounceFired { refresh_issued: usize },
}

/// Messages from spawned tasks back to the controller.
#[derive(Debug)]
enum Completion {
    InitialLoad {
        session: SessionId,
        result: Result<Vec<Candle>>,
    },
    HistoryPage {
        session: SessionId,
        result: Result<Vec<Candle>>,
    },
    Live {
        session: SessionId,
        event: LiveEvent,
    },
    Indicator(IndicatorCompletion),
    Debounce(DebounceElapsed),
}

impl From<IndicatorCompletion> for Completion {
    fn from(c: IndicatorCompletion) -> Self {
        Self::Indicator(c)
    }
}

impl From<DebounceElapsed> for Completion {
    fn from(d: DebounceElapsed) -> Self {
        Self::Debounce(d)
    }
}

// ---------------------------------------------------------------------------
// ChartController
// ---------------------------------------------------------------------------

/// Single owner of a live chart's state. See the [module docs](self).
pub struct ChartController<S: ChartDataSource> {
    source: Arc<S>,
    config: ChartConfig,
    sync: Synchronizer,
    indicators: IndicatorCache,
    drawings: DrawingSession,
    renderer: OverlayRenderer,
    scheduler: FrameScheduler,
    series_updates: Vec<SeriesUpdate>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: Option<mpsc::UnboundedReceiver<Completion>>,
    initial_task: Option<JoinHandle<()>>,
    page_task: Option<JoinHandle<()>>,
    live_task: Option<JoinHandle<()>>,
}

impl<S: ChartDataSource> ChartController<S> {
    /// Create a controller over `source`.
    pub fn new(source: S, config: ChartConfig) -> Self {
        Self::with_shared_source(Arc::new(source), config)
    }

    /// Create a controller over a source shared with other owners.
    pub fn with_shared_source(source: Arc<S>, config: ChartConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            sync: Synchronizer::from_config(&config),
            renderer: OverlayRenderer::from_config(&config),
            config,
            indicators: IndicatorCache::new(),
            drawings: DrawingSession::new(),
            scheduler: FrameScheduler::new(),
            series_updates: Vec::new(),
            tx,
            rx: Some(rx),
            initial_task: None,
            page_task: None,
            live_task: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    pub fn indicators(&self) -> &IndicatorCache {
        &self.indicators
    }

    pub fn drawings(&self) -> &DrawingSession {
        &self.drawings
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Candles of the active session.
    pub fn candles(&self) -> &[Candle] {
        self.sync.candles()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.sync.current_id()
    }

    /// Drain the series changes accumulated since the last call.
    pub fn take_series_updates(&mut self) -> Vec<SeriesUpdate> {
        std::mem::take(&mut self.series_updates)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Switch to `key`: abort everything of the previous session, clear the
    /// series and caches, and start the initial load (and live feed).
    pub fn set_session(&mut self, key: SessionKey) -> SessionId {
        self.abort_session_tasks();
        self.indicators.reset();

        let session = self.sync.begin(key.clone());
        tracing::info!(%session, %key, "chart session started");

        self.series_updates.clear();
        self.series_updates.push(SeriesUpdate::Replace { fit: false });
        self.spawn_initial_load(session, key.clone(), Duration::ZERO);
        if self.config.live_updates {
            self.spawn_live_feed(session, key);
        }
        self.scheduler.request();
        session
    }

    /// React to a pan/zoom. Returns `true` if a history page was requested.
    pub fn on_visible_range_changed(&mut self, from: f64) -> bool {
        self.scheduler.request();
        let Some(session) = self.sync.current_id() else {
            return false;
        };
        let Some(request) = self.sync.request_backward_page(session, from) else {
            return false;
        };
        let Some(key) = self.sync.current().map(|s| s.key().clone()) else {
            return false;
        };

        tracing::debug!(%session, end_time_ms = request.end_time_ms, "requesting older history");
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.page_task = Some(tokio::spawn(async move {
            let result = source.candles(&key, request.limit, Some(request.end_time_ms)).await;
            let _ = tx.send(Completion::HistoryPage { session, result });
        }));
        true
    }

    /// Change the enabled indicators or their parameters. The refetch is
    /// debounced; before the first load the settings are only stored.
    pub fn set_indicators(&mut self, enabled: IndicatorSet, settings: IndicatorSettings) {
        if !self.indicators.configure(enabled, settings) {
            return;
        }
        let Some(session) = self.sync.current().filter(|s| s.is_loaded()).map(|s| s.id()) else {
            return;
        };
        self.indicators
            .schedule_debounced(session, self.config.indicator_debounce, &self.tx);
    }

    /// Refetch every enabled indicator now. Returns the number of requests.
    pub fn refresh_indicators(&mut self) -> usize {
        let Some(session) = self.sync.current().filter(|s| s.is_loaded()) else {
            return 0;
        };
        let id = session.id();
        let key = session.key().clone();
        let count = u32::try_from(session.candles().len()).unwrap_or(u32::MAX);
        self.indicators
            .refresh(&self.source, id, &key, count, &self.tx)
    }

    /// Apply one host command. Returns `false` for [`ChartCommand::Shutdown`].
    pub fn apply_command(&mut self, command: ChartCommand) -> bool {
        match command {
            ChartCommand::SetSession(key) => {
                self.set_session(key);
            }
            ChartCommand::VisibleRangeChanged { from, .. } => {
                self.on_visible_range_changed(from);
            }
            ChartCommand::SetIndicators { enabled, settings } => {
                self.set_indicators(enabled, settings);
            }
            ChartCommand::BeginDrawing { kind, at } => {
                self.drawings.begin(kind, at);
                self.scheduler.request();
            }
            ChartCommand::UpdateDrawing(at) => {
                if self.drawings.update(at) {
                    self.scheduler.request();
                }
            }
            ChartCommand::CommitDrawing => {
                self.drawings.commit();
                self.scheduler.request();
            }
            ChartCommand::CancelDrawing => {
                if self.drawings.cancel() {
                    self.scheduler.request();
                }
            }
            ChartCommand::RemoveDrawing(id) => {
                if self.drawings.remove(id) {
                    self.scheduler.request();
                }
            }
            ChartCommand::ClearDrawings => {
                self.drawings.clear();
                self.scheduler.request();
            }
            ChartCommand::Redraw => self.scheduler.request(),
            ChartCommand::Shutdown => return false,
        }
        true
    }

    // -----------------------------------------------------------------------
    // Completions
    // -----------------------------------------------------------------------

    /// Wait for the next completion and apply it.
    ///
    /// Returns `None` once [`run`](Self::run) has taken the receiver.
    pub async fn step(&mut self) -> Option<ChartUpdate> {
        let completion = self.rx.as_mut()?.recv().await?;
        Some(self.handle(completion))
    }

    /// Apply a completion if one is ready, without waiting.
    pub fn try_step(&mut self) -> Option<ChartUpdate> {
        let completion = self.rx.as_mut()?.try_recv().ok()?;
        Some(self.handle(completion))
    }

    fn handle(&mut self, completion: Completion) -> ChartUpdate {
        match completion {
            Completion::InitialLoad { session, result } => self.handle_initial_load(session, result),
            Completion::HistoryPage { session, result } => self.handle_history_page(session, result),
            Completion::Live { session, event } => self.handle_live_event(session, event),
            Completion::Indicator(completion) => self.handle_indicator(completion),
            Completion::Debounce(elapsed) => self.handle_debounce(elapsed),
        }
    }

    fn handle_initial_load(&mut self, session: SessionId, result: Result<Vec<Candle>>) -> ChartUpdate {
        if !self.sync.is_current(session) {
            tracing::debug!(%session, "dropping stale initial load");
            return ChartUpdate::Stale;
        }
        self.initial_task = None;

        let candles = match result {
            Ok(candles) => candles,
            Err(e) => {
                tracing::warn!(%session, error = %e, "initial load failed; retrying");
                // Without a live feed there is no poll tick to re-issue it.
                if !self.config.live_updates {
                    if let Some(key) = self.sync.current().map(|s| s.key().clone()) {
                        let delay = self.config.candle_poll_interval.max(Duration::from_millis(1));
                        self.spawn_initial_load(session, key, delay);
                    }
                }
                return ChartUpdate::InitialLoadFailed;
            }
        };

        match self.sync.apply_initial_load(session, candles) {
            SyncOutcome::Loaded { count } => {
                self.indicators.reset();
                self.series_updates.clear();
                self.series_updates.push(SeriesUpdate::Replace { fit: true });
                self.refresh_indicators();
                self.scheduler.request();
                tracing::info!(%session, count, "initial candles loaded");
                ChartUpdate::Loaded { count }
            }
            _ => ChartUpdate::Stale,
        }
    }

    fn handle_history_page(&mut self, session: SessionId, result: Result<Vec<Candle>>) -> ChartUpdate {
        if !self.sync.is_current(session) {
            tracing::debug!(%session, "dropping stale history page");
            return ChartUpdate::Stale;
        }
        self.page_task = None;

        let candles = match result {
            Ok(candles) => candles,
            Err(e) => {
                tracing::warn!(%session, error = %e, "history page failed");
                self.sync.fail_backward_page(session);
                return ChartUpdate::HistoryPageFailed;
            }
        };

        match self.sync.apply_backward_page(session, candles) {
            SyncOutcome::Prepended { added, exhausted } => {
                if added > 0 {
                    self.series_updates.push(SeriesUpdate::Replace { fit: false });
                    self.scheduler.request();
                }
                ChartUpdate::HistoryPrepended { added, exhausted }
            }
            _ => ChartUpdate::Stale,
        }
    }

    /// Apply a live event issued under `session`.
    ///
    /// A candle poll that appends a bar triggers exactly one indicator
    /// refresh; price ticks and in-place updates never do.
    pub fn handle_live_event(&mut self, session: SessionId, event: LiveEvent) -> ChartUpdate {
        if !self.sync.is_current(session) {
            tracing::debug!(%session, "dropping stale live event");
            return ChartUpdate::Stale;
        }
        match event {
            LiveEvent::PriceTick(price) => match self.sync.apply_price_tick(session, price) {
                SyncOutcome::Ticked(candle) => {
                    self.series_updates.push(SeriesUpdate::Upsert(vec![candle]));
                    self.scheduler.request();
                    ChartUpdate::PriceTick(candle)
                }
                _ => ChartUpdate::Ignored,
            },
            LiveEvent::Candles(candles) => {
                let loaded = self.sync.current().is_some_and(|s| s.is_loaded());
                if !loaded {
                    if self.initial_task.is_none() {
                        if let Some(key) = self.sync.current().map(|s| s.key().clone()) {
                            tracing::debug!(%session, "re-issuing initial load");
                            self.spawn_initial_load(session, key, Duration::ZERO);
                        }
                    }
                    return ChartUpdate::Ignored;
                }
                match self.sync.apply_candle_poll(session, candles) {
                    SyncOutcome::Polled {
                        updated,
                        bar_closed,
                        rewrote_history,
                    } => {
                        if rewrote_history {
                            self.series_updates.push(SeriesUpdate::Replace { fit: false });
                        } else {
                            self.series_updates.push(SeriesUpdate::Upsert(updated));
                        }
                        let refresh_issued = if bar_closed {
                            tracing::debug!(%session, "bar closed");
                            self.refresh_indicators()
                        } else {
                            0
                        };
                        self.scheduler.request();
                        ChartUpdate::Polled {
                            bar_closed,
                            refresh_issued,
                        }
                    }
                    _ => ChartUpdate::Ignored,
                }
            }
        }
    }

    fn handle_indicator(&mut self, completion: IndicatorCompletion) -> ChartUpdate {
        if !self.sync.is_current(completion.session) {
            tracing::debug!(session = %completion.session, "dropping stale indicator result");
            return ChartUpdate::Stale;
        }
        let kind = completion.kind;
        if self.indicators.accept(completion) {
            self.scheduler.request();
            ChartUpdate::IndicatorStored(kind)
        } else {
            ChartUpdate::IndicatorDropped(kind)
        }
    }

    fn handle_debounce(&mut self, elapsed: DebounceElapsed) -> ChartUpdate {
        if !self.sync.is_current(elapsed.session) {
            return ChartUpdate::Stale;
        }
        if !self.indicators.debounce_elapsed(elapsed) {
            return ChartUpdate::Ignored;
        }
        let refresh_issued = self.refresh_indicators();
        self.scheduler.request();
        ChartUpdate::DebounceFired { refresh_issued }
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Build the overlay frame for the current state.
    pub fn render<P: Projector + ?Sized>(&self, projector: &P, pane: Pane) -> Frame {
        self.renderer.render(
            self.sync.candle_times(),
            &self.indicators,
            self.drawings.state(),
            projector,
            pane,
        )
    }

    /// Push pending series changes into the base chart.
    pub fn apply_series_updates<H: BaseChart>(&mut self, host: &mut H) {
        for update in std::mem::take(&mut self.series_updates) {
            match update {
                SeriesUpdate::Replace { fit } => {
                    host.set_candles(self.sync.candles());
                    if fit {
                        host.fit_content();
                    }
                }
                SeriesUpdate::Upsert(candles) => {
                    for candle in &candles {
                        host.update_candle(candle);
                    }
                }
            }
        }
    }

    /// Paint one frame if any redraw was requested since the last one.
    pub fn paint_if_due<H: BaseChart + OverlaySurface>(&mut self, host: &mut H) -> bool {
        if !self.scheduler.take() {
            return false;
        }
        let frame = self.render(&*host, host.pane());
        host.present(&frame);
        true
    }

    /// Drive the chart until [`ChartCommand::Shutdown`] or the command
    /// channel closes. Returns the host.
    pub async fn run<H>(mut self, mut host: H, mut commands: mpsc::Receiver<ChartCommand>) -> H
    where
        H: BaseChart + OverlaySurface,
    {
        let Some(mut completions) = self.rx.take() else {
            return host;
        };
        let period = self.config.frame_interval.max(Duration::from_millis(1));
        let mut frames = tokio::time::interval(period);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.apply_command(command) {
                            break;
                        }
                    }
                    None => break,
                },
                Some(completion) = completions.recv() => {
                    self.handle(completion);
                }
                _ = frames.tick() => {
                    self.apply_series_updates(&mut host);
                    self.paint_if_due(&mut host);
                }
            }
        }

        tracing::info!("chart controller stopped");
        host
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn spawn_initial_load(&mut self, session: SessionId, key: SessionKey, delay: Duration) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let limit = self.config.initial_candles;
        self.initial_task = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = source.candles(&key, limit, None).await;
            let _ = tx.send(Completion::InitialLoad { session, result });
        }));
    }

    fn spawn_live_feed(&mut self, session: SessionId, key: SessionKey) {
        let mut feed = LiveFeed::spawn(Arc::clone(&self.source), key, &self.config);
        let tx = self.tx.clone();
        self.live_task = Some(tokio::spawn(async move {
            while let Some(event) = feed.next().await {
                if tx.send(Completion::Live { session, event }).is_err() {
                    break;
                }
            }
        }));
    }

    fn abort_session_tasks(&mut self) {
        for task in [
            self.initial_task.take(),
            self.page_task.take(),
            self.live_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }
}

impl<S: ChartDataSource> Drop for ChartController<S> {
    fn drop(&mut self) {
        self.abort_session_tasks();
    }
}

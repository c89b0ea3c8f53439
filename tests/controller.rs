//! End-to-end controller behaviour on paused tokio time with a scripted
//! data source.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use common::*;
use livechart_rs::chart::controller::{
    BaseChart, ChartCommand, ChartController, ChartUpdate, OverlaySurface, SeriesUpdate,
};
use livechart_rs::chart::coords::Projector;
use livechart_rs::chart::render::{Frame, Pane};
use livechart_rs::config::{ChartConfig, ChartConfigBuilder};
use livechart_rs::live::{LiveEvent, LiveFeed};
use livechart_rs::types::*;
use futures_util::StreamExt;
use tokio::sync::mpsc;

fn config() -> ChartConfigBuilder {
    ChartConfigBuilder::new("http://127.0.0.1:9/api")
        .live_updates(false)
        .indicator_debounce(Duration::from_millis(300))
}

fn all_indicators() -> IndicatorSet {
    BTreeSet::from(IndicatorKind::ALL)
}

fn controller(source: FakeSource, config: ChartConfig) -> (ChartController<FakeSource>, Arc<FakeSource>) {
    let source = Arc::new(source);
    (ChartController::with_shared_source(Arc::clone(&source), config), source)
}

/// Drain `n` completions, asserting each stored an indicator.
async fn expect_indicators(chart: &mut ChartController<FakeSource>, n: usize) {
    for _ in 0..n {
        let update = chart.step().await;
        assert!(
            matches!(update, Some(ChartUpdate::IndicatorStored(_))),
            "unexpected update {update:?}"
        );
    }
}

/// Records what the controller hands a host chart.
#[derive(Default)]
struct RecordingHost {
    candles: Vec<Candle>,
    frames: Vec<Frame>,
    fits: usize,
}

impl Projector for RecordingHost {
    fn time_to_x(&self, time: i64) -> Option<f64> {
        let i = self.candles.binary_search_by_key(&time, |c| c.time).ok()?;
        Some(i as f64 * 5.0)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        Some(400.0 - price)
    }
}

impl BaseChart for RecordingHost {
    fn pane(&self) -> Pane {
        Pane::new(800.0, 400.0, 2.0)
    }

    fn set_candles(&mut self, candles: &[Candle]) {
        self.candles = candles.to_vec();
    }

    fn update_candle(&mut self, candle: &Candle) {
        match self.candles.last_mut() {
            Some(last) if last.time == candle.time => *last = *candle,
            _ => self.candles.push(*candle),
        }
    }

    fn fit_content(&mut self) {
        self.fits += 1;
    }
}

impl OverlaySurface for RecordingHost {
    fn present(&mut self, frame: &Frame) {
        self.frames.push(frame.clone());
    }
}

// ===================================================================
// Initial load and live merges
// ===================================================================

#[tokio::test(start_paused = true)]
async fn test_initial_load_fetches_indicators_once() {
    let (mut chart, source) = controller(
        FakeSource::new().with_history("BTCUSDT", bars(0..100)),
        config().build(),
    );
    chart.set_indicators(all_indicators(), IndicatorSettings::default());
    // not loaded yet: settings are only stored
    assert_eq!(chart.indicators().requests_issued(), 0);

    chart.set_session(key("BTCUSDT"));
    assert_eq!(chart.step().await, Some(ChartUpdate::Loaded { count: 100 }));
    expect_indicators(&mut chart, 3).await;

    assert_eq!(source.latest_calls(), 1);
    assert_eq!(source.indicator_calls(), 3);
    assert_eq!(chart.indicators().requests_issued(), 3);
    assert_eq!(
        chart.take_series_updates(),
        vec![SeriesUpdate::Replace { fit: true }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_bar_close_refreshes_indicators_exactly_once() {
    let (mut chart, _source) = controller(
        FakeSource::new().with_history("BTCUSDT", bars(0..50)),
        config().build(),
    );
    chart.set_indicators(all_indicators(), IndicatorSettings::default());
    let id = chart.set_session(key("BTCUSDT"));
    chart.step().await;
    expect_indicators(&mut chart, 3).await;
    let before = chart.indicators().requests_issued();

    // same timestamp: in-place update, no refresh
    let update = chart.handle_live_event(id, LiveEvent::Candles(vec![candle(49, 200.0)]));
    assert_eq!(update, ChartUpdate::Polled { bar_closed: false, refresh_issued: 0 });
    assert_eq!(chart.indicators().requests_issued(), before);

    // price ticks never refresh
    let update = chart.handle_live_event(id, LiveEvent::PriceTick(201.0));
    assert!(matches!(update, ChartUpdate::PriceTick(c) if c.close == 201.0 && c.time == bar_time(49)));
    assert_eq!(chart.indicators().requests_issued(), before);

    // a newer candle closes the bar: one refresh of every enabled indicator
    let update = chart.handle_live_event(id, LiveEvent::Candles(vec![candle(49, 202.0), candle(50, 203.0)]));
    assert_eq!(update, ChartUpdate::Polled { bar_closed: true, refresh_issued: 3 });
    assert_eq!(chart.indicators().requests_issued(), before + 3);
    expect_indicators(&mut chart, 3).await;

    assert_eq!(chart.candles().len(), 51);
    assert_eq!(chart.candles()[49].close, 202.0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_initial_load_retries_on_next_poll() {
    let hour = Duration::from_secs(3_600);
    let (mut chart, source) = controller(
        FakeSource::new()
            .with_history("BTCUSDT", bars(0..10))
            .failing_loads(1),
        config()
            .live_updates(true)
            .price_tick_interval(hour)
            .candle_poll_interval(hour)
            .build(),
    );
    let id = chart.set_session(key("BTCUSDT"));
    assert_eq!(chart.step().await, Some(ChartUpdate::InitialLoadFailed));
    assert!(chart.candles().is_empty());

    assert_eq!(
        chart.handle_live_event(id, LiveEvent::Candles(bars(9..10))),
        ChartUpdate::Ignored
    );
    assert_eq!(chart.step().await, Some(ChartUpdate::Loaded { count: 10 }));
    assert_eq!(source.latest_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_initial_load_retries_without_live_feed() {
    let (mut chart, source) = controller(
        FakeSource::new()
            .with_history("BTCUSDT", bars(0..10))
            .failing_loads(2),
        config().candle_poll_interval(Duration::from_secs(5)).build(),
    );
    chart.set_session(key("BTCUSDT"));
    assert_eq!(chart.step().await, Some(ChartUpdate::InitialLoadFailed));

    let started = tokio::time::Instant::now();
    assert_eq!(chart.step().await, Some(ChartUpdate::InitialLoadFailed));
    assert!(started.elapsed() >= Duration::from_secs(5));

    assert_eq!(chart.step().await, Some(ChartUpdate::Loaded { count: 10 }));
    assert_eq!(source.latest_calls(), 3);
}

// ===================================================================
// Session guard
// ===================================================================

#[tokio::test(start_paused = true)]
async fn test_session_switch_drops_previous_session() {
    let (mut chart, source) = controller(
        FakeSource::new()
            .with_history("AAA", bars(0..30))
            .with_history("BBB", bars(100..120))
            .with_delay("AAA", Duration::from_secs(2)),
        config().build(),
    );
    let a = chart.set_session(key("AAA"));
    // let the AAA load start before switching away
    tokio::time::sleep(Duration::from_millis(10)).await;
    let b = chart.set_session(key("BBB"));
    assert_ne!(a, b);
    assert_eq!(chart.session_id(), Some(b));

    assert_eq!(chart.step().await, Some(ChartUpdate::Loaded { count: 20 }));
    let loaded = chart.candles().to_vec();

    assert_eq!(
        chart.handle_live_event(a, LiveEvent::Candles(bars(29..31))),
        ChartUpdate::Stale
    );
    assert_eq!(chart.handle_live_event(a, LiveEvent::PriceTick(1.0)), ChartUpdate::Stale);
    assert_eq!(chart.candles(), loaded.as_slice());

    // the slow load for AAA was aborted and never lands
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(chart.try_step(), None);
    assert_eq!(chart.candles(), loaded.as_slice());
    assert_eq!(source.latest_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_session_switch_clears_indicator_geometry() {
    let (mut chart, _source) = controller(
        FakeSource::new()
            .with_history("AAA", bars(0..30))
            .with_history("BBB", bars(0..30)),
        config().build(),
    );
    chart.set_indicators(all_indicators(), IndicatorSettings::default());
    chart.set_session(key("AAA"));
    chart.step().await;
    expect_indicators(&mut chart, 3).await;
    assert!(chart.indicators().market_structure().is_some());

    chart.set_session(key("BBB"));
    assert!(chart.indicators().market_structure().is_none());
    assert!(chart.candles().is_empty());
}

// ===================================================================
// Backward paging
// ===================================================================

#[tokio::test(start_paused = true)]
async fn test_paging_until_history_is_exhausted() {
    let (mut chart, source) = controller(
        FakeSource::new().with_history("BTCUSDT", bars(0..100)),
        config().initial_candles(60).history_page(50).build(),
    );
    chart.set_session(key("BTCUSDT"));
    assert_eq!(chart.step().await, Some(ChartUpdate::Loaded { count: 60 }));

    // far from the left edge: nothing to do
    assert!(!chart.on_visible_range_changed(30.0));

    assert!(chart.on_visible_range_changed(2.0));
    // already in flight
    assert!(!chart.on_visible_range_changed(1.0));
    assert_eq!(
        chart.step().await,
        Some(ChartUpdate::HistoryPrepended { added: 40, exhausted: false })
    );
    assert_eq!(chart.candles().len(), 100);
    assert_eq!(chart.candles()[0].time, bar_time(0));

    assert!(chart.on_visible_range_changed(0.0));
    assert_eq!(
        chart.step().await,
        Some(ChartUpdate::HistoryPrepended { added: 0, exhausted: true })
    );

    assert!(!chart.on_visible_range_changed(0.0));
    assert!(!chart.on_visible_range_changed(-20.0));
    assert_eq!(source.page_calls(), 2);
}

// ===================================================================
// Debounce
// ===================================================================

#[tokio::test(start_paused = true)]
async fn test_settings_changes_are_debounced() {
    let (mut chart, source) = controller(
        FakeSource::new().with_history("BTCUSDT", bars(0..40)),
        config().build(),
    );
    chart.set_session(key("BTCUSDT"));
    chart.step().await;
    assert_eq!(source.indicator_calls(), 0);

    let mut settings = IndicatorSettings::default();
    for swing_length in 6..10 {
        settings.market_structure.swing_length = swing_length;
        chart.set_indicators(all_indicators(), settings.clone());
        tokio::time::advance(Duration::from_millis(100)).await;
    }

    assert_eq!(chart.step().await, Some(ChartUpdate::DebounceFired { refresh_issued: 3 }));
    expect_indicators(&mut chart, 3).await;

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(chart.try_step(), None);
    assert_eq!(source.indicator_calls(), 3);
    let entry = chart.indicators().get(IndicatorKind::MarketStructure).unwrap();
    assert_eq!(entry.key.settings.market_structure.swing_length, 9);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_settings_do_not_refetch() {
    let (mut chart, source) = controller(
        FakeSource::new().with_history("BTCUSDT", bars(0..40)),
        config().build(),
    );
    chart.set_indicators(all_indicators(), IndicatorSettings::default());
    chart.set_session(key("BTCUSDT"));
    chart.step().await;
    expect_indicators(&mut chart, 3).await;

    chart.set_indicators(all_indicators(), IndicatorSettings::default());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(chart.try_step(), None);
    assert_eq!(source.indicator_calls(), 3);
}

// ===================================================================
// Drawings, rendering and the run loop
// ===================================================================

#[tokio::test(start_paused = true)]
async fn test_drawings_survive_session_switch() {
    let (mut chart, _source) = controller(
        FakeSource::new().with_history("AAA", bars(0..10)),
        config().build(),
    );
    chart.set_session(key("AAA"));
    chart.apply_command(ChartCommand::BeginDrawing {
        kind: DrawingType::TrendLine,
        at: DrawingPoint::new(100.0, bar_time(1)),
    });
    chart.apply_command(ChartCommand::UpdateDrawing(DrawingPoint::new(105.0, bar_time(5))));
    chart.apply_command(ChartCommand::CommitDrawing);
    chart.set_session(key("BBB"));
    assert_eq!(chart.drawings().drawings().len(), 1);
    assert!(!chart.apply_command(ChartCommand::Shutdown));
}

#[tokio::test(start_paused = true)]
async fn test_redraw_requests_coalesce_into_one_paint() {
    let (mut chart, _source) = controller(
        FakeSource::new().with_history("BTCUSDT", bars(0..20)),
        config().build(),
    );
    let mut host = RecordingHost::default();
    let id = chart.set_session(key("BTCUSDT"));
    chart.step().await;
    for i in 0..10 {
        chart.handle_live_event(id, LiveEvent::PriceTick(120.0 + i as f64));
    }
    chart.apply_command(ChartCommand::Redraw);

    chart.apply_series_updates(&mut host);
    assert!(chart.paint_if_due(&mut host));
    assert!(!chart.paint_if_due(&mut host));
    assert_eq!(host.frames.len(), 1);
    assert_eq!(host.fits, 1);
    assert_eq!(host.candles.len(), 20);
    assert_eq!(host.candles[19].close, 129.0);
    assert_eq!(host.frames[0].canvas.pixel_width, 1600);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_drives_host() {
    let (chart, _source) = controller(
        FakeSource::new().with_history("BTCUSDT", bars(0..20)),
        config().build(),
    );
    let (commands, rx) = mpsc::channel(8);
    let task = tokio::spawn(chart.run(RecordingHost::default(), rx));

    commands.send(ChartCommand::SetSession(key("BTCUSDT"))).await.unwrap();
    commands
        .send(ChartCommand::SetIndicators {
            enabled: all_indicators(),
            settings: IndicatorSettings::default(),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    commands.send(ChartCommand::Shutdown).await.unwrap();

    let host = task.await.unwrap();
    assert_eq!(host.candles.len(), 20);
    assert_eq!(host.fits, 1);
    assert!(!host.frames.is_empty());
    assert!(host.frames.len() < 10, "frames not coalesced: {}", host.frames.len());
}

// ===================================================================
// Live feed
// ===================================================================

#[tokio::test(start_paused = true)]
async fn test_live_feed_cadences() {
    let source = Arc::new(FakeSource::new().with_history("BTCUSDT", bars(0..20)));
    let config = config()
        .price_tick_interval(Duration::from_millis(500))
        .candle_poll_interval(Duration::from_secs(5))
        .poll_candles(2)
        .build();
    let mut feed = LiveFeed::spawn(Arc::clone(&source), key("BTCUSDT"), &config);

    let mut ticks = 0;
    let mut polls = Vec::new();
    for _ in 0..11 {
        match feed.next().await.unwrap() {
            LiveEvent::PriceTick(price) => {
                assert_eq!(price, 119.5);
                ticks += 1;
            }
            LiveEvent::Candles(candles) => polls.push(candles),
        }
    }
    assert_eq!(ticks, 10);
    assert_eq!(polls.len(), 1);
    assert_eq!(polls[0], bars(18..20));
}

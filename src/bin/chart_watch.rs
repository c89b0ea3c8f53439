//! Binary that drives a headless chart against a live backend and prints
//! what it would paint.
//!
//! # Usage
//!
//! ```sh
//! export CHART_API_URL="http://localhost:8080/api"
//! export CHART_SYMBOL="BTCUSDT"      # optional
//! export CHART_INTERVAL="5m"         # optional
//! cargo run --bin chart_watch --features cli
//! ```

use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

use livechart_rs::chart::controller::{BaseChart, ChartCommand, ChartController, OverlaySurface};
use livechart_rs::chart::coords::{LogicalScale, Projector};
use livechart_rs::chart::render::{Frame, Pane};
use livechart_rs::client::ChartApiClient;
use livechart_rs::config::ChartConfig;
use livechart_rs::types::{Candle, IndicatorKind, IndicatorSettings, Interval, SessionKey};
use tokio::sync::mpsc;
use tokio::time;

/// A chart with no screen: a fitted logical scale and a frame log.
struct HeadlessChart {
    pane: Pane,
    candles: Vec<Candle>,
    scale: LogicalScale,
    frames: u64,
}

impl HeadlessChart {
    fn new(pane: Pane) -> Self {
        Self {
            pane,
            candles: Vec::new(),
            scale: LogicalScale::fit(&[], pane),
            frames: 0,
        }
    }
}

impl Projector for HeadlessChart {
    fn time_to_x(&self, time: i64) -> Option<f64> {
        self.scale.time_to_x(time)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        self.scale.price_to_y(price)
    }
}

impl BaseChart for HeadlessChart {
    fn pane(&self) -> Pane {
        self.pane
    }

    fn set_candles(&mut self, candles: &[Candle]) {
        self.candles = candles.to_vec();
        self.scale = LogicalScale::fit(&self.candles, self.pane);
    }

    fn update_candle(&mut self, candle: &Candle) {
        match self.candles.last_mut() {
            Some(last) if last.time == candle.time => *last = *candle,
            _ => {
                self.candles.push(*candle);
                self.scale = LogicalScale::fit(&self.candles, self.pane);
            }
        }
    }

    fn fit_content(&mut self) {
        self.scale = LogicalScale::fit(&self.candles, self.pane);
    }
}

impl OverlaySurface for HeadlessChart {
    fn present(&mut self, frame: &Frame) {
        self.frames += 1;
        let labels = frame.commands.iter().filter(|c| c.is_label()).count();
        let last = self.candles.last().map(|c| c.close);
        println!(
            "frame #{:<4} {}x{} px  {} commands ({} labels)  candles={}  last={:?}",
            self.frames,
            frame.canvas.pixel_width,
            frame.canvas.pixel_height,
            frame.commands.len(),
            labels,
            self.candles.len(),
            last,
        );
    }
}

#[tokio::main]
async fn main() -> livechart_rs::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let symbol = env::var("CHART_SYMBOL").unwrap_or_else(|_| "BTCUSDT".to_owned());
    let interval: Interval = env::var("CHART_INTERVAL")
        .unwrap_or_else(|_| "5m".to_owned())
        .parse()?;
    let config = ChartConfig::from_env();

    println!("Connecting to {} for {symbol}@{interval}…", config.base_url);
    let client = ChartApiClient::with_base_url(config.base_url.clone());
    let controller = ChartController::new(client, config);

    let (commands, rx) = mpsc::channel(16);
    let host = HeadlessChart::new(Pane::new(960.0, 540.0, 2.0));
    let task = tokio::spawn(controller.run(host, rx));

    let _ = commands
        .send(ChartCommand::SetSession(SessionKey::new(symbol, interval)))
        .await;
    let _ = commands
        .send(ChartCommand::SetIndicators {
            enabled: BTreeSet::from(IndicatorKind::ALL),
            settings: IndicatorSettings::default(),
        })
        .await;

    println!("Watching for 15 seconds…\n");
    time::sleep(Duration::from_secs(15)).await;
    let _ = commands.send(ChartCommand::Shutdown).await;

    match task.await {
        Ok(host) => println!("\nDone: {} frames painted.", host.frames),
        Err(e) => eprintln!("controller task failed: {e}"),
    }
    Ok(())
}

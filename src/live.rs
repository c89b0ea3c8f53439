//! Push-based live updates for one chart session.
//!
//! The backend only offers request/response endpoints, so [`LiveFeed`]
//! adapts them into a stream: a background task polls the last price on a
//! short cadence and the last few candles on a longer one, and pushes each
//! result as a [`LiveEvent`]. The two event kinds keep the distinction
//! between a cheap price tick and a candle snapshot that may close a bar.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use futures_util::StreamExt;
//! use livechart_rs::client::ChartApiClient;
//! use livechart_rs::config::ChartConfig;
//! use livechart_rs::live::LiveFeed;
//! use livechart_rs::types::{Interval, SessionKey};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let source = Arc::new(ChartApiClient::new());
//! let key = SessionKey::new("BTCUSDT", Interval::M5);
//! let mut feed = LiveFeed::spawn(source, key, &ChartConfig::default());
//! while let Some(event) = feed.next().await {
//!     println!("{event:?}");
//! }
//! # }
//! ```

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::config::ChartConfig;
use crate::source::ChartDataSource;
use crate::types::candle::{Candle, SessionKey};

/// Buffered events before the poller waits for the consumer.
const LIVE_CHANNEL_CAPACITY: usize = 64;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// One live update.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Latest trade price; only moves the forming candle.
    PriceTick(f64),
    /// The last few candles as the backend currently sees them.
    Candles(Vec<Candle>),
}

/// Stream of [`LiveEvent`]s for a single `(symbol, interval)`.
///
/// Dropping the feed stops its polling task.
pub struct LiveFeed {
    rx: mpsc::Receiver<LiveEvent>,
    task: JoinHandle<()>,
}

impl LiveFeed {
    /// Start polling `source` for `key` using the cadences in `config`.
    ///
    /// The first tick of each timer fires one period after start; fetch
    /// errors are logged and skipped, the next tick retries.
    pub fn spawn<S: ChartDataSource>(source: Arc<S>, key: SessionKey, config: &ChartConfig) -> Self {
        let (tx, rx) = mpsc::channel(LIVE_CHANNEL_CAPACITY);
        // tokio intervals panic on a zero period
        let tick_every = config.price_tick_interval.max(MIN_PERIOD);
        let poll_every = config.candle_poll_interval.max(MIN_PERIOD);
        let poll_candles = config.poll_candles;

        let task = tokio::spawn(async move {
            let start = Instant::now();
            let mut price_tick = interval_at(start + tick_every, tick_every);
            price_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut candle_poll = interval_at(start + poll_every, poll_every);
            candle_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::debug!(session = %key, "live feed started");

            loop {
                let event = tokio::select! {
                    _ = price_tick.tick() => match source.latest_price(&key.symbol).await {
                        Ok(price) => LiveEvent::PriceTick(price),
                        Err(e) => {
                            tracing::warn!(session = %key, error = %e, "price tick failed");
                            continue;
                        }
                    },
                    _ = candle_poll.tick() => match source.candles(&key, poll_candles, None).await {
                        Ok(candles) => LiveEvent::Candles(candles),
                        Err(e) => {
                            tracing::warn!(session = %key, error = %e, "candle poll failed");
                            continue;
                        }
                    },
                };

                if tx.send(event).await.is_err() {
                    break;
                }
            }

            tracing::debug!(session = %key, "live feed stopped");
        });

        Self { rx, task }
    }
}

impl Stream for LiveFeed {
    type Item = LiveEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

//! Indicator geometry cache.
//!
//! Holds the latest snapshot of each enabled indicator so frames can be
//! painted without refetching. A refresh cancels every request still in
//! flight, bumps the cache generation and spawns one task per enabled
//! indicator. Completions are tagged with session and generation; only a
//! completion matching both is stored, so a superseded request can never
//! overwrite newer geometry even if its network call finishes.
//!
//! Setting changes go through a debounce timer first, so dragging a
//! parameter slider produces one refetch instead of a request storm.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chart::session::SessionId;
use crate::error::Result;
use crate::source::ChartDataSource;
use crate::types::candle::SessionKey;
use crate::types::indicators::*;

/// Result of one indicator request.
#[derive(Debug)]
pub struct IndicatorCompletion {
    pub session: SessionId,
    pub generation: u64,
    pub kind: IndicatorKind,
    pub result: Result<IndicatorSnapshot>,
}

/// The debounce timer armed by a settings change has fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceElapsed {
    pub session: SessionId,
    pub token: u64,
}

/// What a cached snapshot was computed for.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorKey {
    pub session: SessionKey,
    pub kind: IndicatorKind,
    pub settings: IndicatorSettings,
    pub limit: u32,
}

/// A stored snapshot and its key.
#[derive(Debug, Clone)]
pub struct CachedIndicator {
    pub key: IndicatorKey,
    pub snapshot: SharedSnapshot,
}

/// Latest indicator geometry for the active session.
#[derive(Debug, Default)]
pub struct IndicatorCache {
    enabled: IndicatorSet,
    settings: IndicatorSettings,
    entries: BTreeMap<IndicatorKind, CachedIndicator>,
    in_flight: BTreeMap<IndicatorKind, (JoinHandle<()>, IndicatorKey)>,
    session: Option<SessionId>,
    generation: u64,
    debounce: Option<JoinHandle<()>>,
    debounce_token: u64,
    requests_issued: u64,
}

impl IndicatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(&self) -> &IndicatorSet {
        &self.enabled
    }

    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }

    /// Replace the enabled set and parameters. Returns `true` if anything
    /// changed.
    pub fn configure(&mut self, enabled: IndicatorSet, settings: IndicatorSettings) -> bool {
        let changed = enabled != self.enabled || settings != self.settings;
        self.enabled = enabled;
        self.settings = settings;
        changed
    }

    /// Current refresh generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Total indicator requests spawned since creation.
    pub fn requests_issued(&self) -> u64 {
        self.requests_issued
    }

    /// Requests spawned by the current generation that have not completed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn get(&self, kind: IndicatorKind) -> Option<&CachedIndicator> {
        self.entries.get(&kind)
    }

    pub fn support_resistance(&self) -> Option<&[SrLevel]> {
        match self.entries.get(&IndicatorKind::SupportResistance)?.snapshot.as_ref() {
            IndicatorSnapshot::SupportResistance(levels) => Some(levels),
            _ => None,
        }
    }

    pub fn market_structure(&self) -> Option<&StructureResult> {
        match self.entries.get(&IndicatorKind::MarketStructure)?.snapshot.as_ref() {
            IndicatorSnapshot::MarketStructure(result) => Some(result),
            _ => None,
        }
    }

    pub fn elliott_wave(&self) -> Option<&ElliottWaveResult> {
        match self.entries.get(&IndicatorKind::ElliottWave)?.snapshot.as_ref() {
            IndicatorSnapshot::ElliottWave(result) => Some(result),
            _ => None,
        }
    }

    /// Abort every in-flight request and invalidate their completions.
    pub fn cancel_in_flight(&mut self) {
        for (_, (task, _)) in std::mem::take(&mut self.in_flight) {
            task.abort();
        }
        self.generation += 1;
    }

    /// Forget everything fetched for the previous session.
    pub fn reset(&mut self) {
        self.cancel_in_flight();
        self.cancel_debounce();
        self.entries.clear();
        self.session = None;
    }

    /// Fetch every enabled indicator for `key` over the last
    /// `candle_count` candles. Returns the number of requests spawned.
    pub fn refresh<S, M>(
        &mut self,
        source: &Arc<S>,
        session: SessionId,
        key: &SessionKey,
        candle_count: u32,
        tx: &mpsc::UnboundedSender<M>,
    ) -> usize
    where
        S: ChartDataSource,
        M: From<IndicatorCompletion> + Send + 'static,
    {
        self.cancel_in_flight();
        self.session = Some(session);
        self.entries.retain(|kind, _| self.enabled.contains(kind));

        let generation = self.generation;
        let limit = candle_count.max(1);
        for kind in self.enabled.iter().copied() {
            let indicator_key = IndicatorKey {
                session: key.clone(),
                kind,
                settings: self.settings.clone(),
                limit,
            };
            let source = Arc::clone(source);
            let tx = tx.clone();
            let request_key = key.clone();
            let settings = self.settings.clone();

            let task = tokio::spawn(async move {
                let result = source.indicator(kind, &request_key, limit, &settings).await;
                let _ = tx.send(M::from(IndicatorCompletion {
                    session,
                    generation,
                    kind,
                    result,
                }));
            });
            self.in_flight.insert(kind, (task, indicator_key));
            self.requests_issued += 1;
        }

        tracing::debug!(
            session = %session,
            generation,
            count = self.in_flight.len(),
            "indicator refresh"
        );
        self.in_flight.len()
    }

    /// Store a completion if it belongs to the current session and
    /// generation. Returns `true` if the cache changed.
    pub fn accept(&mut self, completion: IndicatorCompletion) -> bool {
        let IndicatorCompletion {
            session,
            generation,
            kind,
            result,
        } = completion;
        if self.session != Some(session) || generation != self.generation {
            tracing::debug!(%session, generation, ?kind, "dropping superseded indicator result");
            return false;
        }
        let Some((_, key)) = self.in_flight.remove(&kind) else {
            return false;
        };
        match result {
            Ok(snapshot) if snapshot.kind() == kind => {
                self.entries.insert(
                    kind,
                    CachedIndicator {
                        key,
                        snapshot: Arc::new(snapshot),
                    },
                );
                true
            }
            Ok(_) => {
                tracing::warn!(?kind, "indicator response of the wrong kind");
                false
            }
            Err(e) => {
                tracing::warn!(?kind, error = %e, "indicator fetch failed");
                false
            }
        }
    }

    /// Arm (or re-arm) the debounce timer. A pending timer is aborted.
    pub fn schedule_debounced<M>(&mut self, session: SessionId, delay: Duration, tx: &mpsc::UnboundedSender<M>) -> u64
    where
        M: From<DebounceElapsed> + Send + 'static,
    {
        self.cancel_debounce();
        self.debounce_token += 1;
        let token = self.debounce_token;
        let tx = tx.clone();
        self.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(M::from(DebounceElapsed { session, token }));
        }));
        token
    }

    /// Consume a fired timer. `false` if it was superseded.
    pub fn debounce_elapsed(&mut self, elapsed: DebounceElapsed) -> bool {
        if elapsed.token != self.debounce_token || self.debounce.is_none() {
            return false;
        }
        self.debounce = None;
        true
    }

    fn cancel_debounce(&mut self) {
        if let Some(task) = self.debounce.take() {
            task.abort();
        }
    }
}

impl Drop for IndicatorCache {
    fn drop(&mut self) {
        for (task, _) in self.in_flight.values() {
            task.abort();
        }
        if let Some(task) = &self.debounce {
            task.abort();
        }
    }
}

#![allow(missing_docs)]
//! Indicator types: support/resistance levels, market structure and
//! Elliott waves, plus the request parameters for each endpoint.
//!
//! Dates are kept as the backend's ISO-like strings; they are resolved to
//! candle times by the [coordinate mapper](crate::chart::coords) at render
//! time, so an unparsable date only drops the element it belongs to.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::lenient;

// ---------------------------------------------------------------------------
// Indicator kinds
// ---------------------------------------------------------------------------

/// The server-computed overlays the chart can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    SupportResistance,
    MarketStructure,
    ElliottWave,
}

impl IndicatorKind {
    /// All kinds, in paint order.
    pub const ALL: [IndicatorKind; 3] = [
        IndicatorKind::SupportResistance,
        IndicatorKind::MarketStructure,
        IndicatorKind::ElliottWave,
    ];
}

/// The set of enabled indicators.
pub type IndicatorSet = BTreeSet<IndicatorKind>;

// ---------------------------------------------------------------------------
// Support / resistance
// ---------------------------------------------------------------------------

/// A support or resistance band. The band spans between the prices `y`
/// and `area`, starting at `date`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SrLevel {
    pub y: f64,
    pub area: f64,
    pub date: String,
    pub is_support: bool,
}

// ---------------------------------------------------------------------------
// Market structure
// ---------------------------------------------------------------------------

/// Direction of a block or structure break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
}

/// An order block or breaker block.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBlock {
    #[serde(rename = "type")]
    pub kind: Bias,
    pub high: f64,
    pub low: f64,
    pub candle_date: String,
    #[serde(default)]
    pub is_mitigated: bool,
}

/// A swing pivot referenced by a structure break.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SwingPoint {
    pub price: f64,
    pub date: String,
}

/// A market structure break with its four reference swings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStructureBreak {
    pub break_type: Bias,
    pub break_date: String,
    pub h0: SwingPoint,
    pub l0: SwingPoint,
    pub h1: SwingPoint,
    pub l1: SwingPoint,
}

impl MarketStructureBreak {
    /// The swing whose level was broken: the prior high for a bullish break,
    /// the prior low for a bearish one.
    pub fn broken_swing(&self) -> &SwingPoint {
        match self.break_type {
            Bias::Bullish => &self.h0,
            Bias::Bearish => &self.l0,
        }
    }
}

/// Response of the market-structure endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureResult {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub order_blocks: Vec<PriceBlock>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub breaker_blocks: Vec<PriceBlock>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub market_structure_breaks: Vec<MarketStructureBreak>,
}

// ---------------------------------------------------------------------------
// Elliott wave
// ---------------------------------------------------------------------------

/// A filtered local extremum.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZigZagPoint {
    pub price: f64,
    pub date: String,
    #[serde(default)]
    pub is_high: bool,
}

/// A labelled pivot inside a wave pattern (`"1"`..`"5"`, `"A"`..`"C"`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WavePoint {
    pub label: String,
    pub price: f64,
    pub date: String,
}

/// Wave pattern family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveType {
    Motive,
    Corrective,
}

/// A recognised wave count.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WavePattern {
    #[serde(rename = "type")]
    pub kind: WaveType,
    pub direction: Bias,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub points: Vec<WavePoint>,
}

/// Response of the Elliott-wave endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElliottWaveResult {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub zigzag_points: Vec<ZigZagPoint>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub patterns: Vec<WavePattern>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One immutable indicator response.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorSnapshot {
    SupportResistance(Vec<SrLevel>),
    MarketStructure(StructureResult),
    ElliottWave(ElliottWaveResult),
}

impl IndicatorSnapshot {
    /// The kind this snapshot answers.
    pub fn kind(&self) -> IndicatorKind {
        match self {
            Self::SupportResistance(_) => IndicatorKind::SupportResistance,
            Self::MarketStructure(_) => IndicatorKind::MarketStructure,
            Self::ElliottWave(_) => IndicatorKind::ElliottWave,
        }
    }
}

/// Shared handle to a snapshot; refetches replace the `Arc`, never the data.
pub type SharedSnapshot = Arc<IndicatorSnapshot>;

// ---------------------------------------------------------------------------
// Request parameters
// ---------------------------------------------------------------------------

/// Parameters of `GET /indicators/support-resistance`.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportResistanceParams {
    /// Pivot bars to the left.
    pub left_bars: u32,
    /// Pivot bars to the right.
    pub right_bars: u32,
    /// Maximum number of levels returned.
    pub max_levels: u32,
}

impl Default for SupportResistanceParams {
    fn default() -> Self {
        Self {
            left_bars: 15,
            right_bars: 15,
            max_levels: 10,
        }
    }
}

/// Parameters of `GET /indicators/market-structure`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketStructureParams {
    pub swing_length: u32,
    pub show_order_blocks: bool,
    pub show_breaker_blocks: bool,
    pub hide_mitigated: bool,
}

impl Default for MarketStructureParams {
    fn default() -> Self {
        Self {
            swing_length: 5,
            show_order_blocks: true,
            show_breaker_blocks: true,
            hide_mitigated: false,
        }
    }
}

/// Parameters of `GET /indicators/elliott-wave`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElliottWaveParams {
    pub zigzag_length: u32,
    /// Minimum swing size, in percent of price.
    pub min_wave_pct: f64,
    pub show_zigzag: bool,
}

impl Default for ElliottWaveParams {
    fn default() -> Self {
        Self {
            zigzag_length: 4,
            min_wave_pct: 1.0,
            show_zigzag: true,
        }
    }
}

/// Per-indicator parameters, as edited by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSettings {
    pub support_resistance: SupportResistanceParams,
    pub market_structure: MarketStructureParams,
    pub elliott_wave: ElliottWaveParams,
}

impl IndicatorSettings {
    /// Indicator-specific query pairs for `kind`.
    pub fn query_pairs(&self, kind: IndicatorKind) -> Vec<(&'static str, String)> {
        match kind {
            IndicatorKind::SupportResistance => {
                let p = &self.support_resistance;
                vec![
                    ("leftBars", p.left_bars.to_string()),
                    ("rightBars", p.right_bars.to_string()),
                    ("maxLevels", p.max_levels.to_string()),
                ]
            }
            IndicatorKind::MarketStructure => {
                let p = &self.market_structure;
                vec![
                    ("swingLength", p.swing_length.to_string()),
                    ("showOrderBlocks", p.show_order_blocks.to_string()),
                    ("showBreakerBlocks", p.show_breaker_blocks.to_string()),
                    ("hideMitigated", p.hide_mitigated.to_string()),
                ]
            }
            IndicatorKind::ElliottWave => {
                let p = &self.elliott_wave;
                vec![
                    ("zigzagLength", p.zigzag_length.to_string()),
                    ("minWavePct", p.min_wave_pct.to_string()),
                    ("showZigzag", p.show_zigzag.to_string()),
                ]
            }
        }
    }
}

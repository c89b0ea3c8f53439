#![allow(missing_docs)]
//! Drawing types: user annotations and the in-progress drawing state.

use serde::{Deserialize, Serialize};

/// Drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingType {
    HorizontalLine,
    TrendLine,
    Rectangle,
    Fibonacci,
}

impl DrawingType {
    /// Number of anchor points the tool needs.
    pub fn anchor_count(self) -> usize {
        match self {
            Self::HorizontalLine => 1,
            Self::TrendLine | Self::Rectangle | Self::Fibonacci => 2,
        }
    }
}

/// An anchor in chart space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingPoint {
    pub price: f64,
    /// Unix seconds.
    pub time: i64,
}

impl DrawingPoint {
    pub fn new(price: f64, time: i64) -> Self {
        Self { price, time }
    }
}

/// A user drawing. Lives in memory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: DrawingType,
    /// Hex colour (`#rrggbb`).
    pub color: String,
    pub points: Vec<DrawingPoint>,
    /// Fixed price of a horizontal line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Drawings of a chart plus the drawing being dragged, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawingState {
    pub drawings: Vec<Drawing>,
    pub active_drawing: Option<Drawing>,
    pub is_drawing: bool,
}

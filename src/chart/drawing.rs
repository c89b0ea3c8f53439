//! Drawing session: gesture handling for user annotations.
//!
//! A drag starts with [`DrawingSession::begin`], moves the last anchor
//! with [`update`](DrawingSession::update) and ends with
//! [`commit`](DrawingSession::commit) or [`cancel`](DrawingSession::cancel).
//! Ids and the colour cycle belong to the session, not to global state.

use crate::constants::DRAWING_PALETTE;
use crate::types::drawing::{Drawing, DrawingPoint, DrawingState, DrawingType};

/// Owner of the drawings of one chart.
#[derive(Debug, Default)]
pub struct DrawingSession {
    state: DrawingState,
    next_id: u64,
    color_cursor: usize,
}

impl DrawingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    /// Committed drawings, in creation order.
    pub fn drawings(&self) -> &[Drawing] {
        &self.state.drawings
    }

    /// The drawing being dragged.
    pub fn active(&self) -> Option<&Drawing> {
        self.state.active_drawing.as_ref()
    }

    pub fn is_drawing(&self) -> bool {
        self.state.is_drawing
    }

    fn next_color(&mut self) -> String {
        let color = DRAWING_PALETTE[self.color_cursor % DRAWING_PALETTE.len()];
        self.color_cursor += 1;
        color.to_owned()
    }

    /// Start a new drawing at `at`. An unfinished drawing is discarded.
    pub fn begin(&mut self, kind: DrawingType, at: DrawingPoint) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let color = self.next_color();
        let (points, price) = match kind {
            DrawingType::HorizontalLine => (vec![at], Some(at.price)),
            _ => (vec![at, at], None),
        };
        self.state.active_drawing = Some(Drawing {
            id,
            kind,
            color,
            points,
            price,
        });
        self.state.is_drawing = true;
        id
    }

    /// Move the dragged anchor to `at`. Returns `false` when idle.
    pub fn update(&mut self, at: DrawingPoint) -> bool {
        let Some(active) = self.state.active_drawing.as_mut() else {
            return false;
        };
        match active.kind {
            DrawingType::HorizontalLine => {
                active.points[0] = at;
                active.price = Some(at.price);
            }
            _ => {
                if let Some(last) = active.points.last_mut() {
                    *last = at;
                }
            }
        }
        true
    }

    /// Promote the dragged drawing to the committed list.
    ///
    /// Two-anchor drawings whose anchors coincide are dropped.
    pub fn commit(&mut self) -> Option<u64> {
        self.state.is_drawing = false;
        let drawing = self.state.active_drawing.take()?;
        if drawing.kind.anchor_count() == 2 && drawing.points[0] == drawing.points[1] {
            tracing::debug!(id = drawing.id, "discarding zero-length drawing");
            return None;
        }
        let id = drawing.id;
        self.state.drawings.push(drawing);
        Some(id)
    }

    /// Abandon the dragged drawing.
    pub fn cancel(&mut self) -> bool {
        self.state.is_drawing = false;
        self.state.active_drawing.take().is_some()
    }

    /// Delete a committed drawing.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.state.drawings.len();
        self.state.drawings.retain(|d| d.id != id);
        self.state.drawings.len() != before
    }

    /// Delete every drawing, including one in progress.
    pub fn clear(&mut self) {
        self.state = DrawingState::default();
    }
}

//! The stroke store: sole owner of what is drawn.

use crate::error::{CanvasError, CanvasResult};
use crate::stroke::{Stroke, StrokeId};
use kurbo::{Point, Rect};
use std::collections::{HashMap, HashSet};

/// A change to the stroke collection.
///
/// Every mutator returns one of these instead of invoking listeners, so
/// consumers can apply a minimal diff.
#[derive(Debug, Clone, PartialEq)]
pub enum StrokeChange {
    /// A stroke was appended at the top of the z-order.
    Added(Stroke),
    /// `new` took the place of `old`, keeping its z-order position.
    Replaced { old: Stroke, new: Stroke },
    /// These strokes were removed, in back-to-front order.
    Erased(Vec<Stroke>),
    /// The collection was emptied.
    Cleared,
}

impl StrokeChange {
    /// The stroke that became visible, for `Added` and `Replaced`.
    pub fn new_stroke(&self) -> Option<&Stroke> {
        match self {
            StrokeChange::Added(stroke) | StrokeChange::Replaced { new: stroke, .. } => Some(stroke),
            _ => None,
        }
    }

    /// The stroke that was superseded, for `Replaced`.
    pub fn old_stroke(&self) -> Option<&Stroke> {
        match self {
            StrokeChange::Replaced { old, .. } => Some(old),
            _ => None,
        }
    }
}

/// Ordered stroke collection. Insertion order is the rendering z-order.
#[derive(Debug, Clone, Default)]
pub struct StrokeStore {
    /// All strokes, keyed by ID.
    strokes: HashMap<StrokeId, Stroke>,
    /// Z-order of strokes (back to front).
    z_order: Vec<StrokeId>,
}

impl StrokeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stroke at the front of the z-order.
    ///
    /// A stroke whose id is already stored is ignored and yields no change.
    pub fn append(&mut self, stroke: Stroke) -> Option<StrokeChange> {
        let id = stroke.id();
        if self.strokes.contains_key(&id) {
            log::warn!("Ignoring append of stroke {} already in the store", id);
            return None;
        }
        self.z_order.push(id);
        self.strokes.insert(id, stroke.clone());
        log::debug!("Stroke {} appended ({} total)", id, self.z_order.len());
        Some(StrokeChange::Added(stroke))
    }

    /// Substitute `new` for the stroke `old` at the same z-order position.
    pub fn replace(&mut self, old: StrokeId, new: Stroke) -> CanvasResult<StrokeChange> {
        let Some(pos) = self.z_order.iter().position(|&id| id == old) else {
            log::warn!("Replace target {} not found", old);
            return Err(CanvasError::StrokeNotFound(old));
        };
        let new_id = new.id();
        if new_id != old && self.strokes.contains_key(&new_id) {
            return Err(CanvasError::DuplicateStroke(new_id));
        }

        let previous = self
            .strokes
            .remove(&old)
            .ok_or(CanvasError::StrokeNotFound(old))?;
        self.z_order[pos] = new_id;
        self.strokes.insert(new_id, new.clone());
        log::debug!("Stroke {} replaced by {} at index {}", old, new_id, pos);
        Ok(StrokeChange::Replaced { old: previous, new })
    }

    /// Remove every stroke whose id is in `ids`. Unknown ids are ignored.
    ///
    /// Returns `None` when nothing was removed.
    pub fn erase<I>(&mut self, ids: I) -> Option<StrokeChange>
    where
        I: IntoIterator<Item = StrokeId>,
    {
        let targets: HashSet<StrokeId> = ids.into_iter().collect();
        if targets.is_empty() {
            return None;
        }

        let mut removed = Vec::new();
        let strokes = &mut self.strokes;
        self.z_order.retain(|id| {
            if !targets.contains(id) {
                return true;
            }
            if let Some(stroke) = strokes.remove(id) {
                removed.push(stroke);
            }
            false
        });

        if removed.is_empty() {
            return None;
        }
        log::debug!("Erased {} stroke(s)", removed.len());
        Some(StrokeChange::Erased(removed))
    }

    /// Remove all strokes. Returns `None` if the store was already empty.
    pub fn clear(&mut self) -> Option<StrokeChange> {
        if self.z_order.is_empty() {
            return None;
        }
        self.strokes.clear();
        self.z_order.clear();
        log::debug!("Stroke store cleared");
        Some(StrokeChange::Cleared)
    }

    /// Snapshot of all strokes in z-order (back to front).
    ///
    /// Later mutations do not affect a returned snapshot.
    pub fn get_all(&self) -> Vec<Stroke> {
        self.iter().cloned().collect()
    }

    /// Iterate strokes in z-order (back to front).
    pub fn iter(&self) -> impl Iterator<Item = &Stroke> {
        self.z_order.iter().filter_map(|id| self.strokes.get(id))
    }

    /// Get a stroke by ID.
    pub fn get(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.get(&id)
    }

    pub fn contains(&self, id: StrokeId) -> bool {
        self.strokes.contains_key(&id)
    }

    /// Z-order index of a stroke.
    pub fn position(&self, id: StrokeId) -> Option<usize> {
        self.z_order.iter().position(|&stroke_id| stroke_id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.z_order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.z_order.len()
    }

    /// Find strokes at a content-space point, front to back.
    pub fn strokes_at_point(&self, point: Point, tolerance: f64) -> Vec<StrokeId> {
        self.z_order
            .iter()
            .rev()
            .filter_map(|&id| {
                self.strokes
                    .get(&id)
                    .filter(|s| s.hit_test(point, tolerance))
                    .map(|_| id)
            })
            .collect()
    }

    /// Bounding box of all strokes.
    pub fn bounds(&self) -> Option<Rect> {
        self.iter()
            .filter(|s| !s.is_empty())
            .map(Stroke::bounds)
            .reduce(|acc, b| acc.union(b))
    }
}

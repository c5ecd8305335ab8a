//! Ink strokes: immutable sample sequences plus style.

use crate::device::PointerDeviceKind;
use kurbo::{BezPath, Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for strokes.
pub type StrokeId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Shape of the pen tip used to draw a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PenTip {
    #[default]
    Circle,
    Rectangle,
}

/// Style properties for a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// Ink color.
    pub color: SerializableColor,
    /// Nominal width in content units (at full pressure).
    pub width: f64,
    /// Pen tip shape.
    #[serde(default)]
    pub tip: PenTip,
}

impl StrokeStyle {
    /// Get the ink color as a peniko Color.
    pub fn color(&self) -> Color {
        self.color.into()
    }

    /// Set the ink color from a peniko Color.
    pub fn set_color(&mut self, color: Color) {
        self.color = color.into();
    }
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            width: 2.0,
            tip: PenTip::default(),
        }
    }
}

/// One sample of an ink gesture, in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkPoint {
    pub position: Point,
    /// Normalized pressure (0.0 to 1.0). Devices without pressure report 0.5.
    pub pressure: f32,
    /// Milliseconds since the hosting view started.
    pub timestamp_ms: u64,
}

impl InkPoint {
    pub fn new(position: Point, pressure: f32, timestamp_ms: u64) -> Self {
        Self {
            position,
            pressure: pressure.clamp(0.0, 1.0),
            timestamp_ms,
        }
    }
}

/// A completed ink stroke.
///
/// Strokes never change after construction. Editing one means building a new
/// stroke (with a new id) and replacing the old one in the store. Two strokes
/// compare equal only when their ids match, whatever their samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stroke {
    id: StrokeId,
    points: Arc<[InkPoint]>,
    style: StrokeStyle,
}

impl Stroke {
    /// Create a stroke with a fresh id.
    pub fn new(points: Vec<InkPoint>, style: StrokeStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            points: points.into(),
            style,
        }
    }

    /// Create a stroke from bare positions at default pressure.
    pub fn from_positions(positions: &[Point], style: StrokeStyle) -> Self {
        let points = positions
            .iter()
            .map(|&position| InkPoint::new(position, 0.5, 0))
            .collect();
        Self::new(points, style)
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    pub fn points(&self) -> &[InkPoint] {
        &self.points
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A new stroke with the same style and different samples.
    pub fn with_points(&self, points: Vec<InkPoint>) -> Self {
        Self::new(points, self.style)
    }

    /// A new stroke with the same samples and a different style.
    pub fn restyled(&self, style: StrokeStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            points: Arc::clone(&self.points),
            style,
        }
    }

    /// A new stroke with redundant samples removed (Ramer-Douglas-Peucker).
    pub fn simplified(&self, tolerance: f64) -> Self {
        if self.points.len() < 3 {
            return self.with_points(self.points.to_vec());
        }
        self.with_points(rdp_simplify(&self.points, tolerance))
    }

    /// Bounding box of the sample positions in content coordinates.
    pub fn bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };
        self.points
            .iter()
            .skip(1)
            .fold(Rect::from_points(first.position, first.position), |rect, p| {
                rect.union_pt(p.position)
            })
    }

    /// Check if a content-space point lies on this stroke.
    ///
    /// The stroke's own half width is added to `tolerance`.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let reach = tolerance + self.style.width / 2.0;
        match self.points.as_ref() {
            [] => false,
            [only] => (point - only.position).hypot() <= reach,
            points => points
                .windows(2)
                .any(|w| point_to_segment_dist(point, w[0].position, w[1].position) <= reach),
        }
    }

    /// Polyline path through the samples, for renderers.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut iter = self.points.iter();
        if let Some(first) = iter.next() {
            path.move_to(first.position);
            for point in iter {
                path.line_to(point.position);
            }
        }
        path
    }
}

impl PartialEq for Stroke {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Stroke {}

impl Hash for Stroke {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Accumulates samples for the stroke currently being drawn.
#[derive(Debug, Clone)]
pub struct StrokeBuilder {
    device: PointerDeviceKind,
    style: StrokeStyle,
    points: Vec<InkPoint>,
}

impl StrokeBuilder {
    pub fn new(device: PointerDeviceKind, style: StrokeStyle) -> Self {
        Self {
            device,
            style,
            points: Vec::new(),
        }
    }

    /// Device class that started this stroke.
    pub fn device(&self) -> PointerDeviceKind {
        self.device
    }

    /// Add a sample. Repeats of the previous position are dropped.
    pub fn push(&mut self, point: InkPoint) {
        if let Some(last) = self.points.last() {
            if (last.position - point.position).hypot2() < f64::EPSILON {
                return;
            }
        }
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Finish the gesture. Returns `None` if no sample was recorded.
    pub fn finish(self) -> Option<Stroke> {
        if self.points.is_empty() {
            return None;
        }
        Some(Stroke::new(self.points, self.style))
    }
}

/// Distance from a point to a line segment (a to b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Ramer-Douglas-Peucker simplification over sample positions.
fn rdp_simplify(points: &[InkPoint], tolerance: f64) -> Vec<InkPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_index = 0;
    for (i, point) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let dist = perpendicular_distance(point.position, first.position, last.position);
        if dist > max_dist {
            max_dist = dist;
            max_index = i;
        }
    }

    if max_dist > tolerance {
        let mut left = rdp_simplify(&points[..=max_index], tolerance);
        let right = rdp_simplify(&points[max_index..], tolerance);
        // Junction sample appears in both halves
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(point: Point, line_start: Point, line_end: Point) -> f64 {
    let line: Vec2 = line_end - line_start;
    let line_len_sq = line.hypot2();
    if line_len_sq < f64::EPSILON {
        return (point - line_start).hypot();
    }
    (point - line_start).cross(line).abs() / line_len_sq.sqrt()
}

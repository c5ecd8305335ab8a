//! Viewport module for zoom/pan transforms.

use crate::config::ViewportConfig;
use crate::error::CanvasResult;
use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Zoom scale and pan offset mapping content to the visible surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    scale: f64,
    offset: Vec2,
    content_size: Option<Size>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
            content_size: None,
        }
    }
}

impl Viewport {
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Pan offset in screen units.
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Logical size of the loaded background, if any.
    pub fn content_size(&self) -> Option<Size> {
        self.content_size
    }

    /// Transform from content coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Transform from screen coordinates to content coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    pub fn screen_to_content(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn content_to_screen(&self, content_point: Point) -> Point {
        self.transform() * content_point
    }
}

/// New scale and offset after a viewport change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportChange {
    pub scale: f64,
    pub offset: Vec2,
}

/// Owns the [`Viewport`] and keeps its scale within bounds.
///
/// Every operation returns `Some(change)` only when scale or offset actually
/// moved, so repeating an identical fit is silent.
#[derive(Debug, Clone)]
pub struct ViewportController {
    viewport: Viewport,
    view_size: Option<Size>,
    min_scale: f64,
    max_scale: f64,
    zoom_step: f64,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::from_validated(&ViewportConfig::default())
    }
}

impl ViewportController {
    /// Create a controller after validating `config`.
    pub fn new(config: &ViewportConfig) -> CanvasResult<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    /// Create a controller from a config that already passed `validate`.
    pub(crate) fn from_validated(config: &ViewportConfig) -> Self {
        Self {
            viewport: Viewport::default(),
            view_size: None,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            zoom_step: config.zoom_step,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Last known size of the visible surface.
    pub fn view_size(&self) -> Option<Size> {
        self.view_size
    }

    pub fn min_scale(&self) -> f64 {
        self.min_scale
    }

    pub fn max_scale(&self) -> f64 {
        self.max_scale
    }

    /// Record the visible surface size without changing the transform.
    pub fn set_view_size(&mut self, width: f64, height: f64) {
        match valid_size(width, height) {
            Some(size) => self.view_size = Some(size),
            None => log::warn!("Ignoring invalid view size {}x{}", width, height),
        }
    }

    pub fn zoom_in(&mut self) -> Option<ViewportChange> {
        self.zoom_by(self.zoom_step)
    }

    pub fn zoom_out(&mut self) -> Option<ViewportChange> {
        self.zoom_by(1.0 / self.zoom_step)
    }

    /// Scale back to 1.0 with no pan.
    pub fn reset_zoom(&mut self) -> Option<ViewportChange> {
        self.apply(1.0, Vec2::ZERO)
    }

    /// Fit the content inside a `width` x `height` view, centered.
    ///
    /// The view size is remembered for later [`fit_to_size`](Self::fit_to_size)
    /// calls. Without content this resets the zoom.
    pub fn fit_to_screen(&mut self, width: f64, height: f64) -> Option<ViewportChange> {
        let Some(view) = valid_size(width, height) else {
            log::warn!("Ignoring fit to invalid view size {}x{}", width, height);
            return None;
        };
        self.view_size = Some(view);
        self.fit(view)
    }

    /// Set the content size and fit it to the last known view.
    pub fn fit_to_size(&mut self, width: f64, height: f64) -> Option<ViewportChange> {
        self.viewport.content_size = valid_size(width, height);
        match self.view_size {
            Some(view) => self.fit(view),
            None => self.reset_zoom(),
        }
    }

    /// Forget the content size. The stale offset is dropped with it.
    pub fn clear_content(&mut self) -> Option<ViewportChange> {
        self.viewport.content_size = None;
        self.reset_zoom()
    }

    /// Zoom by `factor`, keeping the view center fixed when the view size is known.
    fn zoom_by(&mut self, factor: f64) -> Option<ViewportChange> {
        let scale = (self.viewport.scale * factor).clamp(self.min_scale, self.max_scale);
        if (scale - self.viewport.scale).abs() < f64::EPSILON {
            return None;
        }

        let anchor = self
            .view_size
            .map(|view| Point::new(view.width / 2.0, view.height / 2.0))
            .unwrap_or(Point::ZERO);
        // Content point under the anchor stays under the anchor
        let content_anchor = self.viewport.screen_to_content(anchor);
        let offset = anchor.to_vec2() - content_anchor.to_vec2() * scale;
        self.apply(scale, offset)
    }

    fn fit(&mut self, view: Size) -> Option<ViewportChange> {
        let Some(content) = self.viewport.content_size else {
            return self.reset_zoom();
        };

        let scale = (view.width / content.width)
            .min(view.height / content.height)
            .clamp(self.min_scale, self.max_scale);
        let offset = Vec2::new(
            (view.width - content.width * scale) / 2.0,
            (view.height - content.height * scale) / 2.0,
        );
        self.apply(scale, offset)
    }

    fn apply(&mut self, scale: f64, offset: Vec2) -> Option<ViewportChange> {
        let unchanged = (scale - self.viewport.scale).abs() < f64::EPSILON
            && (offset - self.viewport.offset).hypot() < 1e-9;
        if unchanged {
            return None;
        }
        self.viewport.scale = scale;
        self.viewport.offset = offset;
        log::debug!("Viewport scale {:.3}, offset ({:.1}, {:.1})", scale, offset.x, offset.y);
        Some(ViewportChange { scale, offset })
    }
}

fn valid_size(width: f64, height: f64) -> Option<Size> {
    let valid = width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0;
    valid.then(|| Size::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport() {
        let controller = ViewportController::default();
        let viewport = controller.viewport();
        assert!((viewport.scale() - 1.0).abs() < f64::EPSILON);
        assert_eq!(viewport.offset(), Vec2::ZERO);
        assert!(viewport.content_size().is_none());
    }

    #[test]
    fn test_screen_to_content_with_zoom_and_offset() {
        let mut controller = ViewportController::default();
        controller.fit_to_screen(400.0, 300.0);
        controller.fit_to_size(800.0, 600.0);
        let viewport = controller.viewport();

        let content = viewport.screen_to_content(Point::new(100.0, 50.0));
        assert!((content.x - 200.0).abs() < 1e-10);
        assert!((content.y - 100.0).abs() < 1e-10);

        let back = viewport.content_to_screen(content);
        assert!((back.x - 100.0).abs() < 1e-10);
        assert!((back.y - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_zoom_in_is_capped() {
        let mut controller = ViewportController::default();
        for _ in 0..100 {
            controller.zoom_in();
            assert!(controller.viewport().scale() <= controller.max_scale());
        }
        assert!((controller.viewport().scale() - controller.max_scale()).abs() < f64::EPSILON);
        assert!(controller.zoom_in().is_none());
    }

    #[test]
    fn test_zoom_out_is_capped() {
        let mut controller = ViewportController::default();
        for _ in 0..100 {
            controller.zoom_out();
        }
        assert!((controller.viewport().scale() - controller.min_scale()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_step() {
        let mut controller = ViewportController::default();
        let change = controller.zoom_in().unwrap();
        assert!((change.scale - 1.25).abs() < f64::EPSILON);
        let change = controller.zoom_out().unwrap();
        assert!((change.scale - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_keeps_view_center() {
        let mut controller = ViewportController::default();
        controller.set_view_size(400.0, 300.0);
        let center = Point::new(200.0, 150.0);
        let before = controller.viewport().screen_to_content(center);

        controller.zoom_in();
        let after = controller.viewport().screen_to_content(center);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_reset_zoom() {
        let mut controller = ViewportController::default();
        controller.set_view_size(400.0, 300.0);
        controller.zoom_in();
        let change = controller.reset_zoom().unwrap();
        assert!((change.scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(change.offset, Vec2::ZERO);
        assert!(controller.reset_zoom().is_none());
    }

    #[test]
    fn test_fit_to_size_scales_down_and_centers() {
        let mut controller = ViewportController::default();
        controller.set_view_size(400.0, 300.0);

        let change = controller.fit_to_size(800.0, 600.0).unwrap();
        assert!((change.scale - 0.5).abs() < f64::EPSILON);
        assert!(change.offset.x.abs() < f64::EPSILON);
        assert!(change.offset.y.abs() < f64::EPSILON);
        assert_eq!(controller.viewport().content_size(), Some(Size::new(800.0, 600.0)));
    }

    #[test]
    fn test_fit_centers_along_slack_axis() {
        let mut controller = ViewportController::default();
        controller.set_view_size(400.0, 400.0);
        let change = controller.fit_to_size(800.0, 400.0).unwrap();
        assert!((change.scale - 0.5).abs() < f64::EPSILON);
        assert!(change.offset.x.abs() < f64::EPSILON);
        assert!((change.offset.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fit_respects_max_scale() {
        let mut controller = ViewportController::default();
        controller.set_view_size(1000.0, 1000.0);
        let change = controller.fit_to_size(10.0, 10.0).unwrap();
        assert!((change.scale - 10.0).abs() < f64::EPSILON);
        assert!((change.offset.x - 450.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fit_is_idempotent() {
        let mut controller = ViewportController::default();
        controller.fit_to_size(800.0, 600.0);
        assert!(controller.fit_to_screen(400.0, 300.0).is_some());
        assert!(controller.fit_to_screen(400.0, 300.0).is_none());
        assert!(controller.fit_to_size(800.0, 600.0).is_none());
    }

    #[test]
    fn test_fit_to_size_without_view_resets() {
        let mut controller = ViewportController::default();
        controller.zoom_in();
        let change = controller.fit_to_size(800.0, 600.0).unwrap();
        assert!((change.scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(controller.viewport().content_size(), Some(Size::new(800.0, 600.0)));
    }

    #[test]
    fn test_fit_to_screen_rejects_empty_view() {
        let mut controller = ViewportController::default();
        controller.fit_to_size(800.0, 600.0);
        assert!(controller.fit_to_screen(0.0, 300.0).is_none());
        assert!(controller.fit_to_screen(f64::NAN, 300.0).is_none());
        assert!(controller.view_size().is_none());
    }

    #[test]
    fn test_clear_content_drops_offset() {
        let mut controller = ViewportController::default();
        controller.set_view_size(400.0, 400.0);
        controller.fit_to_size(800.0, 400.0);
        let change = controller.clear_content().unwrap();
        assert_eq!(change.offset, Vec2::ZERO);
        assert!(controller.viewport().content_size().is_none());
    }

    #[test]
    fn test_new_rejects_inverted_bounds() {
        let config = ViewportConfig {
            min_scale: 5.0,
            max_scale: 2.0,
            zoom_step: 1.25,
        };
        let result = ViewportController::new(&config);
        assert!(matches!(result, Err(crate::error::CanvasError::Config(_))));

        let nan = ViewportConfig {
            min_scale: f64::NAN,
            ..ViewportConfig::default()
        };
        assert!(ViewportController::new(&nan).is_err());

        let mut controller = ViewportController::new(&ViewportConfig::default()).unwrap();
        assert!(controller.zoom_in().is_some());
    }
}

//! End-to-end behaviour of a canvas session through the public API.

use kurbo::{Point, Vec2};
use penslate_core::{
    BackgroundImage, CanvasController, CanvasError, CanvasEvent, CommandState,
    MemoryImageStorage, PenProximity, PointerDeviceArbiter, PointerDeviceKind, PointerEvent,
    PointerPhase, Stroke, StrokeChange, StrokeStore, StrokeStyle, ViewportController,
};
use penslate_core::config::ViewportConfig;
use pollster::block_on;

fn stroke(x: f64) -> Stroke {
    Stroke::from_positions(
        &[Point::new(x, 0.0), Point::new(x + 10.0, 10.0)],
        StrokeStyle::default(),
    )
}

fn png(width: u32, height: u32) -> BackgroundImage {
    BackgroundImage::new(vec![0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A], width, height)
}

#[test]
fn test_append_order_is_call_order() {
    let mut store = StrokeStore::new();
    let strokes: Vec<Stroke> = (0..20).map(|i| stroke(i as f64)).collect();
    for s in &strokes {
        assert!(store.append(s.clone()).is_some());
    }

    let all = store.get_all();
    assert_eq!(all, strokes);
    let mut ids: Vec<_> = all.iter().map(Stroke::id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[test]
fn test_replace_preserves_position_or_fails_cleanly() {
    let mut store = StrokeStore::new();
    let (a, b, c) = (stroke(0.0), stroke(1.0), stroke(2.0));
    for s in [&a, &b, &c] {
        store.append(s.clone());
    }

    let b2 = stroke(50.0);
    let change = store.replace(b.id(), b2.clone()).unwrap();
    assert_eq!(change.old_stroke(), Some(&b));
    assert_eq!(change.new_stroke(), Some(&b2));
    assert_eq!(store.get_all(), vec![a.clone(), b2.clone(), c.clone()]);

    let before = store.get_all();
    let result = store.replace(b.id(), stroke(9.0));
    assert!(matches!(result, Err(CanvasError::StrokeNotFound(id)) if id == b.id()));
    assert_eq!(store.get_all(), before);
}

#[test]
fn test_erase_is_idempotent() {
    let mut store = StrokeStore::new();
    let a = stroke(0.0);
    let b = stroke(1.0);
    store.append(a.clone());

    let first = store.erase([a.id(), b.id()]);
    assert_eq!(first, Some(StrokeChange::Erased(vec![a.clone()])));
    assert!(store.erase([a.id(), b.id()]).is_none());
    assert!(store.is_empty());
}

#[test]
fn test_clear_emits_once() {
    let mut store = StrokeStore::new();
    assert!(store.clear().is_none());

    store.append(stroke(0.0));
    store.append(stroke(1.0));
    assert_eq!(store.clear(), Some(StrokeChange::Cleared));
    assert!(store.is_empty());
    assert!(store.clear().is_none());
}

#[test]
fn test_snapshot_unaffected_by_later_mutation() {
    let mut store = StrokeStore::new();
    store.append(stroke(0.0));
    let snapshot = store.get_all();
    store.clear();
    assert_eq!(snapshot.len(), 1);
}

#[test]
fn test_pen_latch_gates_touch() {
    let mut arbiter = PointerDeviceArbiter::default();
    arbiter.set_touch_enabled(true);
    arbiter.on_pen_proximity();
    assert!(!arbiter.effective_touch_enabled());

    // Toggling touch on again does not override the latch
    arbiter.set_touch_enabled(false);
    arbiter.set_touch_enabled(true);
    assert!(!arbiter.effective_touch_enabled());
    assert!(arbiter.effective_mouse_enabled());

    arbiter.on_pen_left();
    assert!(arbiter.effective_touch_enabled());
}

#[test]
fn test_zoom_in_never_exceeds_max() {
    let config = ViewportConfig::default();
    let mut viewport = ViewportController::new(&config).unwrap();
    for _ in 0..100 {
        viewport.zoom_in();
        assert!(viewport.viewport().scale() <= config.max_scale);
    }
    assert!((viewport.viewport().scale() - config.max_scale).abs() < f64::EPSILON);
}

#[test]
fn test_background_fits_view() {
    let mut controller = CanvasController::default();
    controller.set_view_size(400.0, 300.0);

    let events = controller.load_background(png(800, 600)).unwrap();
    assert!(events.contains(&CanvasEvent::BackgroundLoaded {
        width: 800,
        height: 600
    }));

    let viewport = controller.viewport();
    assert!((viewport.scale() - 0.5).abs() < f64::EPSILON);
    assert_eq!(viewport.offset(), Vec2::ZERO);
    assert_eq!(
        viewport.content_to_screen(Point::new(400.0, 300.0)),
        Point::new(200.0, 150.0)
    );
}

#[test]
fn test_can_save_lifecycle() {
    let mut controller = CanvasController::default();
    assert!(!controller.can_save());

    controller.append_stroke(stroke(0.0));
    assert!(controller.can_save());

    controller.clear_all();
    assert!(!controller.can_save());
}

#[test]
fn test_annotate_and_save_session() {
    let storage = MemoryImageStorage::new();
    storage.insert_image("scan.png", png(800, 600)).unwrap();

    let mut controller = CanvasController::default();
    controller.set_view_size(400.0, 300.0);
    block_on(controller.load_background_from(&storage, "scan.png")).unwrap();
    assert!(controller.can_clear());
    assert!(!controller.can_save());

    // Palm resting while the pen hovers produces no ink
    controller.handle_proximity(PenProximity::Entered);
    for phase in [PointerPhase::Down, PointerPhase::Move, PointerPhase::Up] {
        controller.handle_pointer(PointerEvent::new(
            PointerDeviceKind::Touch,
            phase,
            Point::new(20.0, 20.0),
        ));
    }
    assert!(controller.store().is_empty());

    let mut events = Vec::new();
    for (phase, x) in [
        (PointerPhase::Down, 10.0),
        (PointerPhase::Move, 60.0),
        (PointerPhase::Up, 110.0),
    ] {
        events.extend(controller.handle_pointer(
            PointerEvent::new(PointerDeviceKind::Pen, phase, Point::new(x, 100.0)).with_pressure(0.7),
        ));
    }
    assert_eq!(
        events.last(),
        Some(&CanvasEvent::CommandStateChanged(CommandState {
            can_save: true,
            can_clear: true
        }))
    );

    let strokes = controller.strokes();
    let ink = &strokes[0];
    assert_eq!(ink.points()[0].position, Point::new(20.0, 200.0));

    block_on(controller.save_background_to(&storage, "scan-annotated.png")).unwrap();
    let saved = storage.saved("scan-annotated.png").unwrap();
    assert_eq!(saved.strokes, controller.strokes());
    assert_eq!(saved.size().width, 800.0);

    storage.set_read_only(true);
    let failed = block_on(controller.save_background_to(&storage, "again.png"));
    assert!(matches!(failed, Err(CanvasError::BackgroundSave(_))));
    assert!(!controller.is_busy());
}

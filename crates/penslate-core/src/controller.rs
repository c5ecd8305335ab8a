//! Canvas controller: the facade the presentation and command layers call.
//!
//! All mutation happens on the caller's thread through `&mut self`. Every
//! operation returns the [`CanvasEvent`]s it caused, in order, ending with a
//! [`CanvasEvent::CommandStateChanged`] whenever save/clear availability flipped.
//!
//! Background load and save cross an asynchronous boundary. They are split in
//! two halves: `begin_*` hands out a ticket (and, for saves, a snapshot), the
//! caller runs the persistence future wherever it likes, then feeds the result
//! back through `complete_*` on the mutation thread. While a ticket is
//! outstanding, starting another load or save fails with [`CanvasError::Busy`].

use crate::background::{BackgroundImage, FlattenedCanvas};
use crate::config::CanvasConfig;
use crate::device::{
    PenProximity, PointerDeviceArbiter, PointerDeviceKind, PointerDeviceState, PointerEvent,
    PointerPhase,
};
use crate::error::{CanvasError, CanvasResult};
use crate::storage::{ImageStorage, StorageResult};
use crate::store::{StrokeChange, StrokeStore};
use crate::stroke::{InkPoint, Stroke, StrokeBuilder, StrokeId};
use crate::viewport::{Viewport, ViewportChange, ViewportController};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pressure recorded for devices that do not report one.
const DEFAULT_PRESSURE: f32 = 0.5;

/// Kind of background operation in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Load,
    Save,
}

impl fmt::Display for PendingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingKind::Load => write!(f, "load"),
            PendingKind::Save => write!(f, "save"),
        }
    }
}

/// Proof that a background load was started. Redeem with
/// [`CanvasController::complete_load`].
#[derive(Debug, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Proof that a save was started. Redeem with
/// [`CanvasController::complete_save`].
#[derive(Debug, PartialEq, Eq)]
pub struct SaveTicket(u64);

/// A started save: the ticket plus the snapshot to hand to storage.
#[derive(Debug)]
pub struct SaveRequest {
    pub ticket: SaveTicket,
    pub canvas: FlattenedCanvas,
}

/// What pointer input does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InkMode {
    #[default]
    Draw,
    Erase,
}

/// Availability of the save and clear commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CommandState {
    pub can_save: bool,
    pub can_clear: bool,
}

/// Notification for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    Stroke(StrokeChange),
    Viewport(ViewportChange),
    BackgroundLoaded { width: u32, height: u32 },
    BackgroundCleared,
    DevicesChanged(PointerDeviceState),
    CommandStateChanged(CommandState),
}

/// Pointer gesture in progress, owned by one contact.
#[derive(Debug)]
enum Gesture {
    Drawing {
        pointer_id: u32,
        builder: StrokeBuilder,
    },
    Erasing {
        device: PointerDeviceKind,
        pointer_id: u32,
    },
}

impl Gesture {
    fn device(&self) -> PointerDeviceKind {
        match self {
            Gesture::Drawing { builder, .. } => builder.device(),
            Gesture::Erasing { device, .. } => *device,
        }
    }

    fn owned_by(&self, event: &PointerEvent) -> bool {
        let pointer_id = match self {
            Gesture::Drawing { pointer_id, .. } | Gesture::Erasing { pointer_id, .. } => *pointer_id,
        };
        self.device() == event.device && pointer_id == event.pointer_id
    }
}

#[derive(Debug)]
struct Pending {
    kind: PendingKind,
    id: u64,
}

/// Composition root of the ink canvas.
#[derive(Debug)]
pub struct CanvasController {
    config: CanvasConfig,
    store: StrokeStore,
    devices: PointerDeviceArbiter,
    viewport: ViewportController,
    background: Option<BackgroundImage>,
    mode: InkMode,
    gesture: Option<Gesture>,
    pending: Option<Pending>,
    next_ticket: u64,
    /// Last command state reported through `CommandStateChanged`.
    reported: CommandState,
}

impl Default for CanvasController {
    fn default() -> Self {
        Self::from_config(CanvasConfig::default())
    }
}

impl CanvasController {
    /// Create a controller after validating `config`.
    pub fn new(config: CanvasConfig) -> CanvasResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: CanvasConfig) -> Self {
        Self {
            store: StrokeStore::new(),
            devices: PointerDeviceArbiter::new(
                config.devices.mouse_enabled,
                config.devices.touch_enabled,
            ),
            viewport: ViewportController::from_validated(&config.viewport),
            background: None,
            mode: InkMode::default(),
            gesture: None,
            pending: None,
            next_ticket: 1,
            reported: CommandState::default(),
            config,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn store(&self) -> &StrokeStore {
        &self.store
    }

    /// Snapshot of all strokes in z-order.
    pub fn strokes(&self) -> Vec<Stroke> {
        self.store.get_all()
    }

    pub fn device_state(&self) -> PointerDeviceState {
        self.devices.state()
    }

    pub fn viewport(&self) -> &Viewport {
        self.viewport.viewport()
    }

    pub fn viewport_controller(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn background(&self) -> Option<&BackgroundImage> {
        self.background.as_ref()
    }

    pub fn mode(&self) -> InkMode {
        self.mode
    }

    /// Whether a pointer gesture is in progress.
    pub fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    /// The background operation in flight, if any.
    pub fn pending(&self) -> Option<PendingKind> {
        self.pending.as_ref().map(|p| p.kind)
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    // --- Derived command state ---

    /// Save needs ink, and a background too when the config requires one.
    pub fn can_save(&self) -> bool {
        !self.store.is_empty()
            && (!self.config.save.require_background || self.background.is_some())
    }

    pub fn can_clear(&self) -> bool {
        self.background.is_some() || !self.store.is_empty()
    }

    pub fn command_state(&self) -> CommandState {
        CommandState {
            can_save: self.can_save(),
            can_clear: self.can_clear(),
        }
    }

    /// Append a `CommandStateChanged` if availability moved since the last report.
    fn finish(&mut self, mut events: Vec<CanvasEvent>) -> Vec<CanvasEvent> {
        let state = self.command_state();
        if state != self.reported {
            self.reported = state;
            events.push(CanvasEvent::CommandStateChanged(state));
        }
        events
    }

    // --- Strokes ---

    pub fn append_stroke(&mut self, stroke: Stroke) -> Vec<CanvasEvent> {
        let events = self.store.append(stroke).map(CanvasEvent::Stroke).into_iter().collect();
        self.finish(events)
    }

    pub fn replace_stroke(&mut self, old: StrokeId, new: Stroke) -> CanvasResult<Vec<CanvasEvent>> {
        let change = self.store.replace(old, new)?;
        Ok(self.finish(vec![CanvasEvent::Stroke(change)]))
    }

    pub fn erase_strokes<I>(&mut self, ids: I) -> Vec<CanvasEvent>
    where
        I: IntoIterator<Item = StrokeId>,
    {
        let events = self.store.erase(ids).map(CanvasEvent::Stroke).into_iter().collect();
        self.finish(events)
    }

    /// Replace a stroke by a simplified copy at the same position.
    pub fn simplify_stroke(&mut self, id: StrokeId, tolerance: f64) -> CanvasResult<Vec<CanvasEvent>> {
        let simplified = self
            .store
            .get(id)
            .map(|stroke| stroke.simplified(tolerance))
            .ok_or(CanvasError::StrokeNotFound(id))?;
        self.replace_stroke(id, simplified)
    }

    /// Simplify every stored stroke.
    pub fn simplify_all(&mut self, tolerance: f64) -> Vec<CanvasEvent> {
        let mut events = Vec::new();
        for stroke in self.store.get_all() {
            match self.store.replace(stroke.id(), stroke.simplified(tolerance)) {
                Ok(change) => events.push(CanvasEvent::Stroke(change)),
                Err(e) => log::warn!("Skipping simplification of {}: {}", stroke.id(), e),
            }
        }
        self.finish(events)
    }

    // --- Devices ---

    pub fn set_mouse_enabled(&mut self, enabled: bool) -> Vec<CanvasEvent> {
        let changed = self.devices.set_mouse_enabled(enabled);
        self.device_events(changed)
    }

    pub fn set_touch_enabled(&mut self, enabled: bool) -> Vec<CanvasEvent> {
        let changed = self.devices.set_touch_enabled(enabled);
        self.device_events(changed)
    }

    pub fn handle_proximity(&mut self, signal: PenProximity) -> Vec<CanvasEvent> {
        let changed = self.devices.handle_proximity(signal);
        self.device_events(changed)
    }

    fn device_events(&mut self, changed: bool) -> Vec<CanvasEvent> {
        let mut events = Vec::new();
        if changed {
            let state = self.devices.state();
            log::debug!("Device state changed: {:?}", state);
            events.push(CanvasEvent::DevicesChanged(state));
            self.drop_disallowed_gesture();
        }
        self.finish(events)
    }

    /// A gesture from a device that just lost permission never becomes ink.
    fn drop_disallowed_gesture(&mut self) {
        let Some(device) = self.gesture.as_ref().map(Gesture::device) else {
            return;
        };
        if !self.devices.allows(device) {
            log::debug!("Discarding in-progress {:?} gesture", device);
            self.gesture = None;
        }
    }

    // --- Pointer input ---

    /// Switch between drawing and erasing. Any gesture in progress is dropped.
    pub fn set_mode(&mut self, mode: InkMode) {
        if self.mode != mode {
            self.gesture = None;
            self.mode = mode;
        }
    }

    /// Feed a raw pointer event from the presentation layer.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Vec<CanvasEvent> {
        match event.phase {
            PointerPhase::Down => self.pointer_down(event),
            PointerPhase::Move => self.pointer_move(event),
            PointerPhase::Up => self.pointer_up(event),
            PointerPhase::Cancel => {
                if self.owns_gesture(&event) {
                    log::debug!("{:?} gesture cancelled", event.device);
                    self.gesture = None;
                }
                Vec::new()
            }
        }
    }

    fn owns_gesture(&self, event: &PointerEvent) -> bool {
        self.gesture.as_ref().is_some_and(|g| g.owned_by(event))
    }

    fn ink_point(&self, event: &PointerEvent) -> InkPoint {
        InkPoint::new(
            self.viewport.viewport().screen_to_content(event.position),
            event.pressure.unwrap_or(DEFAULT_PRESSURE),
            event.timestamp_ms,
        )
    }

    fn pointer_down(&mut self, event: PointerEvent) -> Vec<CanvasEvent> {
        if let Some(gesture) = &self.gesture {
            log::debug!(
                "Ignoring {:?} down during {:?} gesture",
                event.device,
                gesture.device()
            );
            return Vec::new();
        }
        if !self.devices.allows(event.device) {
            log::debug!("{:?} input is disabled", event.device);
            return Vec::new();
        }

        let point = self.ink_point(&event);
        match self.mode {
            InkMode::Draw => {
                let mut builder = StrokeBuilder::new(event.device, self.config.ink.default_style);
                builder.push(point);
                self.gesture = Some(Gesture::Drawing {
                    pointer_id: event.pointer_id,
                    builder,
                });
                Vec::new()
            }
            InkMode::Erase => {
                self.gesture = Some(Gesture::Erasing {
                    device: event.device,
                    pointer_id: event.pointer_id,
                });
                self.erase_at(point.position)
            }
        }
    }

    fn pointer_move(&mut self, event: PointerEvent) -> Vec<CanvasEvent> {
        if !self.owns_gesture(&event) {
            return Vec::new();
        }
        let point = self.ink_point(&event);
        if matches!(self.gesture, Some(Gesture::Erasing { .. })) {
            return self.erase_at(point.position);
        }
        if let Some(Gesture::Drawing { builder, .. }) = &mut self.gesture {
            builder.push(point);
        }
        Vec::new()
    }

    fn pointer_up(&mut self, event: PointerEvent) -> Vec<CanvasEvent> {
        if !self.owns_gesture(&event) {
            return Vec::new();
        }
        let point = self.ink_point(&event);
        match self.gesture.take() {
            Some(Gesture::Drawing { mut builder, .. }) => {
                builder.push(point);
                match builder.finish() {
                    Some(stroke) => self.commit_stroke(stroke),
                    None => Vec::new(),
                }
            }
            Some(Gesture::Erasing { .. }) => self.erase_at(point.position),
            None => Vec::new(),
        }
    }

    fn commit_stroke(&mut self, stroke: Stroke) -> Vec<CanvasEvent> {
        let stroke = match self.config.ink.simplify_tolerance {
            Some(tolerance) => stroke.simplified(tolerance),
            None => stroke,
        };
        self.append_stroke(stroke)
    }

    fn erase_at(&mut self, point: Point) -> Vec<CanvasEvent> {
        let hits = self.store.strokes_at_point(point, self.config.ink.erase_tolerance);
        self.erase_strokes(hits)
    }

    // --- Viewport ---

    /// Record the visible surface size used by later fits and zooms.
    pub fn set_view_size(&mut self, width: f64, height: f64) {
        self.viewport.set_view_size(width, height);
    }

    pub fn zoom_in(&mut self) -> Vec<CanvasEvent> {
        let change = self.viewport.zoom_in();
        self.viewport_events(change)
    }

    pub fn zoom_out(&mut self) -> Vec<CanvasEvent> {
        let change = self.viewport.zoom_out();
        self.viewport_events(change)
    }

    pub fn reset_zoom(&mut self) -> Vec<CanvasEvent> {
        let change = self.viewport.reset_zoom();
        self.viewport_events(change)
    }

    pub fn fit_to_screen(&mut self, width: f64, height: f64) -> Vec<CanvasEvent> {
        let change = self.viewport.fit_to_screen(width, height);
        self.viewport_events(change)
    }

    fn viewport_events(&mut self, change: Option<ViewportChange>) -> Vec<CanvasEvent> {
        let events = change.map(CanvasEvent::Viewport).into_iter().collect();
        self.finish(events)
    }

    // --- Background ---

    /// Replace the background with already-decoded content.
    ///
    /// Clears all strokes and fits the new content to the view.
    pub fn load_background(&mut self, image: BackgroundImage) -> CanvasResult<Vec<CanvasEvent>> {
        if let Some(pending) = &self.pending {
            log::warn!("Rejecting background load: {} in progress", pending.kind);
            return Err(CanvasError::Busy(pending.kind));
        }
        Ok(self.apply_background(image))
    }

    /// Start an asynchronous background load.
    pub fn begin_load(&mut self) -> CanvasResult<LoadTicket> {
        self.begin(PendingKind::Load).map(LoadTicket)
    }

    /// Apply the outcome of a load started with [`begin_load`](Self::begin_load).
    ///
    /// On failure nothing but the pending marker changes.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: StorageResult<BackgroundImage>,
    ) -> CanvasResult<Vec<CanvasEvent>> {
        self.settle(PendingKind::Load, ticket.0)?;
        match result {
            Ok(image) => {
                log::info!("Background loaded ({}x{})", image.width(), image.height());
                Ok(self.apply_background(image))
            }
            Err(e) => {
                log::error!("Background load failed: {}", e);
                Err(CanvasError::BackgroundLoad(e))
            }
        }
    }

    /// Start a save, returning the snapshot to persist.
    pub fn begin_save(&mut self) -> CanvasResult<SaveRequest> {
        if let Some(pending) = &self.pending {
            log::warn!("Rejecting save: {} in progress", pending.kind);
            return Err(CanvasError::Busy(pending.kind));
        }
        if !self.can_save() {
            return Err(CanvasError::SaveUnavailable);
        }
        let id = self.begin(PendingKind::Save)?;
        Ok(SaveRequest {
            ticket: SaveTicket(id),
            canvas: FlattenedCanvas {
                background: self.background.clone(),
                strokes: self.store.get_all(),
            },
        })
    }

    /// Record the outcome of a save started with [`begin_save`](Self::begin_save).
    pub fn complete_save(&mut self, ticket: SaveTicket, result: StorageResult<()>) -> CanvasResult<()> {
        self.settle(PendingKind::Save, ticket.0)?;
        match result {
            Ok(()) => {
                log::info!("Canvas saved");
                Ok(())
            }
            Err(e) => {
                log::error!("Save failed: {}", e);
                Err(CanvasError::BackgroundSave(e))
            }
        }
    }

    /// Load a background through `storage`, then apply it.
    pub async fn load_background_from<S>(
        &mut self,
        storage: &S,
        source: &str,
    ) -> CanvasResult<Vec<CanvasEvent>>
    where
        S: ImageStorage + ?Sized,
    {
        let ticket = self.begin_load()?;
        let result = storage.load_image(source).await;
        self.complete_load(ticket, result)
    }

    /// Save the canvas through `storage`.
    pub async fn save_background_to<S>(&mut self, storage: &S, destination: &str) -> CanvasResult<()>
    where
        S: ImageStorage + ?Sized,
    {
        let request = self.begin_save()?;
        let result = storage.save_image(&request.canvas, destination).await;
        self.complete_save(request.ticket, result)
    }

    /// Forget an outstanding load or save whose future was dropped.
    ///
    /// A later completion for it fails with [`CanvasError::StaleTicket`].
    pub fn abandon_pending(&mut self) -> Option<PendingKind> {
        let kind = self.pending.take().map(|p| p.kind);
        if let Some(kind) = kind {
            log::warn!("Abandoned pending {}", kind);
        }
        kind
    }

    fn begin(&mut self, kind: PendingKind) -> CanvasResult<u64> {
        if let Some(pending) = &self.pending {
            log::warn!("Rejecting {}: {} in progress", kind, pending.kind);
            return Err(CanvasError::Busy(pending.kind));
        }
        let id = self.next_ticket;
        self.next_ticket += 1;
        self.pending = Some(Pending { kind, id });
        log::debug!("Started background {} #{}", kind, id);
        Ok(id)
    }

    fn settle(&mut self, kind: PendingKind, id: u64) -> CanvasResult<()> {
        match &self.pending {
            Some(pending) if pending.kind == kind && pending.id == id => {
                self.pending = None;
                Ok(())
            }
            _ => {
                log::warn!("Ignoring stale {} completion #{}", kind, id);
                Err(CanvasError::StaleTicket)
            }
        }
    }

    fn apply_background(&mut self, image: BackgroundImage) -> Vec<CanvasEvent> {
        let mut events = Vec::new();
        self.gesture = None;
        if let Some(change) = self.store.clear() {
            events.push(CanvasEvent::Stroke(change));
        }
        let (width, height) = (image.width(), image.height());
        self.background = Some(image);
        events.push(CanvasEvent::BackgroundLoaded { width, height });
        if let Some(change) = self.viewport.fit_to_size(f64::from(width), f64::from(height)) {
            events.push(CanvasEvent::Viewport(change));
        }
        self.finish(events)
    }

    // --- Session ---

    /// Remove all strokes and the background.
    pub fn clear_all(&mut self) -> Vec<CanvasEvent> {
        let events = self.discard_content();
        self.finish(events)
    }

    /// Drop strokes, background and any gesture, without reporting command state.
    fn discard_content(&mut self) -> Vec<CanvasEvent> {
        let mut events = Vec::new();
        self.gesture = None;
        if let Some(change) = self.store.clear() {
            events.push(CanvasEvent::Stroke(change));
        }
        if self.background.take().is_some() {
            events.push(CanvasEvent::BackgroundCleared);
            if let Some(change) = self.viewport.clear_content() {
                events.push(CanvasEvent::Viewport(change));
            }
        }
        events
    }

    /// Tear the session down when the hosting view goes away.
    ///
    /// Everything returns to the freshly-configured state.
    pub fn deactivate(&mut self) -> Vec<CanvasEvent> {
        let mut events = self.discard_content();
        self.pending = None;
        self.mode = InkMode::default();

        if let Some(change) = self.viewport.reset_zoom() {
            events.push(CanvasEvent::Viewport(change));
        }
        let fresh = PointerDeviceArbiter::new(
            self.config.devices.mouse_enabled,
            self.config.devices.touch_enabled,
        );
        if fresh.state() != self.devices.state() {
            self.devices = fresh;
            events.push(CanvasEvent::DevicesChanged(self.devices.state()));
        }
        log::debug!("Canvas session deactivated");
        self.finish(events)
    }
}

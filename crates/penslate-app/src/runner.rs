//! Plays scripted commands against a canvas session.

use crate::script::Command;
use penslate_core::{CanvasController, CanvasEvent, CanvasResult, ImageStorage, StrokeChange};
use std::fmt;

/// Outcome of a script run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub commands: usize,
    pub events: usize,
    /// Commands the canvas rejected or whose persistence failed.
    pub failures: usize,
    pub strokes: usize,
}

/// Drives a [`CanvasController`] the way a presentation layer would.
///
/// Failures are reported and the run carries on, so one unreadable image
/// does not abort the rest of the session.
pub struct ScriptRunner<S: ImageStorage> {
    controller: CanvasController,
    storage: S,
}

impl<S: ImageStorage> ScriptRunner<S> {
    pub fn new(controller: CanvasController, storage: S) -> Self {
        Self {
            controller,
            storage,
        }
    }

    pub fn controller(&self) -> &CanvasController {
        &self.controller
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Execute every command in order.
    pub async fn run(&mut self, commands: &[Command]) -> RunSummary {
        let mut summary = RunSummary {
            commands: commands.len(),
            ..RunSummary::default()
        };

        for (index, command) in commands.iter().enumerate() {
            match self.execute(command).await {
                Ok(events) => {
                    for event in &events {
                        log_event(event);
                    }
                    summary.events += events.len();
                }
                Err(e) => {
                    log::error!("Command {} ({:?}) failed: {}", index, command, e);
                    summary.failures += 1;
                }
            }
        }

        summary.strokes = self.controller.store().len();
        summary
    }

    /// Execute a single command.
    pub async fn execute(&mut self, command: &Command) -> CanvasResult<Vec<CanvasEvent>> {
        let controller = &mut self.controller;
        let events = match command {
            Command::Pointer(event) => controller.handle_pointer(*event),
            Command::Proximity { signal } => controller.handle_proximity(*signal),
            Command::SetMouse { enabled } => controller.set_mouse_enabled(*enabled),
            Command::SetTouch { enabled } => controller.set_touch_enabled(*enabled),
            Command::Mode { mode } => {
                controller.set_mode(*mode);
                Vec::new()
            }
            Command::ViewSize { width, height } => {
                controller.set_view_size(*width, *height);
                Vec::new()
            }
            Command::ZoomIn => controller.zoom_in(),
            Command::ZoomOut => controller.zoom_out(),
            Command::ResetZoom => controller.reset_zoom(),
            Command::FitToScreen { width, height } => controller.fit_to_screen(*width, *height),
            Command::LoadImage { source } => {
                controller
                    .load_background_from(&self.storage, source)
                    .await?
            }
            Command::SaveImage { destination } => {
                controller
                    .save_background_to(&self.storage, destination)
                    .await?;
                Vec::new()
            }
            Command::ClearAll => controller.clear_all(),
            Command::SimplifyAll { tolerance } => controller.simplify_all(*tolerance),
        };
        Ok(events)
    }
}

fn log_event(event: &CanvasEvent) {
    match event {
        CanvasEvent::Stroke(change) => log::info!("Strokes: {:?}", StrokeSummary(change)),
        CanvasEvent::Viewport(change) => log::info!(
            "Viewport: scale {:.3} offset ({:.1}, {:.1})",
            change.scale,
            change.offset.x,
            change.offset.y
        ),
        CanvasEvent::BackgroundLoaded { width, height } => {
            log::info!("Background loaded: {}x{}", width, height)
        }
        CanvasEvent::BackgroundCleared => log::info!("Background cleared"),
        CanvasEvent::DevicesChanged(state) => log::info!(
            "Devices: mouse={} touch={} pen_detected={}",
            state.effective_mouse_enabled(),
            state.effective_touch_enabled(),
            state.pen_detected()
        ),
        CanvasEvent::CommandStateChanged(state) => log::info!(
            "Commands: can_save={} can_clear={}",
            state.can_save,
            state.can_clear
        ),
    }
}

/// Compact debug form of a stroke change; full point lists are too noisy to log.
struct StrokeSummary<'a>(&'a StrokeChange);

impl fmt::Debug for StrokeSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            StrokeChange::Added(stroke) => write!(f, "added {} ({} points)", stroke.id(), stroke.len()),
            StrokeChange::Replaced { old, new } => write!(f, "replaced {} with {}", old.id(), new.id()),
            StrokeChange::Erased(removed) => write!(f, "erased {}", removed.len()),
            StrokeChange::Cleared => write!(f, "cleared"),
        }
    }
}

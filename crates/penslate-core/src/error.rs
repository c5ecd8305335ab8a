//! Error types for canvas operations.

use crate::controller::PendingKind;
use crate::storage::StorageError;
use crate::stroke::StrokeId;
use thiserror::Error;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
///
/// Every failing call leaves canvas state exactly as it was.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// A replace targeted a stroke that is not in the store.
    #[error("Stroke not found: {0}")]
    StrokeNotFound(StrokeId),

    /// A replacement stroke carries an id that is already stored elsewhere.
    #[error("Stroke already present: {0}")]
    DuplicateStroke(StrokeId),

    /// A background load or save is already in flight.
    #[error("Busy: a background {0} is already in progress")]
    Busy(PendingKind),

    /// The persistence collaborator failed to load the background.
    #[error("Failed to load background: {0}")]
    BackgroundLoad(#[source] StorageError),

    /// The persistence collaborator failed to save the canvas.
    #[error("Failed to save background: {0}")]
    BackgroundSave(#[source] StorageError),

    /// Save was requested while there is nothing meaningful to save.
    #[error("Nothing to save")]
    SaveUnavailable,

    /// A completion arrived for an operation that is no longer outstanding.
    #[error("Completion does not match the pending operation")]
    StaleTicket,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

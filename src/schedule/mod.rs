mod conflicts;
mod editor;
mod gateway;
mod grid;
mod interaction;
mod reference;
mod registry;

pub use conflicts::ConflictOverlay;
pub use editor::{ClickOutcome, EditorOptions, EditorSnapshot, LessonDraft, TimetableEditor};
pub use gateway::{Confirmation, ConflictPolicy, DeleteOutcome, LessonOrigin, MutationGateway};
pub use grid::{Cell, GridIndex, View, ViewKind};
pub use interaction::{EditTarget, Intent, InteractionMachine, InteractionState, Transition};
pub use reference::ReferenceData;
pub use registry::{RegistryEntry, RegistryKind, RegistryRecord};

use std::future::Future;
use std::time::Duration;

use crate::api::StoreResult;
use crate::error::{AppError, AppResult};

/// Await a store call, bounded by `limit`
pub(crate) async fn remote<T>(limit: Duration, call: impl Future<Output = StoreResult<T>>) -> AppResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(AppError::Timeout(limit)),
    }
}

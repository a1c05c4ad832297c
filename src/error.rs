use std::time::Duration;

use crate::api::StoreError;

/// Every way a user-initiated operation can fail. None of these are retried
/// automatically; the user re-submits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    /// A required field was missing; caught before any network call.
    #[error("{0}")]
    Validation(String),

    /// The backend reported a scheduling clash. The text is the backend's own description.
    #[error("{0}")]
    Conflict(String),

    /// Network or store failure, carrying the raw backend message.
    #[error("{0}")]
    Backend(String),

    #[error("the server did not answer within {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("another change is still being saved")]
    Busy,

    #[error("administrator login required")]
    Unauthorized,
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Backend(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

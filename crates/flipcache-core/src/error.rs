use thiserror::Error;

use crate::backend::BackendError;

/// Errors surfaced to callers of the sync layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Project {0} not found")]
    NotFound(i64),

    #[error("Invalid {field} value: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Nothing to update")]
    EmptyUpdate,

    #[error("Mutation coordinator has shut down")]
    CoordinatorClosed,
}

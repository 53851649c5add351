use crate::extensions::LifecycleEvent;
use crate::store::StoreError;
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// An extension hook raised while a transition was in progress.
    #[error("Hook {event} failed: {message}")]
    Hook {
        event: LifecycleEvent,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the core crate.
pub type CoreResult<T> = Result<T, CoreError>;

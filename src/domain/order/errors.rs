use uuid::Uuid;

use super::value_objects::{OrderStatus, Role};

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("cannot transition from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("command not allowed in status {status:?}")]
    InvalidState { status: OrderStatus },

    #[error("{role:?} is not allowed to {action}")]
    Forbidden { role: Role, action: &'static str },

    #[error("actor is not a participant of this order")]
    NotParticipant,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no active contract on this order")]
    NoActiveContract,

    #[error("revenue share already recorded for this order")]
    RevenueShareAlreadyRecorded,

    #[error("order already exists")]
    AlreadyInitialized,

    #[error("aggregate not initialized")]
    NotInitialized,
}

/// Coarse classification used by the API layer to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 404-equivalent.
    NotFound,
    /// 409-equivalent: command is illegal for the current state.
    Conflict,
    /// 403-equivalent.
    Forbidden,
    /// 400-equivalent.
    BadRequest,
    /// Fatal misconfiguration; logged, nothing is written.
    Configuration,
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NotFound { .. } | OrderError::NotInitialized => ErrorKind::NotFound,
            OrderError::InvalidTransition { .. }
            | OrderError::InvalidState { .. }
            | OrderError::NoActiveContract
            | OrderError::RevenueShareAlreadyRecorded
            | OrderError::AlreadyInitialized => ErrorKind::Conflict,
            OrderError::Forbidden { .. } | OrderError::NotParticipant => ErrorKind::Forbidden,
            OrderError::Validation(_) => ErrorKind::BadRequest,
            OrderError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

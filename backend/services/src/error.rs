use sea_orm::DbErr;
use thiserror::Error;

/// Failures surfaced by the service layer. A server without samples is not
/// an error; see [`serverdeck_shared::ServerReport::NoData`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The referenced server does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Caller supplied a value the operation cannot accept.
    #[error("{0}")]
    InvalidInput(String),

    /// The write would break a uniqueness rule (server number).
    #[error("{0}")]
    Conflict(String),

    /// The store could not be read or written. Not retried.
    #[error("store failure: {0}")]
    Store(#[from] DbErr),
}

impl ServiceError {
    pub fn server_not_found(server_id: i32) -> Self {
        ServiceError::NotFound(format!("Server not found: {}", server_id))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

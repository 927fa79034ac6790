use bonus_engine::{accrual::AccrualClientError, SqliteDatabaseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(#[from] SqliteDatabaseError),
    #[error("Could not set up the accrual system client. {0}")]
    AccrualClientError(#[from] AccrualClientError),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
}

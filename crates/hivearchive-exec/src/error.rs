use thiserror::Error;

use crate::jobs::{JobStatus, ServiceError};

pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Validation, lookup, or compilation failure; raised before anything
    /// reaches the remote service.
    #[error(transparent)]
    Graph(#[from] hivearchive_core::error::Error),

    #[error("job {job} finished with status {status}\n{log}")]
    JobFailed {
        job: String,
        status: JobStatus,
        log: String,
    },

    #[error("gave up after {attempts} connection failures: {last_error}")]
    RetriesExhausted { attempts: usize, last_error: String },

    #[error("job service: {0}")]
    Service(String),

    #[error("confirmation prompt: {0}")]
    Confirm(#[from] std::io::Error),

    #[error("hashing error: {0}")]
    Hash(String),
}

impl From<ServiceError> for ExecError {
    fn from(e: ServiceError) -> Self {
        ExecError::Service(e.to_string())
    }
}

//! Contract of the remote batch-query service.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service-side identifier of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(pub String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failure,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure | JobStatus::Cancelled)
    }

    pub fn is_success(self) -> bool {
        self == JobStatus::Success
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failure => "failure",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Transient connectivity failure; callers may retry.
    #[error("connection error: {0}")]
    Connection(String),
    /// The service answered with an error; retrying will not help.
    #[error("remote error: {0}")]
    Remote(String),
}

impl ServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Connection(_))
    }
}

pub trait JobService {
    fn submit(&self, query: &str, label: &str) -> std::result::Result<JobHandle, ServiceError>;
    fn status(&self, job: &JobHandle) -> std::result::Result<JobStatus, ServiceError>;
    fn log(&self, job: &JobHandle) -> std::result::Result<String, ServiceError>;
}

/// Final state of a job run to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: JobHandle,
    pub status: JobStatus,
    /// Connectivity failures absorbed while running this job.
    pub retries: usize,
    /// Poll interval in effect when the job finished.
    pub poll_interval: Duration,
}

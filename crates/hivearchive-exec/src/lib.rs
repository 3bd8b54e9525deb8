#![forbid(unsafe_code)]
//! hivearchive-exec: hands compiled scripts to an execution backend.
//!
//! - `Executor` gates mutating statements behind an operator confirmation and
//!   runs batches strictly in order, stopping at the first failure.
//! - `DummyBackend` logs and returns; `PollingBackend` submits to a
//!   `JobService` and polls with retry/backoff on connectivity errors.
//! - `run_workflow` ties it together: optimize, compile, confirm, execute,
//!   and emit a `RunManifest`.

pub mod backend;
pub mod confirm;
pub mod dummy;
pub mod error;
pub mod jobs;
pub mod options;
pub mod polling;
#[cfg(feature = "qubole")]
pub mod qubole;
pub mod replay;
pub mod runner;

pub use backend::{Backend, Executor, Outcome};
pub use confirm::{is_mutating, AlwaysConfirm, Confirm, StdinPrompt};
pub use dummy::DummyBackend;
pub use error::{ExecError, Result};
pub use jobs::{JobHandle, JobReport, JobService, JobStatus, ServiceError};
pub use options::ExecutionOptions;
pub use polling::{PollingBackend, RetryPolicy, Sleep};
pub use runner::{run_workflow, WorkflowResult};

/// Statements are cut to this many characters in log lines.
pub const LOG_LIMIT: usize = 100;

/// First `LOG_LIMIT` characters of `statement`, on a char boundary.
pub(crate) fn preview(statement: &str) -> &str {
    match statement.char_indices().nth(LOG_LIMIT) {
        Some((idx, _)) => &statement[..idx],
        None => statement,
    }
}

//! Backend with no remote effect: logs each statement and succeeds.

use std::time::Duration;

use crate::backend::Backend;
use crate::error::Result;
use crate::jobs::{JobHandle, JobReport, JobStatus};
use crate::preview;

#[derive(Debug, Default)]
pub struct DummyBackend {
    executed: Vec<String>,
}

impl DummyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements seen so far, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    fn record(&mut self, statement: &str, label: &str) -> JobHandle {
        tracing::info!(label, "running query on dummy backend: '{}...'", preview(statement));
        self.executed.push(statement.to_string());
        JobHandle::new(format!("dummy-{}", self.executed.len()))
    }
}

impl Backend for DummyBackend {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn execute(&mut self, statement: &str, label: &str) -> Result<JobReport> {
        let job = self.record(statement, label);
        Ok(JobReport {
            job,
            status: JobStatus::Success,
            retries: 0,
            poll_interval: Duration::ZERO,
        })
    }

    fn submit(&mut self, statement: &str, label: &str) -> Result<JobHandle> {
        Ok(self.record(statement, label))
    }
}

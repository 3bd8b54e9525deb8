//! Backend over a remote job service: submit, then poll until terminal.
//!
//! Connectivity failures are absorbed up to `max_retries` per job; each one
//! multiplies the poll interval by `backoff_factor`. A failed submission is
//! resubmitted, a failed status check re-polls the job already accepted.
//! A job that ends in anything but success is reported with its log and is
//! never retried.

use std::time::Duration;

use hivearchive_core::config::ArchiveConfig;

use crate::backend::Backend;
use crate::error::{ExecError, Result};
use crate::jobs::{JobHandle, JobReport, JobService, JobStatus, ServiceError};
use crate::preview;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub poll_interval: Duration,
    pub backoff_factor: u32,
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            backoff_factor: 2,
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &ArchiveConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
            backoff_factor: cfg.backoff_factor,
            max_retries: cfg.max_retries,
        }
    }
}

/// Blocking pause between polls; swapped out in tests.
pub trait Sleep {
    fn sleep(&mut self, duration: Duration);
}

impl<F> Sleep for F
where
    F: FnMut(Duration),
{
    fn sleep(&mut self, duration: Duration) {
        self(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// Retry state of one job.
struct Attempt {
    interval: Duration,
    retries: usize,
}

pub struct PollingBackend<S, Z = ThreadSleep> {
    service: S,
    policy: RetryPolicy,
    sleeper: Z,
}

impl<S: JobService> PollingBackend<S, ThreadSleep> {
    pub fn new(service: S, policy: RetryPolicy) -> Self {
        Self::with_sleeper(service, policy, ThreadSleep)
    }
}

impl<S: JobService, Z: Sleep> PollingBackend<S, Z> {
    pub fn with_sleeper(service: S, policy: RetryPolicy, sleeper: Z) -> Self {
        Self {
            service,
            policy,
            sleeper,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Spend one retry on a transient `error`, or give up.
    fn absorb(&self, attempt: &mut Attempt, error: ServiceError) -> Result<()> {
        if !error.is_transient() {
            return Err(error.into());
        }
        if attempt.retries >= self.policy.max_retries {
            tracing::error!(retries = attempt.retries, %error, "polling retries exhausted");
            return Err(ExecError::RetriesExhausted {
                attempts: attempt.retries + 1,
                last_error: error.to_string(),
            });
        }
        attempt.retries += 1;
        attempt.interval = attempt.interval.saturating_mul(self.policy.backoff_factor);
        tracing::warn!(
            %error,
            poll_interval_ms = attempt.interval.as_millis() as u64,
            remaining = self.policy.max_retries - attempt.retries,
            "connection failure, retrying with longer poll interval"
        );
        Ok(())
    }

    fn submit_with_retries(&mut self, statement: &str, label: &str, attempt: &mut Attempt) -> Result<JobHandle> {
        loop {
            match self.service.submit(statement, label) {
                Ok(job) => return Ok(job),
                Err(e) => {
                    self.absorb(attempt, e)?;
                    self.sleeper.sleep(attempt.interval);
                }
            }
        }
    }

    fn fail(&self, job: JobHandle, status: JobStatus) -> ExecError {
        let log = match self.service.log(&job) {
            Ok(log) => log,
            Err(e) => format!("<log unavailable: {e}>"),
        };
        tracing::error!(job = %job, %status, "{log}");
        ExecError::JobFailed {
            job: job.0,
            status,
            log,
        }
    }
}

impl<S: JobService, Z: Sleep> Backend for PollingBackend<S, Z> {
    fn name(&self) -> &'static str {
        "polling"
    }

    fn execute(&mut self, statement: &str, label: &str) -> Result<JobReport> {
        tracing::info!(label, "running query: '{}...'", preview(statement));
        let mut attempt = Attempt {
            interval: self.policy.poll_interval,
            retries: 0,
        };
        let job = self.submit_with_retries(statement, label, &mut attempt)?;

        let status = loop {
            self.sleeper.sleep(attempt.interval);
            match self.service.status(&job) {
                Ok(status) if status.is_terminal() => break status,
                Ok(status) => tracing::trace!(job = %job, %status, "polled job"),
                Err(e) => self.absorb(&mut attempt, e)?,
            }
        };

        tracing::info!(job = %job, %status, "ran job");
        if !status.is_success() {
            return Err(self.fail(job, status));
        }
        Ok(JobReport {
            job,
            status,
            retries: attempt.retries,
            poll_interval: attempt.interval,
        })
    }

    fn submit(&mut self, statement: &str, label: &str) -> Result<JobHandle> {
        tracing::info!(label, "submitting query: '{}...'", preview(statement));
        let mut attempt = Attempt {
            interval: self.policy.poll_interval,
            retries: 0,
        };
        let job = self.submit_with_retries(statement, label, &mut attempt)?;
        tracing::info!(job = %job, "started job");
        Ok(job)
    }
}

//! Backend contract and the executor that gates and sequences it.

use crate::confirm::{self, Confirm};
use crate::error::Result;
use crate::jobs::{JobHandle, JobReport};
use crate::options::ExecutionOptions;

/// Something that can run a single statement on a cluster.
pub trait Backend {
    fn name(&self) -> &'static str;

    /// Run `statement` and block until it reaches a terminal state.
    fn execute(&mut self, statement: &str, label: &str) -> Result<JobReport>;

    /// Submit `statement` and return without waiting.
    fn submit(&mut self, statement: &str, label: &str) -> Result<JobHandle>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execute(&mut self, statement: &str, label: &str) -> Result<JobReport> {
        (**self).execute(statement, label)
    }

    fn submit(&mut self, statement: &str, label: &str) -> Result<JobHandle> {
        (**self).submit(statement, label)
    }
}

/// Result of a gated call. `Aborted` means the operator declined and
/// nothing was submitted; it is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Aborted,
}

impl<T> Outcome<T> {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Outcome::Aborted)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(v) => Some(v),
            Outcome::Aborted => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Completed(v) => Outcome::Completed(f(v)),
            Outcome::Aborted => Outcome::Aborted,
        }
    }
}

pub struct Executor<B, C> {
    backend: B,
    confirm: C,
    options: ExecutionOptions,
}

impl<B: Backend, C: Confirm> Executor<B, C> {
    pub fn new(backend: B, confirm: C, options: ExecutionOptions) -> Self {
        Self {
            backend,
            confirm,
            options,
        }
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// One confirmation for the whole batch, asked only when warnings are on
    /// and some statement would modify the warehouse.
    fn approve<S: AsRef<str>>(&mut self, statements: &[S]) -> Result<bool> {
        if !self.options.warn {
            return Ok(true);
        }
        let mutating = statements.iter().any(|s| confirm::is_mutating(s.as_ref()));
        if !mutating {
            return Ok(true);
        }
        let approved = self.confirm.confirm(confirm::PROMPT)?;
        if !approved {
            tracing::warn!(statements = statements.len(), "aborting: operator declined");
        }
        Ok(approved)
    }

    pub fn run_sync(&mut self, statement: &str) -> Result<Outcome<JobReport>> {
        if !self.approve(&[statement])? {
            return Ok(Outcome::Aborted);
        }
        let report = self.backend.execute(statement, &self.options.label)?;
        Ok(Outcome::Completed(report))
    }

    pub fn run_async(&mut self, statement: &str) -> Result<Outcome<JobHandle>> {
        if !self.approve(&[statement])? {
            return Ok(Outcome::Aborted);
        }
        let handle = self.backend.submit(statement, &self.options.label)?;
        Ok(Outcome::Completed(handle))
    }

    /// Run every statement in order, each to completion before the next.
    /// The first failure ends the batch; earlier jobs are not undone.
    pub fn run_all_sync<S: AsRef<str>>(&mut self, statements: &[S]) -> Result<Outcome<Vec<JobReport>>> {
        if !self.approve(statements)? {
            return Ok(Outcome::Aborted);
        }
        tracing::info!(
            backend = self.backend.name(),
            statements = statements.len(),
            "running statements"
        );
        let mut reports = Vec::with_capacity(statements.len());
        for statement in statements {
            reports.push(self.backend.execute(statement.as_ref(), &self.options.label)?);
        }
        Ok(Outcome::Completed(reports))
    }

    /// Submit every statement in order without waiting on any of them.
    pub fn run_all_async<S: AsRef<str>>(&mut self, statements: &[S]) -> Result<Outcome<Vec<JobHandle>>> {
        if !self.approve(statements)? {
            return Ok(Outcome::Aborted);
        }
        tracing::info!(
            backend = self.backend.name(),
            statements = statements.len(),
            "submitting statements"
        );
        let mut handles = Vec::with_capacity(statements.len());
        for statement in statements {
            handles.push(self.backend.submit(statement.as_ref(), &self.options.label)?);
        }
        Ok(Outcome::Completed(handles))
    }
}

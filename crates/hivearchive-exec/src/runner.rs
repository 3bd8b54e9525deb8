//! Workflow orchestration: optimize → compile → confirm → execute.
//!
//! Every graph error surfaces before the backend sees a single statement.

use std::time::{SystemTime, UNIX_EPOCH};

use hivearchive_core::manifest::RunManifest;
use hivearchive_planner::{Registry, Script, Workflow};

use crate::backend::{Backend, Executor, Outcome};
use crate::confirm::Confirm;
use crate::error::Result;
use crate::jobs::{JobHandle, JobReport};
use crate::replay::{hash_script, hash_script_serde};

#[derive(Debug)]
pub enum WorkflowResult {
    /// `dry` was set; nothing ran.
    Dry(Script),
    /// Every statement finished successfully.
    Completed {
        reports: Vec<JobReport>,
        manifest: RunManifest,
    },
    /// `detach` was set; jobs were submitted and left running.
    Submitted(Vec<JobHandle>),
    /// The operator declined; nothing ran.
    Aborted,
}

impl WorkflowResult {
    pub fn is_aborted(&self) -> bool {
        matches!(self, WorkflowResult::Aborted)
    }
}

/// Run `workflow` over `target` (or the whole archive) through `executor`.
///
/// The archive is re-optimized in the workflow's own mode first, so a
/// `develop` followed by a `build` resolves ambiguous relations afresh.
pub fn run_workflow<B, C>(
    registry: &mut Registry,
    workflow: Workflow,
    target: Option<&str>,
    executor: &mut Executor<B, C>,
) -> Result<WorkflowResult>
where
    B: Backend,
    C: Confirm,
{
    if let Some(name) = target {
        registry.id(name)?;
    }
    registry.optimize(workflow.optimize_mode());
    let script = registry.compile(workflow, target)?;

    if executor.options().dry {
        return Ok(WorkflowResult::Dry(script));
    }

    let statements = script.statements();
    if executor.options().detach {
        return Ok(match executor.run_all_async(&statements)? {
            Outcome::Completed(handles) => WorkflowResult::Submitted(handles),
            Outcome::Aborted => WorkflowResult::Aborted,
        });
    }

    let plan_hash = hash_script_serde(&script)?;
    let started_ms = now_ms();
    let outcome = match statements.as_slice() {
        [single] => executor.run_sync(single)?.map(|r| vec![r]),
        _ => executor.run_all_sync(&statements)?,
    };
    let reports = match outcome {
        Outcome::Completed(reports) => reports,
        Outcome::Aborted => return Ok(WorkflowResult::Aborted),
    };

    let manifest = RunManifest::new(
        workflow.name(),
        script.target.clone(),
        hash_script(&script),
        plan_hash,
        statements.len(),
        executor.options().label.clone(),
        started_ms,
    )
    .finish(now_ms());
    tracing::info!(
        workflow = %workflow,
        statements = manifest.statements,
        script_hash = %manifest.script_hash,
        "workflow finished"
    );

    Ok(WorkflowResult::Completed { reports, manifest })
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

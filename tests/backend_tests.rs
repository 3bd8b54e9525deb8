//! Workflows run through the polling backend against an in-memory job
//! service: confirmation gating, retry with backoff, and job failures.

mod fixtures;

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use hivearchive_exec::{
    run_workflow, AlwaysConfirm, Backend, ExecError, ExecutionOptions, Executor, JobHandle, JobService,
    JobStatus, PollingBackend, RetryPolicy, ServiceError, WorkflowResult,
};
use hivearchive_planner::Workflow;

type Reply<T> = Result<T, ServiceError>;

/// In-memory cluster. Status replies are scripted up front; once the script
/// runs out, jobs succeed unless their query mentions `poison`.
#[derive(Default)]
struct Cluster {
    statuses: RefCell<VecDeque<Reply<JobStatus>>>,
    queries: RefCell<HashMap<String, String>>,
    submitted: RefCell<Vec<(String, String)>>,
    poison: Option<String>,
}

impl Cluster {
    fn with_statuses(replies: Vec<Reply<JobStatus>>) -> Self {
        Self {
            statuses: RefCell::new(replies.into()),
            ..Self::default()
        }
    }

    fn poisoned(needle: &str) -> Self {
        Self {
            poison: Some(needle.to_string()),
            ..Self::default()
        }
    }

    fn submitted_queries(&self) -> Vec<String> {
        self.submitted.borrow().iter().map(|(q, _)| q.clone()).collect()
    }
}

impl JobService for Cluster {
    fn submit(&self, query: &str, label: &str) -> Reply<JobHandle> {
        let mut submitted = self.submitted.borrow_mut();
        submitted.push((query.to_string(), label.to_string()));
        let job = JobHandle::new(format!("job-{}", submitted.len()));
        self.queries
            .borrow_mut()
            .insert(job.id().to_string(), query.to_string());
        Ok(job)
    }

    fn status(&self, job: &JobHandle) -> Reply<JobStatus> {
        if let Some(reply) = self.statuses.borrow_mut().pop_front() {
            return reply;
        }
        let queries = self.queries.borrow();
        let poisoned = match (&self.poison, queries.get(job.id())) {
            (Some(needle), Some(query)) => query.contains(needle.as_str()),
            _ => false,
        };
        Ok(if poisoned {
            JobStatus::Failure
        } else {
            JobStatus::Success
        })
    }

    fn log(&self, job: &JobHandle) -> Reply<String> {
        Ok(format!("FAILED: SemanticException [Error 10001]: {job}: Table not found"))
    }
}

fn conn() -> ServiceError {
    ServiceError::Connection("connection reset by peer".into())
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        poll_interval: Duration::from_millis(5),
        backoff_factor: 2,
        max_retries: 3,
    }
}

#[test]
fn interval_grows_by_backoff_factor_per_connectivity_error() {
    for failures in 0..3usize {
        let mut replies: Vec<Reply<JobStatus>> = (0..failures).map(|_| Err(conn())).collect();
        replies.push(Ok(JobStatus::Success));

        let mut backend =
            PollingBackend::with_sleeper(Cluster::with_statuses(replies), policy(), |_: Duration| {});
        let report = backend.execute("SELECT 1", "default").unwrap();

        assert_eq!(report.status, JobStatus::Success);
        assert_eq!(report.retries, failures);
        assert_eq!(
            report.poll_interval,
            Duration::from_millis(5) * 2u32.pow(failures as u32)
        );
    }
}

#[test]
fn retry_budget_exhaustion_surfaces_distinct_error() {
    let replies: Vec<Reply<JobStatus>> = (0..4).map(|_| Err(conn())).collect();
    let mut slept: Vec<Duration> = Vec::new();
    let mut backend =
        PollingBackend::with_sleeper(Cluster::with_statuses(replies), policy(), |d: Duration| slept.push(d));

    let err = backend.execute("SELECT 1", "default").unwrap_err();
    match err {
        ExecError::RetriesExhausted { attempts, last_error } => {
            assert_eq!(attempts, 4);
            assert!(last_error.contains("connection reset"));
        }
        other => panic!("unexpected error: {other}"),
    }
    drop(backend);
    assert_eq!(
        slept,
        vec![
            Duration::from_millis(5),
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(40),
        ]
    );
}

#[test]
fn declined_confirmation_submits_nothing() {
    let mut reg = fixtures::warehouse();
    let backend = PollingBackend::with_sleeper(Cluster::default(), policy(), |_: Duration| {});
    let mut asked = Vec::new();
    let mut executor = Executor::new(
        backend,
        |prompt: &str| {
            asked.push(prompt.to_string());
            false
        },
        ExecutionOptions::default(),
    );

    let result = run_workflow(&mut reg, Workflow::Build, None, &mut executor).unwrap();
    assert!(result.is_aborted());
    assert!(executor.backend().service().submitted.borrow().is_empty());
    drop(executor);
    assert_eq!(asked.len(), 1);
}

#[test]
fn warnings_off_skips_confirmation() {
    let mut reg = fixtures::warehouse();
    let backend = PollingBackend::with_sleeper(Cluster::default(), policy(), |_: Duration| {});
    let options = ExecutionOptions::default().no_warn().with_label("etl");
    let mut executor = Executor::new(backend, |_: &str| -> bool { panic!("should not prompt") }, options);

    let result = run_workflow(&mut reg, Workflow::DropAll, None, &mut executor).unwrap();
    assert!(matches!(result, WorkflowResult::Completed { ref reports, .. } if reports.len() == 4));

    let submitted = executor.backend().service().submitted.borrow().clone();
    assert!(submitted.iter().all(|(_, label)| label == "etl"));
    assert_eq!(submitted[0].0, "DROP DATABASE IF EXISTS atomic CASCADE;");
}

#[test]
fn failed_job_stops_the_batch_with_its_log() {
    let mut reg = fixtures::warehouse();
    let backend = PollingBackend::with_sleeper(
        Cluster::poisoned("CREATE VIEW IF NOT EXISTS events.impressions"),
        policy(),
        |_: Duration| {},
    );
    let mut executor = Executor::new(backend, AlwaysConfirm, ExecutionOptions::default());

    let err = run_workflow(&mut reg, Workflow::Build, None, &mut executor).unwrap_err();
    match err {
        ExecError::JobFailed { job, status, log } => {
            assert_eq!(job, "job-4");
            assert_eq!(status, JobStatus::Failure);
            assert!(log.contains("SemanticException"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing after the failed block was submitted, and nothing was retried.
    let queries = executor.backend().service().submitted_queries();
    assert_eq!(queries.len(), 4);
    assert!(queries[3].contains("events.impressions"));
}

#[test]
fn detached_build_submits_in_order() {
    let mut reg = fixtures::warehouse();
    let backend = PollingBackend::with_sleeper(Cluster::default(), policy(), |_: Duration| {
        panic!("detached runs never poll")
    });
    let options = ExecutionOptions::default().detached();
    let mut executor = Executor::new(backend, AlwaysConfirm, options);

    let result = run_workflow(&mut reg, Workflow::Build, None, &mut executor).unwrap();
    let handles = match result {
        WorkflowResult::Submitted(handles) => handles,
        other => panic!("unexpected result: {other:?}"),
    };
    assert_eq!(handles.len(), 7);
    assert_eq!(handles[0], JobHandle::new("job-1"));

    let queries = executor.backend().service().submitted_queries();
    assert!(queries[0].contains("atomic.events"));
    assert!(queries[6].contains("dynamo.dynamo_result_stats"));
}

#[test]
fn boxed_backends_drive_workflows() {
    let mut reg = fixtures::funnel(3);
    let backend: Box<dyn Backend> = Box::new(PollingBackend::with_sleeper(
        Cluster::default(),
        policy(),
        |_: Duration| {},
    ));
    let mut executor = Executor::new(backend, AlwaysConfirm, ExecutionOptions::default());

    let result = run_workflow(&mut reg, Workflow::Develop, Some("impressions"), &mut executor).unwrap();
    match result {
        WorkflowResult::Completed { reports, manifest } => {
            assert_eq!(reports.len(), 4);
            assert!(reports.iter().all(|r| r.status.is_success() && r.retries == 0));
            assert_eq!(manifest.workflow, "develop");
            assert_eq!(manifest.statements, 4);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

//! Blocking HTTP client for the Qubole command API.
//!
//! - `POST {api_url}/commands` with `{ "query", "label", "command_type": "HiveCommand" }`
//! - `GET {api_url}/commands/{id}` for status
//! - `GET {api_url}/commands/{id}/logs` for the job log
//!
//! Requests authenticate with the `X-AUTH-TOKEN` header.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use hivearchive_core::config::ArchiveConfig;

use crate::error::{ExecError, Result};
use crate::jobs::{JobHandle, JobService, JobStatus, ServiceError};

#[derive(Debug, Clone)]
pub struct QuboleService {
    api_url: String,
    token: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct CreateCommand<'a> {
    query: &'a str,
    label: &'a str,
    command_type: &'static str,
}

#[derive(Deserialize)]
struct CommandState {
    id: serde_json::Value,
    status: String,
}

impl QuboleService {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        if timeout_secs == 0 {
            return Err(ExecError::Service("http timeout must be > 0 seconds".to_string()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExecError::Service(format!("http client build failed: {e}")))?;
        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        })
    }

    pub fn from_config(cfg: &ArchiveConfig) -> Result<Self> {
        let token = cfg.api_token.clone().ok_or_else(|| {
            ExecError::Service("HIVEARCHIVE_TOKEN is required for the qubole backend".to_string())
        })?;
        Self::new(cfg.api_url.clone(), token, cfg.http_timeout_secs)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    fn send(&self, req: reqwest::blocking::RequestBuilder) -> std::result::Result<reqwest::blocking::Response, ServiceError> {
        let resp = req
            .header("X-AUTH-TOKEN", &self.token)
            .header("Accept", "application/json")
            .send()
            .map_err(transport_error)?;
        if resp.status().is_server_error() {
            return Err(ServiceError::Connection(format!("status {}", resp.status())));
        }
        if !resp.status().is_success() {
            return Err(ServiceError::Remote(format!("status {}", resp.status())));
        }
        Ok(resp)
    }

    fn state(&self, resp: reqwest::blocking::Response) -> std::result::Result<CommandState, ServiceError> {
        resp.json()
            .map_err(|e| ServiceError::Remote(format!("invalid command response JSON: {e}")))
    }
}

fn transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_connect() || e.is_timeout() {
        ServiceError::Connection(e.to_string())
    } else {
        ServiceError::Remote(e.to_string())
    }
}

fn parse_status(raw: &str) -> std::result::Result<JobStatus, ServiceError> {
    match raw {
        "waiting" => Ok(JobStatus::Pending),
        "running" | "cancelling" => Ok(JobStatus::Running),
        "done" => Ok(JobStatus::Success),
        "error" => Ok(JobStatus::Failure),
        "cancelled" => Ok(JobStatus::Cancelled),
        other => Err(ServiceError::Remote(format!("unknown command status '{other}'"))),
    }
}

fn command_id(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl JobService for QuboleService {
    fn submit(&self, query: &str, label: &str) -> std::result::Result<JobHandle, ServiceError> {
        let body = CreateCommand {
            query,
            label,
            command_type: "HiveCommand",
        };
        let resp = self.send(self.client.post(self.url("commands")).json(&body))?;
        let state = self.state(resp)?;
        let job = JobHandle::new(command_id(&state.id));
        tracing::info!(job = %job, status = %state.status, "started job");
        Ok(job)
    }

    fn status(&self, job: &JobHandle) -> std::result::Result<JobStatus, ServiceError> {
        let resp = self.send(self.client.get(self.url(&format!("commands/{job}"))))?;
        let state = self.state(resp)?;
        parse_status(&state.status)
    }

    fn log(&self, job: &JobHandle) -> std::result::Result<String, ServiceError> {
        let resp = self.send(self.client.get(self.url(&format!("commands/{job}/logs"))))?;
        resp.text().map_err(transport_error)
    }
}

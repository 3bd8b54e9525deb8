//! Archive configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::node::DEFAULT_TABLE_THRESHOLD;

/// Which execution backend receives compiled statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Logs statements and returns immediately.
    Dummy,
    /// Remote job service over HTTP.
    Qubole,
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dummy" | "hive" => Ok(BackendKind::Dummy),
            "qubole" | "prod" => Ok(BackendKind::Qubole),
            other => Err(Error::Config(format!("unknown backend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Credential for the remote job service.
    pub api_token: Option<String>,

    /// Base URL of the remote job service.
    pub api_url: String,

    /// Cluster label that selects the compute pool running submitted jobs.
    pub label: String,

    pub backend: BackendKind,

    /// Default promotion threshold for `ViewUntilTable` nodes that do not set one.
    pub table_threshold: u32,

    /// Initial interval between job status polls.
    pub poll_interval_ms: u64,

    /// Connectivity failures tolerated per job before giving up.
    pub max_retries: usize,

    /// Poll interval multiplier applied after each connectivity failure.
    pub backoff_factor: u32,

    pub http_timeout_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_url: "https://api.qubole.com/api/v1.2".to_string(),
            label: "default".to_string(),
            backend: BackendKind::Dummy,
            table_threshold: DEFAULT_TABLE_THRESHOLD,
            poll_interval_ms: 5_000,
            max_retries: 3,
            backoff_factor: 2,
            http_timeout_secs: 30,
        }
    }
}

impl ArchiveConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `HIVEARCHIVE_TOKEN`: job service credential
    /// - `HIVEARCHIVE_API_URL`: job service base URL
    /// - `HIVEARCHIVE_LABEL`: cluster label
    /// - `HIVEARCHIVE_BACKEND`: `dummy` or `qubole`
    /// - `HIVEARCHIVE_TABLE_THRESHOLD`: default promotion threshold
    /// - `HIVEARCHIVE_POLL_INTERVAL_MS`: initial poll interval
    /// - `HIVEARCHIVE_MAX_RETRIES`: connectivity retry budget
    /// - `HIVEARCHIVE_BACKOFF_FACTOR`: poll interval multiplier
    /// - `HIVEARCHIVE_HTTP_TIMEOUT_SECS`: HTTP client timeout
    ///
    /// Unparseable numeric values are ignored; an unknown backend is an error.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("HIVEARCHIVE_TOKEN") {
            if !s.is_empty() {
                cfg.api_token = Some(s);
            }
        }

        if let Ok(s) = std::env::var("HIVEARCHIVE_API_URL") {
            cfg.api_url = s;
        }

        if let Ok(s) = std::env::var("HIVEARCHIVE_LABEL") {
            cfg.label = s;
        }

        if let Ok(s) = std::env::var("HIVEARCHIVE_BACKEND") {
            cfg.backend = s.parse()?;
        }

        if let Ok(s) = std::env::var("HIVEARCHIVE_TABLE_THRESHOLD") {
            if let Ok(v) = s.parse::<u32>() {
                cfg.table_threshold = v;
            }
        }

        if let Ok(s) = std::env::var("HIVEARCHIVE_POLL_INTERVAL_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.poll_interval_ms = v;
            }
        }

        if let Ok(s) = std::env::var("HIVEARCHIVE_MAX_RETRIES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_retries = v;
            }
        }

        if let Ok(s) = std::env::var("HIVEARCHIVE_BACKOFF_FACTOR") {
            if let Ok(v) = s.parse::<u32>() {
                cfg.backoff_factor = v;
            }
        }

        if let Ok(s) = std::env::var("HIVEARCHIVE_HTTP_TIMEOUT_SECS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.http_timeout_secs = v;
            }
        }

        Ok(cfg)
    }

    /// Reject values that would make polling or promotion meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.backoff_factor == 0 {
            return Err(Error::Config("backoff factor must be > 0".into()));
        }
        if self.table_threshold == 0 {
            return Err(Error::Config("table threshold must be > 0".into()));
        }
        if self.label.trim().is_empty() {
            return Err(Error::Config("cluster label must not be empty".into()));
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

/// Per-invocation execution switches, passed explicitly into every workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Ask before running statements that modify the warehouse.
    pub warn: bool,
    /// Compile and return the script without executing it.
    pub dry: bool,
    /// Cluster label jobs are submitted to.
    pub label: String,
    /// Submit without waiting for jobs to finish.
    pub detach: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            warn: true,
            dry: false,
            label: "default".to_string(),
            detach: false,
        }
    }
}

impl ExecutionOptions {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn no_warn(mut self) -> Self {
        self.warn = false;
        self
    }

    pub fn dry(mut self) -> Self {
        self.dry = true;
        self
    }

    pub fn detached(mut self) -> Self {
        self.detach = true;
        self
    }
}

use thiserror::Error;

/// Canonical result for core and planner.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("nodes must have unique names; archive already contains '{0}'")]
    DuplicateName(String),

    #[error("node '{node}' depends on '{input}', which is not in the archive; did you forget to add it?")]
    UnregisteredInput { node: String, input: String },

    #[error("unrecognized node '{0}'")]
    NotFound(String),

    #[error("materialization of '{0}' must be resolved by optimize() before compiling")]
    Unresolved(String),

    #[error("insert target '{target}' of '{node}' is not a table")]
    InvalidTarget { node: String, target: String },

    #[error("template '{template}': {reason}")]
    Template { template: String, reason: String },

    #[error("{verb} is not valid for {scope}")]
    Unsupported { verb: String, scope: String },

    #[error("archive has not been optimized in this workflow")]
    NotOptimized,

    #[error("invalid archive definition: {0}")]
    Definition(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Definition(e.to_string())
    }
}

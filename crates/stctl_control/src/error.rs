use stctl_transfer::ClientError;
use thiserror::Error;

use crate::duration::DurationError;

#[derive(Debug, Error)]
pub enum StctlError {
    #[error("failed to list transfer jobs: {0}")]
    List(#[source] ClientError),
    #[error("failed to list operations for {name}: {source}")]
    ListOperations {
        name: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to create transfer job {description:?}: {source}")]
    Create {
        description: String,
        #[source]
        source: ClientError,
    },
    #[error("transfer job {name} not found: {source}")]
    JobNotFound {
        name: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to disable transfer job {name}: {source}")]
    Update {
        name: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to decode metadata of operation {name}: {source}")]
    Metadata {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid {field}: {source}")]
    Duration {
        field: &'static str,
        #[source]
        source: DurationError,
    },
}

impl StctlError {
    /// True when the job named in a disable does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::JobNotFound { source, .. } if source.is_not_found())
    }
}

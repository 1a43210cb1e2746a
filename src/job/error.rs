use thiserror::Error;

use super::request::ValidationError;
use crate::archive::ArchiveError;
use crate::workspace::WorkspaceError;

/// Failures of the machinery around retrieval; fatal to the job
#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("archive construction failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("job cancelled before all items were attempted")]
    Cancelled,

    #[error("job exceeded its {0}s time limit")]
    TimedOut(u64),

    #[error("job task failed: {0}")]
    Task(String),
}

/// Anything that aborts a whole job.
///
/// Per-URL retrieval failures are not represented here; they end up in the
/// report.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl From<WorkspaceError> for JobError {
    fn from(value: WorkspaceError) -> Self {
        JobError::Infrastructure(value.into())
    }
}

impl From<ArchiveError> for JobError {
    fn from(value: ArchiveError) -> Self {
        JobError::Infrastructure(value.into())
    }
}

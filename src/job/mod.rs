//! Batch job orchestration
//!
//! A job takes an ordered list of URLs, validates it into a
//! [`DownloadRequest`], allocates a [`Workspace`](crate::workspace::Workspace),
//! retrieves every URL in isolation and aggregates the outcomes into a
//! [`JobReport`].
//!
//! ## Flow
//!
//! 1. [`DownloadRequest::parse`] checks count and shape; nothing is touched
//!    on disk when it fails
//! 2. [`JobOrchestrator`] allocates a workspace and runs each URL through
//!    the [`Retriever`](crate::retrieval::Retriever)
//! 3. One [`OutcomeRecord`] per URL is collected in request order
//! 4. [`JobReport::from_outcomes`] derives counts and item lists

mod error;
mod orchestrator;
mod report;
mod request;

pub use error::{InfrastructureError, JobError};
pub use orchestrator::{CompletedJob, ITEMS_DIR, JobOrchestrator};
pub use report::{FailedItem, JobReport, JobSummary, Outcome, OutcomeRecord, OutcomeStatus, SucceededItem};
pub use request::{DownloadRequest, UrlPolicy, ValidationError};

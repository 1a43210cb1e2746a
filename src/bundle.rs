//! End-to-end job: validate, retrieve, archive

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::archive::{Archive, ArchiveBuilder, ZipBuilder};
use crate::config::Config;
use crate::job::{CompletedJob, InfrastructureError, JobError, JobOrchestrator, JobReport};
use crate::retrieval::Retriever;
use crate::workspace::Workspace;

/// Archive ready to be delivered.
///
/// Owns the workspace the archive lives in; dropping the bundle or
/// calling [`Bundle::release`] removes both.
#[derive(Debug)]
pub struct Bundle {
    pub job_id: String,
    pub report: JobReport,
    pub archive: Archive,
    pub workspace: Workspace,
}

impl Bundle {
    pub async fn release(mut self) {
        self.workspace.release().await;
    }
}

#[derive(Clone)]
pub struct Bundler {
    orchestrator: JobOrchestrator,
    archiver: Arc<dyn ArchiveBuilder>,
}

impl Bundler {
    pub fn new(orchestrator: JobOrchestrator, archiver: Arc<dyn ArchiveBuilder>) -> Self {
        Self {
            orchestrator,
            archiver,
        }
    }

    /// Bundler writing ZIP archives
    pub fn from_config(config: &Config, retriever: Arc<dyn Retriever>) -> Self {
        Self::new(
            JobOrchestrator::from_config(config, retriever),
            Arc::new(ZipBuilder::new()),
        )
    }

    /// Run a job and archive its results.
    ///
    /// On any error the workspace is gone before this returns.
    pub async fn bundle<S: AsRef<str>>(
        &self,
        urls: &[S],
        cancel: &CancellationToken,
    ) -> Result<Bundle, JobError> {
        let CompletedJob {
            job_id,
            report,
            outcomes,
            mut workspace,
        } = self.orchestrator.run(urls, cancel).await?;

        if cancel.is_cancelled() {
            workspace.release().await;
            return Err(InfrastructureError::Cancelled.into());
        }

        match self.archiver.build(&workspace, &report, &outcomes).await {
            Ok(archive) => Ok(Bundle {
                job_id,
                report,
                archive,
                workspace,
            }),
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Archive creation failed");
                workspace.release().await;
                Err(InfrastructureError::Archive(e).into())
            }
        }
    }
}

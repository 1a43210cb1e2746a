use futures::{FutureExt, StreamExt, future, stream};
use std::panic::AssertUnwindSafe;
use std::path::{Component, Path};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{InfrastructureError, JobError};
use super::report::{JobReport, OutcomeRecord};
use super::request::{DownloadRequest, UrlPolicy};
use crate::config::{Config, MAX_CONCURRENCY};
use crate::retrieval::{FailureReason, RetrievalError, Retriever};
use crate::workspace::{Workspace, WorkspaceManager};

/// Workspace subdirectory holding one directory per requested URL
pub const ITEMS_DIR: &str = "items";

/// Result of a job whose items were all attempted
#[derive(Debug)]
pub struct CompletedJob {
    pub job_id: String,
    pub report: JobReport,
    /// One record per requested URL, in request order
    pub outcomes: Vec<OutcomeRecord>,
    pub workspace: Workspace,
}

/// Drives every URL of a job through the retriever.
///
/// Holds no per-job state; one instance serves all concurrent requests.
#[derive(Clone)]
pub struct JobOrchestrator {
    retriever: Arc<dyn Retriever>,
    workspaces: WorkspaceManager,
    policy: UrlPolicy,
    concurrency: usize,
}

impl JobOrchestrator {
    /// Sequential orchestrator; see [`JobOrchestrator::with_concurrency`]
    pub fn new(retriever: Arc<dyn Retriever>, workspaces: WorkspaceManager, policy: UrlPolicy) -> Self {
        Self {
            retriever,
            workspaces,
            policy,
            concurrency: 1,
        }
    }

    pub fn from_config(config: &Config, retriever: Arc<dyn Retriever>) -> Self {
        let workspaces = match &config.jobs.scratch_root {
            Some(root) => WorkspaceManager::new(root, &config.jobs.workspace_prefix),
            None => WorkspaceManager::in_temp_dir(&config.jobs.workspace_prefix),
        };

        Self::new(retriever, workspaces, UrlPolicy::from_config(config))
            .with_concurrency(config.jobs.concurrency)
    }

    /// Number of items retrieved at once, clamped to `1..=4`
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Validate `urls` and run the job
    pub async fn run<S: AsRef<str>>(
        &self,
        urls: &[S],
        cancel: &CancellationToken,
    ) -> Result<CompletedJob, JobError> {
        let request = DownloadRequest::parse(urls, &self.policy)?;
        self.execute(request, cancel).await
    }

    /// Run an already validated request.
    ///
    /// Item failures never abort the job. Cancellation stops new items from
    /// starting, lets in-flight ones finish, then releases the workspace.
    pub async fn execute(
        &self,
        request: DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletedJob, JobError> {
        let job_id = Uuid::now_v7().to_string();
        let mut workspace = self.workspaces.allocate().await?;
        let items_dir = workspace.subdir(ITEMS_DIR).await?;

        info!(
            job_id = %job_id,
            total = request.len(),
            concurrency = self.concurrency,
            workspace = %workspace.path().display(),
            "Job started"
        );

        let mut slots: Vec<Option<OutcomeRecord>> = (0..request.len()).map(|_| None).collect();

        // Results arrive in completion order; slots restore request order
        // Items are owned so the job future stays Send when spawned
        let job: &str = &job_id;
        let items: &Path = &items_dir;
        let mut pending = stream::iter(request.urls().iter().cloned().enumerate())
            .take_while(move |_| future::ready(!cancel.is_cancelled()))
            .map(move |(index, url)| async move { self.retrieve_item(job, items, index, &url).await })
            .buffer_unordered(self.concurrency);

        while let Some(record) = pending.next().await {
            let index = record.index;
            slots[index] = Some(record);
        }
        drop(pending);

        let attempted = slots.iter().filter(|slot| slot.is_some()).count();
        if attempted < slots.len() {
            warn!(job_id = %job_id, attempted, total = slots.len(), "Job cancelled");
            workspace.release().await;
            return Err(InfrastructureError::Cancelled.into());
        }

        let outcomes: Vec<OutcomeRecord> = slots.into_iter().flatten().collect();
        let report = JobReport::from_outcomes(job_id.as_str(), &outcomes);

        info!(
            job_id = %job_id,
            total = report.total,
            success = report.success,
            failed = report.failed,
            "Job finished"
        );

        Ok(CompletedJob {
            job_id,
            report,
            outcomes,
            workspace,
        })
    }

    async fn retrieve_item(
        &self,
        job_id: &str,
        items_dir: &Path,
        index: usize,
        url: &str,
    ) -> OutcomeRecord {
        let destination = items_dir.join(format!("{index:03}"));
        if let Err(e) = tokio::fs::create_dir_all(&destination).await {
            let error = RetrievalError::new(
                FailureReason::Unknown,
                format!("failed to prepare item directory: {e}"),
            );
            return OutcomeRecord::failed(index, url, error);
        }

        debug!(job_id, index, url, retriever = self.retriever.name(), "Retrieving item");

        let fetched = AssertUnwindSafe(self.retriever.fetch(url, &destination))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(RetrievalError::new(
                    FailureReason::Unknown,
                    "retriever crashed",
                ))
            });

        let result = match fetched {
            Ok(path) if is_media_file_in(&path, &destination).await => Ok(path),
            Ok(path) => Err(RetrievalError::new(
                FailureReason::Unknown,
                format!("retriever returned an unusable path: {}", path.display()),
            )),
            Err(error) => Err(error),
        };

        match result {
            Ok(path) => {
                debug!(job_id, index, url, path = %path.display(), "Item retrieved");
                OutcomeRecord::success(index, url, path)
            }
            Err(error) => {
                warn!(
                    job_id,
                    index,
                    url,
                    reason = %error.reason,
                    detail = %error.detail,
                    "Item failed"
                );
                // Whatever is left must not reach the archive
                if let Err(e) = tokio::fs::remove_dir_all(&destination).await {
                    debug!(job_id, index, error = %e, "Item directory cleanup failed");
                }
                OutcomeRecord::failed(index, url, error)
            }
        }
    }
}

async fn is_media_file_in(path: &Path, destination: &Path) -> bool {
    let contained = path.starts_with(destination)
        && !path.components().any(|c| matches!(c, Component::ParentDir));

    contained
        && tokio::fs::symlink_metadata(path)
            .await
            .is_ok_and(|meta| meta.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Succeeds unless the URL contains "broken"; records call order
    #[derive(Default)]
    struct ScriptedRetriever {
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl Retriever for ScriptedRetriever {
        async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf, RetrievalError> {
            self.calls.lock().unwrap().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            // Later items finish first so completion order differs from request order
            let delay = 40u64.saturating_sub(self.calls.lock().unwrap().len() as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.contains("broken") {
                std::fs::write(destination.join("partial.mp4.part"), b"half").unwrap();
                return Err(RetrievalError::new(FailureReason::NotFound, "Video unavailable"));
            }
            if url.contains("escape") {
                return Ok(PathBuf::from("/etc/passwd"));
            }
            if url.contains("panic") {
                panic!("tool exploded");
            }

            let path = destination.join("clip.mp4");
            std::fs::write(&path, url.as_bytes()).unwrap();
            Ok(path)
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn orchestrator(root: &TempDir, retriever: Arc<ScriptedRetriever>) -> JobOrchestrator {
        JobOrchestrator::new(
            retriever,
            WorkspaceManager::new(root.path(), "job_"),
            UrlPolicy::permissive(),
        )
    }

    fn scratch_is_empty(root: &TempDir) -> bool {
        std::fs::read_dir(root.path()).unwrap().count() == 0
    }

    #[tokio::test]
    async fn test_mixed_outcomes_keep_request_order() {
        let root = TempDir::new().unwrap();
        let retriever = Arc::new(ScriptedRetriever::default());
        let urls = ["https://valid1", "https://broken", "https://valid2"];

        let job = orchestrator(&root, retriever.clone())
            .run(&urls, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(job.report.total, 3);
        assert_eq!(job.report.success, 2);
        assert_eq!(job.report.failed, 1);
        assert_eq!(job.report.failed_items[0].url, "https://broken");
        assert_eq!(job.report.failed_items[0].reason, FailureReason::NotFound);

        let order: Vec<&str> = job.outcomes.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(order, urls);
        assert_eq!(*retriever.calls.lock().unwrap(), urls);

        // Failed item leaves nothing behind
        assert!(!job.workspace.path().join(ITEMS_DIR).join("001").exists());
        assert!(job.outcomes[2].file_path().unwrap().is_file());
    }

    #[tokio::test]
    async fn test_parallel_run_restores_order() {
        let root = TempDir::new().unwrap();
        let retriever = Arc::new(ScriptedRetriever::default());
        let urls: Vec<String> = (0..8).map(|i| format!("https://a.example/{i}")).collect();

        let job = orchestrator(&root, retriever.clone())
            .with_concurrency(3)
            .run(&urls, &CancellationToken::new())
            .await
            .unwrap();

        let order: Vec<&String> = job.outcomes.iter().map(|o| &o.url).collect();
        assert_eq!(order, urls.iter().collect::<Vec<_>>());
        for (position, record) in job.outcomes.iter().enumerate() {
            assert_eq!(record.index, position);
        }
        assert!(retriever.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert!(retriever.max_in_flight.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_job_runs_on_spawned_task() {
        let root = TempDir::new().unwrap();
        let retriever = Arc::new(ScriptedRetriever::default());
        let orchestrator = orchestrator(&root, retriever).with_concurrency(2);
        let urls: Vec<String> = vec!["https://a.example/1".into(), "https://broken".into()];

        let job = tokio::spawn(async move {
            let cancel = CancellationToken::new();
            orchestrator.run(&urls, &cancel).await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(job.report.total, 2);
        assert_eq!(job.report.success, 1);
        assert_eq!(job.outcomes[1].url, "https://broken");
    }

    #[tokio::test]
    async fn test_sequential_by_default() {
        let root = TempDir::new().unwrap();
        let retriever = Arc::new(ScriptedRetriever::default());
        let urls = ["https://a.example/1", "https://a.example/2", "https://a.example/3"];

        orchestrator(&root, retriever.clone())
            .run(&urls, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(retriever.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicates_are_retrieved_independently() {
        let root = TempDir::new().unwrap();
        let retriever = Arc::new(ScriptedRetriever::default());
        let urls = ["https://a.example/1", "https://a.example/1"];

        let job = orchestrator(&root, retriever.clone())
            .run(&urls, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(retriever.calls.lock().unwrap().len(), 2);
        assert_eq!(job.report.success, 2);
        assert_ne!(job.outcomes[0].file_path(), job.outcomes[1].file_path());
    }

    #[tokio::test]
    async fn test_validation_failure_allocates_nothing() {
        let root = TempDir::new().unwrap();
        let retriever = Arc::new(ScriptedRetriever::default());
        let orchestrator = orchestrator(&root, retriever.clone());

        let empty: [&str; 0] = [];
        let err = orchestrator.run(&empty, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));

        let too_many: Vec<String> = (0..101).map(|i| format!("https://a.example/{i}")).collect();
        let err = orchestrator.run(&too_many, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));

        assert!(retriever.calls.lock().unwrap().is_empty());
        assert!(scratch_is_empty(&root));
    }

    #[tokio::test]
    async fn test_escaping_path_and_panic_are_item_failures() {
        let root = TempDir::new().unwrap();
        let retriever = Arc::new(ScriptedRetriever::default());
        let urls = ["https://escape", "https://panic", "https://fine"];

        let job = orchestrator(&root, retriever)
            .run(&urls, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(job.report.failed, 2);
        assert_eq!(job.report.success, 1);
        assert!(job.report.failed_items.iter().all(|i| i.reason == FailureReason::Unknown));
        assert_eq!(job.report.succeeded[0].url, "https://fine");
    }

    #[tokio::test]
    async fn test_cancelled_job_releases_workspace() {
        let root = TempDir::new().unwrap();
        let retriever = Arc::new(ScriptedRetriever::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orchestrator(&root, retriever.clone())
            .run(&["https://a.example/1"], &cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            JobError::Infrastructure(InfrastructureError::Cancelled)
        ));
        assert!(retriever.calls.lock().unwrap().is_empty());
        assert!(scratch_is_empty(&root));
    }

    #[tokio::test]
    async fn test_dropping_completed_job_releases_workspace() {
        let root = TempDir::new().unwrap();
        let retriever = Arc::new(ScriptedRetriever::default());

        let job = orchestrator(&root, retriever)
            .run(&["https://a.example/1"], &CancellationToken::new())
            .await
            .unwrap();
        assert!(!scratch_is_empty(&root));

        drop(job);
        for _ in 0..50 {
            if scratch_is_empty(&root) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("workspace still present after drop");
    }
}

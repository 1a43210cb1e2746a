//! ZIP bundling of retrieved media and the job report

mod naming;

pub use naming::{media_entry_name, sanitize_filename};

use async_trait::async_trait;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::job::{JobReport, OutcomeRecord};
use crate::workspace::Workspace;

/// Report entry, always the last one in the archive
pub const REPORT_FILE_NAME: &str = "download_report.json";

/// Archive file name inside the workspace
pub const ARCHIVE_FILE_NAME: &str = "bundle.zip";

/// Entries at or above this size need ZIP64 headers
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("archive task failed: {0}")]
    Task(String),

    #[error("media for entry {entry} missing at {path}")]
    MissingMedia { entry: String, path: PathBuf },
}

/// Finished archive on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    pub size: u64,
    /// Entry names in write order
    pub entries: Vec<String>,
}

/// Turns a finished job into a single archive inside its workspace
#[async_trait]
pub trait ArchiveBuilder: Send + Sync {
    async fn build(
        &self,
        workspace: &Workspace,
        report: &JobReport,
        outcomes: &[OutcomeRecord],
    ) -> Result<Archive, ArchiveError>;
}

/// Writes a ZIP with media stored as-is and the report deflated
#[derive(Debug, Clone, Default)]
pub struct ZipBuilder;

impl ZipBuilder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArchiveBuilder for ZipBuilder {
    async fn build(
        &self,
        workspace: &Workspace,
        report: &JobReport,
        outcomes: &[OutcomeRecord],
    ) -> Result<Archive, ArchiveError> {
        let report_json = report.to_json_pretty()?;
        let report_path = workspace.path().join(REPORT_FILE_NAME);
        tokio::fs::write(&report_path, &report_json).await?;

        // Report filenames and archive entries come from the same function
        let media: Vec<(String, PathBuf)> = outcomes
            .iter()
            .filter_map(|record| {
                record
                    .file_path()
                    .map(|path| (media_entry_name(record.index, path), path.to_path_buf()))
            })
            .collect();

        let archive_path = workspace.path().join(ARCHIVE_FILE_NAME);
        let target = archive_path.clone();

        let entries = tokio::task::spawn_blocking(move || write_zip(&target, &media, &report_json))
            .await
            .map_err(|e| ArchiveError::Task(e.to_string()))??;

        let size = tokio::fs::metadata(&archive_path).await?.len();
        info!(
            job_id = %report.job_id,
            entries = entries.len(),
            size,
            "Archive written"
        );

        Ok(Archive {
            path: archive_path,
            size,
            entries,
        })
    }
}

fn write_zip(
    target: &Path,
    media: &[(String, PathBuf)],
    report_json: &[u8],
) -> Result<Vec<String>, ArchiveError> {
    let file = File::create(target)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let mut entries = Vec::with_capacity(media.len() + 1);

    for (entry, path) in media {
        let mut source = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ArchiveError::MissingMedia {
                entry: entry.clone(),
                path: path.clone(),
            },
            _ => ArchiveError::Io(e),
        })?;
        let len = source.metadata()?.len();

        // Video is already compressed
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(len >= ZIP64_THRESHOLD);

        writer.start_file(entry.as_str(), options)?;
        io::copy(&mut source, &mut writer)?;
        debug!(entry = %entry, bytes = len, "Archived media");
        entries.push(entry.clone());
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(REPORT_FILE_NAME, options)?;
    writer.write_all(report_json)?;
    entries.push(REPORT_FILE_NAME.to_string());

    let mut inner = writer.finish()?;
    inner.flush()?;

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::{FailureReason, RetrievalError};
    use crate::workspace::WorkspaceManager;
    use std::io::Read;
    use tempfile::TempDir;

    async fn workspace_with_media(root: &TempDir, files: &[(&str, &[u8])]) -> (Workspace, Vec<PathBuf>) {
        let workspace = WorkspaceManager::new(root.path(), "job_").allocate().await.unwrap();
        let mut paths = Vec::new();
        for (i, (name, content)) in files.iter().enumerate() {
            let dir = workspace.subdir(format!("items/{i:03}")).await.unwrap();
            let path = dir.join(name);
            std::fs::write(&path, content).unwrap();
            paths.push(path);
        }
        (workspace, paths)
    }

    fn read_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).unwrap();
                (entry.name().to_string(), data)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_archive_contains_media_then_report() {
        let root = TempDir::new().unwrap();
        let (workspace, paths) =
            workspace_with_media(&root, &[("1_a.mp4", b"first"), ("x.mp4", b""), ("2_b.mp4", b"third")]).await;

        let outcomes = vec![
            OutcomeRecord::success(0, "https://valid1", paths[0].clone()),
            OutcomeRecord::failed(
                1,
                "https://broken",
                RetrievalError::new(FailureReason::NotFound, "gone"),
            ),
            OutcomeRecord::success(2, "https://valid2", paths[2].clone()),
        ];
        let report = JobReport::from_outcomes("job-1", &outcomes);

        let archive = ZipBuilder::new().build(&workspace, &report, &outcomes).await.unwrap();

        assert_eq!(
            archive.entries,
            ["001_1_a.mp4", "003_2_b.mp4", REPORT_FILE_NAME]
        );
        assert!(archive.path.starts_with(workspace.path()));
        assert_eq!(archive.size, std::fs::metadata(&archive.path).unwrap().len());

        let entries = read_entries(&archive.path);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], ("001_1_a.mp4".to_string(), b"first".to_vec()));
        assert_eq!(entries[1], ("003_2_b.mp4".to_string(), b"third".to_vec()));

        let parsed: JobReport = serde_json::from_slice(&entries[2].1).unwrap();
        assert_eq!(parsed, report);
        let names: Vec<&str> = parsed.succeeded.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, ["001_1_a.mp4", "003_2_b.mp4"]);
    }

    #[tokio::test]
    async fn test_all_failed_archive_has_only_report() {
        let root = TempDir::new().unwrap();
        let workspace = WorkspaceManager::new(root.path(), "job_").allocate().await.unwrap();
        let outcomes = vec![OutcomeRecord::failed(
            0,
            "https://broken",
            RetrievalError::new(FailureReason::Restricted, "private"),
        )];
        let report = JobReport::from_outcomes("job-2", &outcomes);

        let archive = ZipBuilder::new().build(&workspace, &report, &outcomes).await.unwrap();

        let entries = read_entries(&archive.path);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, REPORT_FILE_NAME);
    }

    #[tokio::test]
    async fn test_adversarial_names_stay_flat() {
        let root = TempDir::new().unwrap();
        let workspace = WorkspaceManager::new(root.path(), "job_").allocate().await.unwrap();
        let dir = workspace.subdir("items/000").await.unwrap();
        let path = dir.join("..%2F..%2Fetc..passwd");
        std::fs::write(&path, b"data").unwrap();

        let outcomes = vec![OutcomeRecord::success(0, "https://odd", path)];
        let report = JobReport::from_outcomes("job-3", &outcomes);
        let archive = ZipBuilder::new().build(&workspace, &report, &outcomes).await.unwrap();

        for (name, _) in read_entries(&archive.path) {
            assert!(!name.contains('/'));
            assert!(!name.contains('\\'));
            assert!(!name.starts_with('.'));
        }
    }

    #[tokio::test]
    async fn test_missing_media_is_an_error() {
        let root = TempDir::new().unwrap();
        let workspace = WorkspaceManager::new(root.path(), "job_").allocate().await.unwrap();
        let outcomes = vec![OutcomeRecord::success(
            0,
            "https://gone",
            workspace.path().join("items/000/vanished.mp4"),
        )];
        let report = JobReport::from_outcomes("job-4", &outcomes);

        let err = ZipBuilder::new().build(&workspace, &report, &outcomes).await.unwrap_err();
        assert!(matches!(err, ArchiveError::MissingMedia { ref entry, .. } if entry == "001_vanished.mp4"));
    }
}

//! yt-dlp backed retriever

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use super::classify::{classify_failure, summarize_failure};
use super::traits::{FailureReason, RetrievalError, Retriever};
use crate::config::RetrievalConfig;

const BINARY_NAME: &str = "yt-dlp";

// Leftovers yt-dlp writes while a download or merge is in progress
const TRANSIENT_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp", ".tmp"];

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("yt-dlp binary not found in PATH")]
    BinaryNotFound,

    #[error("configured yt-dlp binary does not exist: {0}")]
    MissingBinary(PathBuf),
}

/// Retriever that runs one `yt-dlp` process per URL.
///
/// The cookie file and format expression come from configuration and are
/// handed to the tool as-is.
#[derive(Debug, Clone)]
pub struct YtDlpRetriever {
    binary: PathBuf,
    cookies: Option<PathBuf>,
    format: String,
    merge_output_format: String,
    output_template: String,
    retries: u32,
    timeout: Duration,
}

impl YtDlpRetriever {
    /// Create a retriever for an explicit binary
    pub fn new(binary: PathBuf, config: &RetrievalConfig) -> Self {
        Self {
            binary,
            cookies: config.cookies_path.as_deref().and_then(resolve_cookie_file),
            format: config.format.clone(),
            merge_output_format: config.merge_output_format.clone(),
            output_template: config.output_template.clone(),
            retries: config.retries,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Build from configuration, locating `yt-dlp` in PATH unless an
    /// explicit binary is configured
    pub fn from_config(config: &RetrievalConfig) -> Result<Self, SetupError> {
        let binary = match &config.binary {
            Some(path) if path.exists() => path.clone(),
            Some(path) => return Err(SetupError::MissingBinary(path.clone())),
            None => which::which(BINARY_NAME).map_err(|_| SetupError::BinaryNotFound)?,
        };

        Ok(Self::new(binary, config))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn build_args(&self, url: &str, destination: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "--quiet",
            "--no-warnings",
            "--no-progress",
            "--no-playlist",
            "--geo-bypass",
            "--no-simulate",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        args.push("--retries".into());
        args.push(self.retries.to_string().into());
        args.push("--format".into());
        args.push(self.format.clone().into());
        args.push("--merge-output-format".into());
        args.push(self.merge_output_format.clone().into());

        if let Some(cookies) = &self.cookies {
            args.push("--cookies".into());
            args.push(cookies.clone().into_os_string());
        }

        args.push("--output".into());
        args.push(destination.join(&self.output_template).into_os_string());
        args.push("--print".into());
        args.push("after_move:filepath".into());

        // URLs never get parsed as options
        args.push("--".into());
        args.push(url.into());

        args
    }
}

#[async_trait]
impl Retriever for YtDlpRetriever {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf, RetrievalError> {
        let child = Command::new(&self.binary)
            .args(self.build_args(url, destination))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RetrievalError::new(FailureReason::Unknown, format!("failed to launch yt-dlp: {e}"))
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                discard_partial_output(destination).await;
                return Err(RetrievalError::new(
                    FailureReason::Unknown,
                    format!("yt-dlp did not complete: {e}"),
                ));
            }
            Err(_) => {
                // Dropping the wait future kills the child
                warn!(url, timeout_secs = self.timeout.as_secs(), "yt-dlp timed out");
                discard_partial_output(destination).await;
                return Err(RetrievalError::new(
                    FailureReason::NetworkError,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            discard_partial_output(destination).await;
            let reason = classify_failure(&stderr);
            debug!(url, status = ?output.status.code(), %reason, "yt-dlp failed");
            return Err(RetrievalError::new(reason, summarize_failure(&stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match locate_media(&stdout, destination).await {
            Some(path) => Ok(path),
            None => {
                discard_partial_output(destination).await;
                Err(RetrievalError::new(
                    FailureReason::Unknown,
                    "yt-dlp exited successfully but produced no media file",
                ))
            }
        }
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn is_available(&self) -> bool {
        self.binary.is_file()
    }
}

/// Expand a leading `~/` and drop the cookie file when it does not exist
fn resolve_cookie_file(path: &Path) -> Option<PathBuf> {
    let expanded = match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    };

    if expanded.is_file() {
        Some(expanded)
    } else {
        warn!(
            path = %expanded.display(),
            "Cookie file not found; videos that require authentication may fail"
        );
        None
    }
}

/// Prefer the path yt-dlp printed; otherwise take the only finished file in
/// the destination
async fn locate_media(stdout: &str, destination: &Path) -> Option<PathBuf> {
    let printed = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .map(PathBuf::from);

    if let Some(path) = printed {
        if path.starts_with(destination) && tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return Some(path);
        }
    }

    let mut entries = tokio::fs::read_dir(destination).await.ok()?;
    let mut found = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if is_file && !is_transient(&path) {
            found.push(path);
        }
    }

    if found.len() == 1 { found.pop() } else { None }
}

fn is_transient(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    TRANSIENT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

async fn discard_partial_output(destination: &Path) {
    let Ok(mut entries) = tokio::fs::read_dir(destination).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Err(e) = tokio::fs::remove_file(entry.path()).await {
            debug!(path = %entry.path().display(), error = %e, "Failed to remove partial output");
        }
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a single URL could not be retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Connection problems, throttling and timeouts
    NetworkError,
    /// Private, age-gated, region-locked or login-only content
    Restricted,
    /// Removed or never existed
    NotFound,
    /// The tool does not understand the URL
    UnsupportedUrl,
    Unknown,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::NetworkError => "network-error",
            FailureReason::Restricted => "restricted",
            FailureReason::NotFound => "not-found",
            FailureReason::UnsupportedUrl => "unsupported-url",
            FailureReason::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-URL retrieval failure; recorded in the job report, never fatal
#[derive(Debug, Clone, Error)]
#[error("{reason}: {detail}")]
pub struct RetrievalError {
    pub reason: FailureReason,
    pub detail: String,
}

impl RetrievalError {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Fetches one media item per call.
///
/// Implementations place exactly one file inside `destination` and return
/// its path. On failure nothing usable may remain in `destination`.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf, RetrievalError>;

    /// Short identifier for logs and health output
    fn name(&self) -> &'static str;

    /// Whether the backing tool can currently be invoked
    fn is_available(&self) -> bool {
        true
    }
}

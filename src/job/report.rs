use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::archive::media_entry_name;
use crate::retrieval::{FailureReason, RetrievalError};

/// Result of one URL
#[derive(Debug, Clone)]
pub enum Outcome {
    Success { file_path: PathBuf },
    Failed(RetrievalError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failed,
}

/// Per-URL record, `index` is the 0-based request position
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub index: usize,
    pub url: String,
    pub outcome: Outcome,
}

impl OutcomeRecord {
    pub fn success(index: usize, url: impl Into<String>, file_path: PathBuf) -> Self {
        Self {
            index,
            url: url.into(),
            outcome: Outcome::Success { file_path },
        }
    }

    pub fn failed(index: usize, url: impl Into<String>, error: RetrievalError) -> Self {
        Self {
            index,
            url: url.into(),
            outcome: Outcome::Failed(error),
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self.outcome {
            Outcome::Success { .. } => OutcomeStatus::Success,
            Outcome::Failed(_) => OutcomeStatus::Failed,
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::Success { file_path } => Some(file_path),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&RetrievalError> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failed(error) => Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SucceededItem {
    pub url: String,
    /// Entry name inside the archive
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub url: String,
    pub reason: FailureReason,
    pub detail: String,
}

/// Aggregate written to `download_report.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: String,
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub succeeded: Vec<SucceededItem>,
    pub failed_items: Vec<FailedItem>,
}

/// Counts mirrored into the `X-Download-Summary` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

impl JobReport {
    /// Derive the report from records already in request order
    pub fn from_outcomes(job_id: impl Into<String>, outcomes: &[OutcomeRecord]) -> Self {
        let mut succeeded = Vec::new();
        let mut failed_items = Vec::new();

        for record in outcomes {
            match &record.outcome {
                Outcome::Success { file_path } => succeeded.push(SucceededItem {
                    url: record.url.clone(),
                    filename: media_entry_name(record.index, file_path),
                }),
                Outcome::Failed(error) => failed_items.push(FailedItem {
                    url: record.url.clone(),
                    reason: error.reason,
                    detail: error.detail.clone(),
                }),
            }
        }

        Self {
            job_id: job_id.into(),
            generated_at: Utc::now(),
            total: outcomes.len(),
            success: succeeded.len(),
            failed: failed_items.len(),
            succeeded,
            failed_items,
        }
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            total: self.total,
            success: self.success,
            failed: self.failed,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

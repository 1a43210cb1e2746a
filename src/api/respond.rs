//! Turns a finished [`Bundle`] into a streamed ZIP response

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::error::ApiError;
use crate::bundle::Bundle;
use crate::workspace::Workspace;

pub const JOB_ID_HEADER: HeaderName = HeaderName::from_static("x-job-id");
pub const SUMMARY_HEADER: HeaderName = HeaderName::from_static("x-download-summary");

/// Archive download name: `<prefix>_<UTC timestamp>.zip`
pub fn attachment_name(prefix: &str) -> String {
    format!("{prefix}_{}.zip", Utc::now().format("%Y%m%d_%H%M%S"))
}

/// Stream the archive to the client.
///
/// The response body takes ownership of the workspace and releases it once
/// the last byte has been read or the body is dropped.
pub async fn respond(bundle: Bundle, filename_prefix: &str) -> Result<Response, ApiError> {
    let Bundle {
        job_id,
        report,
        archive,
        workspace,
    } = bundle;

    let file = File::open(&archive.path)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to open archive: {e}")))?;

    let summary = serde_json::to_string(&report.summary())
        .map_err(|e| ApiError::Internal(format!("failed to encode summary: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(archive.size));
    headers.insert(
        header::CONTENT_DISPOSITION,
        header_value(format!(
            "attachment; filename=\"{}\"",
            attachment_name(filename_prefix)
        ))?,
    );
    headers.insert(JOB_ID_HEADER, header_value(job_id.clone())?);
    headers.insert(SUMMARY_HEADER, header_value(summary)?);

    debug!(job_id = %job_id, size = archive.size, "Streaming archive");

    let body = Body::from_stream(ArchiveStream {
        inner: ReaderStream::new(file),
        workspace: Some(workspace),
    });

    Ok((StatusCode::OK, headers, body).into_response())
}

fn header_value(value: String) -> Result<HeaderValue, ApiError> {
    HeaderValue::try_from(value).map_err(|e| ApiError::Internal(format!("invalid header value: {e}")))
}

/// Archive bytes plus the workspace they live in
struct ArchiveStream {
    inner: ReaderStream<File>,
    workspace: Option<Workspace>,
}

impl Stream for ArchiveStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);

        // Fully read; the archive is no longer needed
        if let Poll::Ready(None) = polled {
            this.workspace.take();
        }

        polled
    }
}

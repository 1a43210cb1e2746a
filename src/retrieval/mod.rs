//! Retrieval adapters
//!
//! A [`Retriever`] fetches one media item for one URL into a directory it is
//! given, or reports a classified [`RetrievalError`]. Jobs only talk to the
//! trait, so tests can swap in fakes and never touch the network.
//!
//! ## Key Components
//!
//! - [`Retriever`] - adapter contract
//! - [`YtDlpRetriever`] - adapter driving the external `yt-dlp` binary
//! - [`FailureReason`] - closed set of failure classes written to reports
//! - [`classify_failure`] - maps tool output onto a [`FailureReason`]

mod classify;
mod traits;
mod ytdlp;

pub use classify::{classify_failure, summarize_failure};
pub use traits::{FailureReason, RetrievalError, Retriever};
pub use ytdlp::{SetupError, YtDlpRetriever};

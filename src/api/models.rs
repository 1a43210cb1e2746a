//! API models for the download and health endpoints.
//!
//! A download request (as JSON):
//!
//! ```json
//! {
//!   "urls": [
//!     "https://www.tiktok.com/@someone/video/7301234567890123456",
//!     "https://vm.tiktok.com/ZMabc123/"
//!   ]
//! }
//! ```
//!
//! Success returns the ZIP archive itself; errors return [`ErrorResponse`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct DownloadPayload {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}

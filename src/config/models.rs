use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub api: ApiLimits,
}

/// Request limits for the download endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiLimits {
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
    #[serde(default = "default_max_urls_per_job")]
    pub max_urls_per_job: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api: ApiLimits::default(),
        }
    }
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            max_urls_per_job: default_max_urls_per_job(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(1024 * 1024) // 1 MB
}

fn default_max_urls_per_job() -> usize {
    100
}

/// External retrieval tool settings.
///
/// `cookies_path` and `format` are passed to the tool untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Explicit yt-dlp binary; resolved from PATH when unset
    pub binary: Option<PathBuf>,
    pub cookies_path: Option<PathBuf>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_merge_output_format")]
    pub merge_output_format: String,
    #[serde(default = "default_output_template")]
    pub output_template: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Per-URL limit, the process is killed once it elapses
    #[serde(default = "default_retrieval_timeout_secs")]
    pub timeout_secs: u64,
    /// Hosts accepted in requests; empty accepts any host
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            binary: None,
            cookies_path: None,
            format: default_format(),
            merge_output_format: default_merge_output_format(),
            output_template: default_output_template(),
            retries: default_retries(),
            timeout_secs: default_retrieval_timeout_secs(),
            allowed_domains: default_allowed_domains(),
        }
    }
}

fn default_format() -> String {
    "bv*+ba/bestvideo+bestaudio/best".to_string()
}

fn default_merge_output_format() -> String {
    "mp4".to_string()
}

fn default_output_template() -> String {
    "%(id)s_%(creator)s.%(ext)s".to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_retrieval_timeout_secs() -> u64 {
    300
}

fn default_allowed_domains() -> Vec<String> {
    ["tiktok.com", "www.tiktok.com", "m.tiktok.com", "vm.tiktok.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Job execution settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    /// Items retrieved at once within one job; 1 keeps retrieval sequential
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Parent directory for job workspaces; the system temp dir when unset
    pub scratch_root: Option<PathBuf>,
    #[serde(default = "default_workspace_prefix")]
    pub workspace_prefix: String,
    #[serde(default = "default_job_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            scratch_root: None,
            workspace_prefix: default_workspace_prefix(),
            timeout_secs: default_job_timeout_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_workspace_prefix() -> String {
    "vidbundle_".to_string()
}

fn default_job_timeout_secs() -> u64 {
    60 * 60
}

/// Archive naming
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            filename_prefix: default_filename_prefix(),
        }
    }
}

fn default_filename_prefix() -> String {
    "tiktok_videos".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.api.max_urls_per_job, 100);
        assert_eq!(config.jobs.concurrency, 1);
        assert_eq!(config.retrieval.retries, 3);
        assert_eq!(config.retrieval.format, "bv*+ba/bestvideo+bestaudio/best");
        assert!(config.retrieval.allowed_domains.contains(&"tiktok.com".to_string()));
        assert_eq!(config.archive.filename_prefix, "tiktok_videos");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[jobs]
concurrency = 3

[retrieval]
allowed_domains = []
            "#,
        )
        .unwrap();

        assert_eq!(config.jobs.concurrency, 3);
        assert_eq!(config.jobs.workspace_prefix, "vidbundle_");
        assert!(config.retrieval.allowed_domains.is_empty());
        assert_eq!(config.retrieval.merge_output_format, "mp4");
    }
}

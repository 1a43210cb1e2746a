use thiserror::Error;
use url::Url;

use crate::config::{Config, MAX_URLS_CEILING};

const MAX_ECHOED_URL_CHARS: usize = 120;

/// Request shape violations, reported before any work starts.
///
/// Positions are 1-based so messages match what a user typed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one URL is required")]
    EmptyList,

    #[error("too many URLs: {count} given, at most {max} allowed")]
    TooMany { count: usize, max: usize },

    #[error("URL #{position} is empty")]
    EmptyEntry { position: usize },

    #[error("URL #{position} is not a valid URL ({reason}): {url}")]
    InvalidUrl {
        position: usize,
        url: String,
        reason: String,
    },

    #[error("URL #{position} must use http or https, got '{scheme}'")]
    UnsupportedScheme { position: usize, scheme: String },

    #[error("URL #{position} host '{host}' is not an accepted video site")]
    DisallowedHost { position: usize, host: String },
}

impl ValidationError {
    /// Stable machine-readable constraint name
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyList => "EMPTY_URL_LIST",
            ValidationError::TooMany { .. } => "TOO_MANY_URLS",
            ValidationError::EmptyEntry { .. } => "EMPTY_URL",
            ValidationError::InvalidUrl { .. } | ValidationError::UnsupportedScheme { .. } => {
                "INVALID_URL"
            }
            ValidationError::DisallowedHost { .. } => "DISALLOWED_HOST",
        }
    }
}

/// What a request may contain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPolicy {
    max_urls: usize,
    allowed_domains: Vec<String>,
}

impl UrlPolicy {
    /// `max_urls` is clamped to `1..=100`; an empty domain list accepts any host
    pub fn new(max_urls: usize, allowed_domains: Vec<String>) -> Self {
        Self {
            max_urls: max_urls.clamp(1, MAX_URLS_CEILING),
            allowed_domains: allowed_domains
                .into_iter()
                .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Accept any http(s) host, up to the hard URL ceiling
    pub fn permissive() -> Self {
        Self::new(MAX_URLS_CEILING, Vec::new())
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.server.api.max_urls_per_job,
            config.retrieval.allowed_domains.clone(),
        )
    }

    pub fn max_urls(&self) -> usize {
        self.max_urls
    }

    fn allows_host(&self, host: &str) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.allowed_domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// Validated, ordered list of URLs for one job.
///
/// Entries are trimmed; duplicates are kept and processed independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    urls: Vec<String>,
}

impl DownloadRequest {
    pub fn parse<S: AsRef<str>>(raw: &[S], policy: &UrlPolicy) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::EmptyList);
        }

        if raw.len() > policy.max_urls {
            return Err(ValidationError::TooMany {
                count: raw.len(),
                max: policy.max_urls,
            });
        }

        let urls = raw
            .iter()
            .enumerate()
            .map(|(index, url)| validate_entry(index + 1, url.as_ref(), policy))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { urls })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

fn validate_entry(position: usize, raw: &str, policy: &UrlPolicy) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyEntry { position });
    }

    let parsed = Url::parse(trimmed).map_err(|e| ValidationError::InvalidUrl {
        position,
        url: echo(trimmed),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::UnsupportedScheme {
            position,
            scheme: parsed.scheme().to_string(),
        });
    }

    let host = parsed.host_str().unwrap_or_default();
    if !policy.allows_host(host) {
        return Err(ValidationError::DisallowedHost {
            position,
            host: host.to_string(),
        });
    }

    Ok(trimmed.to_string())
}

fn echo(url: &str) -> String {
    if url.chars().count() > MAX_ECHOED_URL_CHARS {
        let head: String = url.chars().take(MAX_ECHOED_URL_CHARS).collect();
        format!("{head}...")
    } else {
        url.to_string()
    }
}

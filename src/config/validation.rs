use super::models::Config;
use thiserror::Error;

/// Hard ceiling on URLs per job, whatever the configuration says
pub const MAX_URLS_CEILING: usize = 100;
/// Upper bound for intra-job parallel retrieval
pub const MAX_CONCURRENCY: usize = 4;
const MAX_PAYLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("max_urls_per_job must be between 1 and {}, got {0}", MAX_URLS_CEILING)]
    InvalidMaxUrls(usize),

    #[error("max_payload_bytes ({actual}) exceeds limit of 5MB ({limit})")]
    PayloadSizeExceedsLimit { actual: u64, limit: u64 },

    #[error("jobs.concurrency must be between 1 and {}, got {0}", MAX_CONCURRENCY)]
    InvalidConcurrency(usize),

    #[error("Timeout must be positive: {field} = 0")]
    ZeroTimeout { field: &'static str },

    #[error("retrieval.format must not be empty")]
    EmptyFormat,

    #[error("retrieval.output_template must be a bare file name template, got '{0}'")]
    InvalidOutputTemplate(String),

    #[error("allowed domain '{0}' must be a bare host name")]
    InvalidAllowedDomain(String),

    #[error("{field} must not be empty and must not contain path separators")]
    InvalidName { field: &'static str },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_api_limits(config)?;
    validate_jobs(config)?;
    validate_retrieval(config)?;
    validate_archive(config)?;
    Ok(())
}

fn validate_api_limits(config: &Config) -> Result<(), ValidationError> {
    let api = &config.server.api;

    if !(1..=MAX_URLS_CEILING).contains(&api.max_urls_per_job) {
        return Err(ValidationError::InvalidMaxUrls(api.max_urls_per_job));
    }

    if api.max_payload_bytes.as_u64() > MAX_PAYLOAD_BYTES {
        return Err(ValidationError::PayloadSizeExceedsLimit {
            actual: api.max_payload_bytes.as_u64(),
            limit: MAX_PAYLOAD_BYTES,
        });
    }

    Ok(())
}

fn validate_jobs(config: &Config) -> Result<(), ValidationError> {
    let jobs = &config.jobs;

    if !(1..=MAX_CONCURRENCY).contains(&jobs.concurrency) {
        return Err(ValidationError::InvalidConcurrency(jobs.concurrency));
    }

    if jobs.timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "jobs.timeout_secs",
        });
    }

    if !is_plain_name(&jobs.workspace_prefix) {
        return Err(ValidationError::InvalidName {
            field: "jobs.workspace_prefix",
        });
    }

    Ok(())
}

fn validate_retrieval(config: &Config) -> Result<(), ValidationError> {
    let retrieval = &config.retrieval;

    if retrieval.timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "retrieval.timeout_secs",
        });
    }

    if retrieval.format.trim().is_empty() {
        return Err(ValidationError::EmptyFormat);
    }

    // The template is joined onto a per-item directory and must stay inside it
    if !is_plain_name(&retrieval.output_template) {
        return Err(ValidationError::InvalidOutputTemplate(
            retrieval.output_template.clone(),
        ));
    }

    for domain in &retrieval.allowed_domains {
        let bare = !domain.is_empty()
            && domain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
        if !bare {
            return Err(ValidationError::InvalidAllowedDomain(domain.clone()));
        }
    }

    Ok(())
}

fn validate_archive(config: &Config) -> Result<(), ValidationError> {
    if !is_plain_name(&config.archive.filename_prefix)
        || config.archive.filename_prefix.contains('"')
    {
        return Err(ValidationError::InvalidName {
            field: "archive.filename_prefix",
        });
    }
    Ok(())
}

fn is_plain_name(value: &str) -> bool {
    !value.trim().is_empty() && !value.contains(['/', '\\']) && value != ".."
}

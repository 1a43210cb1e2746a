use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "VIDBUNDLE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/vidbundle.toml";
const ENV_PREFIX: &str = "VIDBUNDLE";
const ENV_SEPARATOR: &str = "__";

const LEGACY_COOKIES_VAR: &str = "TIKTOK_COOKIES_PATH";
const LEGACY_FORMAT_VAR: &str = "TIKTOK_VIDEO_FORMAT";

/// Resolve the configuration file path from `VIDBUNDLE_CONFIG` or the default
pub fn default_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load(config_path: PathBuf) -> Result<Config, ConfigError> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let mut config = load_from_sources(config_path)?;
    apply_legacy_overrides(&mut config, |key| env::var(key).ok());

    Ok(config)
}

/// Honour the single-purpose variables older deployments set for the
/// retrieval tool
fn apply_legacy_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(LEGACY_COOKIES_VAR).filter(|v| !v.trim().is_empty()) {
        config.retrieval.cookies_path = Some(PathBuf::from(path));
    }
    if let Some(format) = lookup(LEGACY_FORMAT_VAR).filter(|v| !v.trim().is_empty()) {
        config.retrieval.format = format;
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // VIDBUNDLE__JOBS__CONCURRENCY -> jobs.concurrency
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .list_separator(",")
            .with_list_parse_key("retrieval.allowed_domains")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

//! Config file loading and merging with CLI flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use doihive_core::fetch::{
    BACKOFF_BASE, BACKOFF_MAX_JITTER, CONNECT_TIMEOUT, CONTENT_TIMEOUT, DEFAULT_BASE_URL,
    DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, FetchSettings, PAGE_TIMEOUT, RetryPolicy,
};
use serde::Deserialize;

use crate::cli::Args;

const DEFAULT_ARCHIVE_DIR: &str = "archive";
const DEFAULT_OUTPUT_DIR: &str = "pdf";
const DEFAULT_ERROR_DIR: &str = "logs";
const MAX_BACKOFF_MS: u64 = 60_000;

/// TOML-backed file configuration. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Directory holding the exports.
    pub archive_dir: Option<PathBuf>,
    /// Directory the PDFs are saved to.
    pub output_dir: Option<PathBuf>,
    /// Directory for the error log and retry list.
    pub error_dir: Option<PathBuf>,
    /// Parallel downloads (1..=100).
    pub workers: Option<usize>,
    /// Mirror base URL.
    pub base_url: Option<String>,
    /// Attempts per network step (1..=10).
    pub max_attempts: Option<u32>,
    /// Backoff unit in milliseconds; retry `n` waits `n` units plus jitter.
    pub backoff_base_ms: Option<u64>,
    /// Upper bound of the random jitter added to each backoff, in milliseconds.
    pub max_jitter_ms: Option<u64>,
    pub page_timeout_secs: Option<u64>,
    pub content_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    /// Where pages without an artifact link are saved.
    pub debug_html_dir: Option<PathBuf>,
    /// Directory for a log file.
    pub log_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers
            && !(1..=100).contains(&workers)
        {
            bail!("Invalid config value for `workers`: {workers}. Expected range: 1..=100");
        }
        if let Some(attempts) = self.max_attempts
            && !(1..=10).contains(&attempts)
        {
            bail!("Invalid config value for `max_attempts`: {attempts}. Expected range: 1..=10");
        }
        validate_backoff_ms("backoff_base_ms", self.backoff_base_ms)?;
        validate_backoff_ms("max_jitter_ms", self.max_jitter_ms)?;
        validate_timeout_secs("page_timeout_secs", self.page_timeout_secs)?;
        validate_timeout_secs("content_timeout_secs", self.content_timeout_secs)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

fn validate_backoff_ms(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if value > MAX_BACKOFF_MS {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 0..={MAX_BACKOFF_MS}");
    }
    Ok(())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/doihive/config.toml`
/// 2. `$HOME/.config/doihive/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join("doihive").join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("doihive")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config named by `--config`, or the default file if it exists.
///
/// A missing explicit file is an error; a missing default file is not.
pub fn load(explicit: Option<&Path>) -> Result<Option<(PathBuf, FileConfig)>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("Config file '{}' does not exist", path.display());
        }
        return Ok(Some((path.to_path_buf(), load_file_config(path)?)));
    }

    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.is_file() {
        return Ok(None);
    }
    let config = load_file_config(&path)?;
    Ok(Some((path, config)))
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Effective settings for one run: CLI flag, then config file, then default.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub archive_dir: PathBuf,
    pub output_dir: PathBuf,
    pub error_dir: PathBuf,
    pub workers: usize,
    pub budget: Option<usize>,
    pub base_url: String,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub max_jitter: Duration,
    pub page_timeout: Duration,
    pub content_timeout: Duration,
    pub connect_timeout: Duration,
    pub debug_html_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl RunConfig {
    /// Merges CLI flags over the file config.
    #[must_use]
    pub fn resolve(args: &Args, file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();
        let secs = |value: Option<u64>, default: Duration| {
            value.map_or(default, Duration::from_secs)
        };
        let millis = |value: Option<u64>, default: Duration| {
            value.map_or(default, Duration::from_millis)
        };

        Self {
            archive_dir: args
                .archive_dir
                .clone()
                .or(file.archive_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_DIR)),
            output_dir: args
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            error_dir: args
                .error_dir
                .clone()
                .or(file.error_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ERROR_DIR)),
            workers: args
                .workers
                .map(usize::from)
                .or(file.workers)
                .unwrap_or(DEFAULT_CONCURRENCY),
            budget: args.budget,
            base_url: args
                .base_url
                .clone()
                .or(file.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_attempts: file.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            backoff_base: millis(file.backoff_base_ms, BACKOFF_BASE),
            max_jitter: millis(file.max_jitter_ms, BACKOFF_MAX_JITTER),
            page_timeout: secs(file.page_timeout_secs, PAGE_TIMEOUT),
            content_timeout: secs(file.content_timeout_secs, CONTENT_TIMEOUT),
            connect_timeout: secs(file.connect_timeout_secs, CONNECT_TIMEOUT),
            debug_html_dir: file.debug_html_dir,
            log_dir: args.log_dir.clone().or(file.log_dir),
        }
    }

    /// Library settings for the fetch engine.
    #[must_use]
    pub fn fetch_settings(&self) -> FetchSettings {
        let mut settings = FetchSettings::new(&self.output_dir);
        settings.page_timeout = self.page_timeout;
        settings.content_timeout = self.content_timeout;
        settings.connect_timeout = self.connect_timeout;
        settings.retry_policy =
            RetryPolicy::new(self.max_attempts, self.backoff_base, self.max_jitter);
        settings.debug_html_dir.clone_from(&self.debug_html_dir);
        settings
    }
}

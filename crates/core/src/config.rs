//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.
//!
//! Binaries call [`CoreConfig::from_lookup`] with `|key| std::env::var(key).ok()` after loading
//! `.env`; tests pass a closure over a fixed map instead.

use crate::constants::*;
use crate::{ConsultError, ConsultResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// How `generate-summary` requests are executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SummaryMode {
    /// The request waits for the AI call and returns the updated consultation.
    #[default]
    Sync,
    /// The request enqueues a job and returns `202 Accepted`.
    Async,
}

impl FromStr for SummaryMode {
    type Err = ConsultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(Self::Sync),
            "async" | "asynchronous" => Ok(Self::Async),
            other => Err(ConsultError::InvalidConfig(format!(
                "SUMMARY_MODE must be 'sync' or 'async', got '{other}'"
            ))),
        }
    }
}

/// Which LLM backend produces summaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AiProvider {
    /// Hosted OpenAI chat-completions API.
    #[default]
    OpenAi,
    /// Local Ollama server through its OpenAI-compatible endpoint.
    Ollama,
    /// Offline canned summaries for development.
    Mock,
}

impl FromStr for AiProvider {
    type Err = ConsultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            other => Err(ConsultError::InvalidConfig(format!(
                "AI_PROVIDER must be one of 'openai', 'ollama', 'mock', got '{other}'"
            ))),
        }
    }
}

/// Settings for the AI summary client, already narrowed to the selected provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl AiConfig {
    pub fn mock() -> Self {
        Self {
            provider: AiProvider::Mock,
            base_url: String::new(),
            model: "mock".into(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
        }
    }
}

/// Bounded exponential backoff for background summary jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (zero-based): `base * 2^retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Total attempts a job may make, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
        }
    }
}

/// Worker pool sizing and pacing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    pub workers: usize,
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_SUMMARY_WORKERS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            retry: RetryPolicy::default(),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_path: PathBuf,
    rest_addr: String,
    cors_allowed_origins: Vec<String>,
    summary_mode: SummaryMode,
    ai: AiConfig,
    worker: WorkerConfig,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default network settings.
    pub fn new(
        database_path: PathBuf,
        summary_mode: SummaryMode,
        ai: AiConfig,
        worker: WorkerConfig,
    ) -> ConsultResult<Self> {
        if worker.workers == 0 {
            return Err(ConsultError::InvalidConfig(
                "SUMMARY_WORKERS must be at least 1".into(),
            ));
        }
        if ai.model.trim().is_empty() {
            return Err(ConsultError::InvalidConfig("AI model cannot be empty".into()));
        }

        Ok(Self {
            database_path,
            rest_addr: DEFAULT_REST_ADDR.into(),
            cors_allowed_origins: split_origins(DEFAULT_CORS_ALLOWED_ORIGINS),
            summary_mode,
            ai,
            worker,
        })
    }

    /// Resolve the full configuration from a key lookup (normally the process environment).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConsultResult<Self> {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_path = value("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        let summary_mode = value("SUMMARY_MODE")
            .map(|v| v.parse::<SummaryMode>())
            .transpose()?
            .unwrap_or_default();

        let provider = value("AI_PROVIDER")
            .map(|v| v.parse::<AiProvider>())
            .transpose()?
            .unwrap_or_default();
        let timeout = Duration::from_secs(parse_number(
            "AI_TIMEOUT_SECS",
            value("AI_TIMEOUT_SECS"),
            DEFAULT_AI_TIMEOUT_SECS,
        )?);
        let ai = match provider {
            AiProvider::OpenAi => AiConfig {
                provider,
                base_url: value("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into()),
                model: value("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into()),
                api_key: value("OPENAI_API_KEY"),
                timeout,
            },
            AiProvider::Ollama => AiConfig {
                provider,
                base_url: value("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.into()),
                model: value("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.into()),
                api_key: None,
                timeout,
            },
            AiProvider::Mock => AiConfig {
                timeout,
                ..AiConfig::mock()
            },
        };

        let worker = WorkerConfig {
            workers: parse_number(
                "SUMMARY_WORKERS",
                value("SUMMARY_WORKERS"),
                DEFAULT_SUMMARY_WORKERS,
            )?,
            poll_interval: Duration::from_millis(parse_number(
                "SUMMARY_POLL_INTERVAL_MS",
                value("SUMMARY_POLL_INTERVAL_MS"),
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            retry: RetryPolicy {
                max_retries: parse_number(
                    "SUMMARY_MAX_RETRIES",
                    value("SUMMARY_MAX_RETRIES"),
                    DEFAULT_MAX_RETRIES,
                )?,
                base_delay: Duration::from_millis(parse_number(
                    "SUMMARY_RETRY_BASE_MS",
                    value("SUMMARY_RETRY_BASE_MS"),
                    DEFAULT_RETRY_BASE_MS,
                )?),
            },
        };

        let mut cfg = Self::new(database_path, summary_mode, ai, worker)?;
        if let Some(addr) = value("REST_ADDR") {
            cfg.rest_addr = addr;
        }
        if let Some(origins) = value("CORS_ALLOWED_ORIGINS") {
            cfg.cors_allowed_origins = split_origins(&origins);
        }
        Ok(cfg)
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn rest_addr(&self) -> &str {
        &self.rest_addr
    }

    pub fn cors_allowed_origins(&self) -> &[String] {
        &self.cors_allowed_origins
    }

    pub fn summary_mode(&self) -> SummaryMode {
        self.summary_mode
    }

    pub fn ai(&self) -> &AiConfig {
        &self.ai
    }

    pub fn worker(&self) -> &WorkerConfig {
        &self.worker
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// Parse a numeric setting, falling back to `default` when unset.
fn parse_number<T: FromStr>(key: &str, value: Option<String>, default: T) -> ConsultResult<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| {
            ConsultError::InvalidConfig(format!("{key} must be a non-negative integer, got '{raw}'"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = CoreConfig::from_lookup(lookup_from(&[])).expect("defaults should be valid");

        assert_eq!(cfg.database_path(), Path::new(DEFAULT_DATABASE_PATH));
        assert_eq!(cfg.rest_addr(), DEFAULT_REST_ADDR);
        assert_eq!(cfg.cors_allowed_origins(), ["http://localhost:3000"]);
        assert_eq!(cfg.summary_mode(), SummaryMode::Sync);
        assert_eq!(cfg.ai().provider, AiProvider::OpenAi);
        assert_eq!(cfg.ai().model, DEFAULT_OPENAI_MODEL);
        assert_eq!(cfg.ai().api_key, None);
        assert_eq!(cfg.worker().retry, RetryPolicy::default());
    }

    #[test]
    fn ollama_provider_uses_local_settings() {
        let cfg = CoreConfig::from_lookup(lookup_from(&[
            ("AI_PROVIDER", "Ollama"),
            ("OLLAMA_MODEL", "llama3"),
            ("OPENAI_API_KEY", "sk-ignored"),
        ]))
        .unwrap();

        assert_eq!(cfg.ai().provider, AiProvider::Ollama);
        assert_eq!(cfg.ai().base_url, DEFAULT_OLLAMA_BASE_URL);
        assert_eq!(cfg.ai().model, "llama3");
        assert_eq!(cfg.ai().api_key, None);
    }

    #[test]
    fn async_mode_and_worker_overrides_are_parsed() {
        let cfg = CoreConfig::from_lookup(lookup_from(&[
            ("SUMMARY_MODE", "async"),
            ("SUMMARY_WORKERS", "4"),
            ("SUMMARY_MAX_RETRIES", "5"),
            ("SUMMARY_RETRY_BASE_MS", "250"),
            ("CORS_ALLOWED_ORIGINS", "http://a.test, http://b.test"),
        ]))
        .unwrap();

        assert_eq!(cfg.summary_mode(), SummaryMode::Async);
        assert_eq!(cfg.worker().workers, 4);
        assert_eq!(cfg.worker().retry.max_retries, 5);
        assert_eq!(cfg.worker().retry.base_delay, Duration::from_millis(250));
        assert_eq!(cfg.cors_allowed_origins(), ["http://a.test", "http://b.test"]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = CoreConfig::from_lookup(lookup_from(&[("SUMMARY_MODE", "later")])).unwrap_err();
        assert!(matches!(err, ConsultError::InvalidConfig(_)));

        let err = CoreConfig::from_lookup(lookup_from(&[("AI_PROVIDER", "gpt")])).unwrap_err();
        assert!(matches!(err, ConsultError::InvalidConfig(_)));

        let err =
            CoreConfig::from_lookup(lookup_from(&[("SUMMARY_WORKERS", "many")])).unwrap_err();
        assert!(matches!(err, ConsultError::InvalidConfig(_)));

        let err = CoreConfig::from_lookup(lookup_from(&[("SUMMARY_WORKERS", "0")])).unwrap_err();
        assert!(matches!(err, ConsultError::InvalidConfig(_)));
    }

    #[test]
    fn retry_delays_double_from_the_base() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (0..policy.max_retries).map(|r| policy.delay_for(r)).collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        assert_eq!(policy.max_attempts(), 4);
    }
}

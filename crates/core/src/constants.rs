//! Constants used throughout the consultation core crate.
//!
//! Defaults for configuration values and the fixed limits the API contract promises
//! live here so the config parser, the store and the tests agree on them.

/// Default SQLite database file when `DATABASE_PATH` is unset.
pub const DEFAULT_DATABASE_PATH: &str = "consultations.db";

/// Default REST bind address.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:8000";

/// Default CORS origin (the web frontend's dev server).
pub const DEFAULT_CORS_ALLOWED_ORIGINS: &str = "http://localhost:3000";

/// Page size used when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound for a client-supplied `page_size`.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Maximum length of a patient's full name, in characters.
pub const MAX_FULL_NAME_LEN: usize = 255;

/// Hosted provider defaults.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Local provider defaults (Ollama's OpenAI-compatible endpoint).
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_OLLAMA_MODEL: &str = "phi3.5:3.8b-mini-instruct-q4_K_M";

pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;

/// Retries after the first attempt for a background summary job.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Backoff base; retry `n` waits `base * 2^n`.
pub const DEFAULT_RETRY_BASE_MS: u64 = 1_000;

pub const DEFAULT_SUMMARY_WORKERS: usize = 2;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

//! Payerscope: a policy-document mining pipeline for payer provider portals
//!
//! This crate crawls allow-listed healthcare-payer portals breadth-first,
//! downloads candidate policy documents (PDF, HTML), extracts their text with
//! an engine fallback chain, and mines typed rule records (prior
//! authorization, timely filing, appeals, claims) with confidence scores and
//! geographic scope.

pub mod backend;
pub mod config;
pub mod crawl;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod pipeline;
pub mod rules;
pub mod sink;
pub mod url;

use thiserror::Error;

/// Main error type for payerscope operations
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Render error for {url}: {message}")]
    Render { url: String, message: String },

    #[error("Sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Extraction engine error: {0}")]
    Engine(#[from] extract::EngineError),

    #[error("Document backend error: {0}")]
    Backend(#[from] backend::BackendError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// A malformed pattern set is deliberately a configuration error: a broken
/// pattern silently under-extracts everything downstream, so the run must
/// abort before any network activity starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid rule pattern for {rule_type}: {message}")]
    InvalidPattern { rule_type: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Per-unit failure kinds counted by the orchestrator
///
/// Every variant maps to a "record and continue" path; none of these is
/// fatal to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Timeout, DNS failure, or HTTP >= 400
    Network,
    /// Dynamic-content rendering failed or no renderer was configured
    Render,
    /// Unexpected content type or size ceiling exceeded
    UnsupportedFormat,
    /// Both extraction engines failed a page
    Extraction,
}

/// Result type alias for payerscope operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, PayerProfile};
pub use rules::{CandidateRule, GeographicScope, Rule, RuleType};
pub use url::{extract_domain, is_allowed_domain, normalize_url};

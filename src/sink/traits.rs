use crate::config::PayerProfile;
use crate::rules::Rule;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// A document record ready for the catalog
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub url: String,
    pub found_on: String,
    pub anchor_text: String,
    pub depth: u32,
    pub content_type: String,
    pub byte_size: u64,
    pub fingerprint: String,
    pub relevance: f64,
    pub page_count: u32,
    pub unreadable: bool,
    pub used_fallback: bool,
    pub fetched_at: DateTime<Utc>,
}

/// Per-unit attempt outcomes recorded for the failure report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Fetched,
    Duplicate,
    Rejected,
    NetworkFailure,
    ExtractionFailure,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Fetched => "fetched",
            AttemptOutcome::Duplicate => "duplicate",
            AttemptOutcome::Rejected => "rejected",
            AttemptOutcome::NetworkFailure => "network_failure",
            AttemptOutcome::ExtractionFailure => "extraction_failure",
        }
    }
}

/// Persistence backend for crawl results
///
/// Implementations must be safe to call from several workers at once. All
/// methods are synchronous; callers on the async side go through
/// `spawn_blocking` when a call might contend.
pub trait Sink: Send + Sync {
    /// Opens a run record, returning its id
    fn begin_run(&self, config_hash: &str) -> SinkResult<i64>;

    /// Stamps a run finished
    fn finish_run(&self, run_id: i64) -> SinkResult<()>;

    /// Inserts or refreshes a payer, returning its id
    fn upsert_payer(&self, payer: &PayerProfile) -> SinkResult<i64>;

    /// Catalogs a fetched document, returning its id
    fn insert_document(
        &self,
        run_id: i64,
        payer_id: i64,
        document: &StoredDocument,
    ) -> SinkResult<i64>;

    /// Stores one accepted rule
    fn insert_rule(&self, document_id: i64, payer_id: i64, rule: &Rule) -> SinkResult<i64>;

    /// Records a per-URL attempt outcome
    fn record_attempt(
        &self,
        run_id: i64,
        url: &str,
        outcome: AttemptOutcome,
        detail: &str,
    ) -> SinkResult<()>;

    /// Links a duplicate URL to the fingerprint it repeated
    fn link_duplicate(&self, run_id: i64, url: &str, fingerprint: &str) -> SinkResult<()>;

    /// Stores the analysis backend's raw response for a document
    fn store_backend_payload(
        &self,
        document_id: i64,
        model_id: &str,
        payload: &str,
    ) -> SinkResult<()>;

    /// All fingerprints ever cataloged, for cross-run deduplication
    fn known_fingerprints(&self) -> SinkResult<Vec<String>>;

    fn document_count(&self) -> SinkResult<u64>;

    fn rule_count(&self) -> SinkResult<u64>;
}

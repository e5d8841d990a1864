//! Document fetching and duplicate suppression
//!
//! Downloads discovered candidates with size and content-type gates, then
//! fingerprints the body with SHA-256. A fingerprint seen before, in this
//! run or any prior run recorded in the sink, short-circuits the rest of
//! the pipeline for that document.

use crate::config::Config;
use crate::crawl::{DiscoveredDocument, RateLimiter};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use url::Url;

/// A successfully downloaded document
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: Url,
    pub found_on: Url,
    pub anchor_text: String,
    pub depth: u32,
    pub relevance: f64,
    /// Content-Type header value, lowercased
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of the body
    pub fingerprint: String,
    pub fetched_at: DateTime<Utc>,
}

/// Why a download was rejected without an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Larger than the configured ceiling; never truncated
    Oversized { bytes: u64 },
    /// Smaller than the floor, likely an error page or stub
    Undersized { bytes: u64 },
    /// Content type outside the accept list
    UnsupportedType { content_type: String },
}

/// Outcome of one fetch attempt
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(Box<FetchedDocument>),
    /// Body fingerprint already seen; extraction and mining are skipped
    Duplicate { fingerprint: String },
    Rejected(RejectReason),
    Failed { message: String },
}

/// Shared set of document fingerprints, preloaded from the sink's catalog
///
/// Shared across all fetch workers in a run; `first_seen` is a single
/// insert-if-absent so two workers racing on the same fingerprint agree on
/// which one proceeds.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    seen: Mutex<HashSet<String>>,
}

impl FingerprintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index preloaded with fingerprints from prior runs
    pub fn preloaded(known: impl IntoIterator<Item = String>) -> Self {
        Self {
            seen: Mutex::new(known.into_iter().collect()),
        }
    }

    /// Records a fingerprint, returning true only for its first appearance
    pub fn first_seen(&self, fingerprint: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(fingerprint.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes the hex SHA-256 fingerprint of a document body
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Downloads document candidates under the run's politeness and size policy
pub struct DocumentFetcher {
    client: reqwest::Client,
    config: Arc<Config>,
    limiter: Arc<RateLimiter>,
    fingerprints: Arc<FingerprintIndex>,
    seen_urls: Mutex<HashSet<String>>,
}

impl DocumentFetcher {
    pub fn new(
        client: reqwest::Client,
        config: Arc<Config>,
        limiter: Arc<RateLimiter>,
        fingerprints: Arc<FingerprintIndex>,
    ) -> Self {
        Self {
            client,
            config,
            limiter,
            fingerprints,
            seen_urls: Mutex::new(HashSet::new()),
        }
    }

    /// Fetches one discovered document
    ///
    /// Retries exactly once on a network failure after a short pause. Every
    /// outcome is data; the orchestrator records it and moves on.
    pub async fn fetch(&self, doc: &DiscoveredDocument) -> FetchOutcome {
        // the same URL can be discovered from several pages in one run
        {
            let mut seen = self.seen_urls.lock().unwrap_or_else(|e| e.into_inner());
            if !seen.insert(doc.url.as_str().to_string()) {
                return FetchOutcome::Duplicate {
                    fingerprint: String::new(),
                };
            }
        }

        let domain = match crate::url::extract_domain(&doc.url) {
            Some(d) => d,
            None => {
                return FetchOutcome::Failed {
                    message: "Document URL has no host".to_string(),
                }
            }
        };

        let mut last_error = String::new();
        for attempt in 0..2 {
            if attempt > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }

            self.limiter.acquire(&domain).await;
            match self.download(&doc.url).await {
                Ok(outcome) => {
                    self.limiter.record_outcome(&domain, true).await;
                    return self.finish(doc, outcome);
                }
                Err(message) => {
                    self.limiter.record_outcome(&domain, false).await;
                    warn!(url = %doc.url, attempt = attempt, error = %message, "Download failed");
                    last_error = message;
                }
            }
        }

        FetchOutcome::Failed {
            message: last_error,
        }
    }

    async fn download(&self, url: &Url) -> Result<(String, Vec<u8>), String> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(std::time::Duration::from_secs(
                self.config.fetcher.download_timeout,
            ))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok((content_type, bytes.to_vec()))
    }

    fn finish(&self, doc: &DiscoveredDocument, (content_type, bytes): (String, Vec<u8>)) -> FetchOutcome {
        let allowed = self
            .config
            .fetcher
            .allowed_content_types
            .iter()
            .any(|t| content_type.starts_with(t.as_str()));
        if !allowed {
            return FetchOutcome::Rejected(RejectReason::UnsupportedType { content_type });
        }

        let size = bytes.len() as u64;
        if size > self.config.fetcher.max_document_bytes {
            return FetchOutcome::Rejected(RejectReason::Oversized { bytes: size });
        }
        if size < self.config.fetcher.min_document_bytes {
            return FetchOutcome::Rejected(RejectReason::Undersized { bytes: size });
        }

        let fp = fingerprint(&bytes);
        if !self.fingerprints.first_seen(&fp) {
            debug!(url = %doc.url, fingerprint = %fp, "Duplicate document body");
            return FetchOutcome::Duplicate { fingerprint: fp };
        }

        FetchOutcome::Fetched(Box::new(FetchedDocument {
            url: doc.url.clone(),
            found_on: doc.found_on.clone(),
            anchor_text: doc.anchor_text.clone(),
            depth: doc.depth,
            relevance: doc.relevance,
            content_type,
            bytes,
            fingerprint: fp,
            fetched_at: Utc::now(),
        }))
    }
}

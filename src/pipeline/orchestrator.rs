use crate::backend::DocumentBackend;
use crate::config::{Config, PayerProfile};
use crate::crawl::{build_http_client, Crawler, DiscoveredDocument, DynamicRenderer, RateLimiter};
use crate::extract::ContentExtractor;
use crate::fetch::{DocumentFetcher, FetchOutcome, FingerprintIndex, RejectReason};
use crate::filter::QualityFilter;
use crate::pipeline::{PayerSummary, RunSummary};
use crate::rules::{CandidateRule, PatternLibrary, Rule, RuleEngine};
use crate::sink::{AttemptOutcome, Sink, StoredDocument};
use crate::{FailureKind, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Buffered documents between discovery and the fetch workers
const CHANNEL_CAPACITY: usize = 32;

/// Runs the whole pipeline: discovery, fetching, extraction, rule mining,
/// filtering, and persistence
///
/// Payers run concurrently; within a payer, a bounded worker pool overlaps
/// document processing with discovery. Per-unit failures are counted and
/// recorded in the sink; only configuration and sink-open problems abort
/// a run.
pub struct Orchestrator {
    config: Arc<Config>,
    config_hash: String,
    sink: Arc<dyn Sink>,
    engine: Arc<RuleEngine>,
    renderer: Option<Arc<dyn DynamicRenderer>>,
    backend: Option<Arc<dyn DocumentBackend>>,
}

impl Orchestrator {
    /// Builds an orchestrator, compiling the rule patterns up front
    ///
    /// A malformed pattern aborts here, before any network activity.
    pub fn new(config: Config, config_hash: String, sink: Arc<dyn Sink>) -> Result<Self> {
        let library = PatternLibrary::compile(&config.patterns)?;
        let engine = Arc::new(RuleEngine::new(library, &config.extraction));
        Ok(Self {
            config: Arc::new(config),
            config_hash,
            sink,
            engine,
            renderer: None,
            backend: None,
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DynamicRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn DocumentBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Runs the pipeline for every configured payer
    pub async fn run(&self, cancel: watch::Receiver<bool>) -> Result<RunSummary> {
        let run_id = self.sink.begin_run(&self.config_hash)?;

        let known = self.sink.known_fingerprints()?;
        info!(known = known.len(), "Loaded fingerprint catalog");
        let fingerprints = Arc::new(FingerprintIndex::preloaded(known));

        let client = build_http_client(&self.config.user_agent, self.config.crawler.request_timeout)?;
        let mut limiter = RateLimiter::new(self.config.crawler.min_request_interval);
        for payer in &self.config.payer {
            if let Some(ms) = payer.rate_limit_override {
                limiter.set_override(&payer.domain, ms);
            }
        }
        let limiter = Arc::new(limiter);

        // backend probed once; an unreachable service is a warning, not an error
        let backend = match &self.backend {
            Some(b) if b.ready().await => Some(b.clone()),
            Some(_) => {
                warn!("Document backend not ready, unreadable documents will be skipped");
                None
            }
            None => None,
        };

        let ctx = PayerContext {
            config: self.config.clone(),
            sink: self.sink.clone(),
            crawler: Arc::new(Crawler::new(
                client.clone(),
                self.config.clone(),
                limiter.clone(),
                self.renderer.clone(),
            )),
            fetcher: Arc::new(DocumentFetcher::new(
                client,
                self.config.clone(),
                limiter,
                fingerprints,
            )),
            extractor: Arc::new(ContentExtractor::new(self.config.extraction.clone())),
            engine: self.engine.clone(),
            backend,
        };

        let mut payers = self.config.payer.clone();
        payers.sort_by_key(|p| p.priority);

        let started = std::time::Instant::now();
        let mut tasks = JoinSet::new();
        for payer in payers {
            let ctx = ctx.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move { process_payer(ctx, payer, run_id, cancel).await });
        }

        let mut summaries = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(summary) => summaries.push(summary),
                Err(e) => error!(error = %e, "Payer task panicked"),
            }
        }
        summaries.sort_by(|a, b| a.payer.cmp(&b.payer));

        self.sink.finish_run(run_id)?;

        Ok(RunSummary {
            run_id,
            config_hash: self.config_hash.clone(),
            duration: started.elapsed(),
            payers: summaries,
        })
    }
}

/// Everything a payer task needs, cheap to clone
#[derive(Clone)]
struct PayerContext {
    config: Arc<Config>,
    sink: Arc<dyn Sink>,
    crawler: Arc<Crawler>,
    fetcher: Arc<DocumentFetcher>,
    extractor: Arc<ContentExtractor>,
    engine: Arc<RuleEngine>,
    backend: Option<Arc<dyn DocumentBackend>>,
}

/// Result of one document's pass through fetch/extract/mine
enum Processed {
    Stored {
        document: StoredDocument,
        candidates: Vec<CandidateRule>,
        /// (model_id, raw response) when the analysis backend produced the text
        backend_payload: Option<(String, String)>,
    },
    Duplicate {
        url: String,
        fingerprint: String,
    },
    Rejected {
        url: String,
        detail: String,
    },
    FetchFailed {
        url: String,
        message: String,
    },
    ExtractFailed {
        url: String,
        message: String,
    },
}

async fn process_payer(
    ctx: PayerContext,
    payer: PayerProfile,
    run_id: i64,
    cancel: watch::Receiver<bool>,
) -> PayerSummary {
    let mut summary = PayerSummary::new(payer.name.clone());
    let mut filter = QualityFilter::new(ctx.config.filter.clone());

    let payer_id = match ctx.sink.upsert_payer(&payer) {
        Ok(id) => id,
        Err(e) => {
            error!(payer = %payer.name, error = %e, "Failed to register payer");
            return summary;
        }
    };

    let (doc_tx, doc_rx) = mpsc::channel::<DiscoveredDocument>(CHANNEL_CAPACITY);
    let discover = {
        let crawler = ctx.crawler.clone();
        let payer = payer.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { crawler.discover(&payer, doc_tx, cancel).await })
    };

    let (out_tx, mut out_rx) = mpsc::channel::<Processed>(CHANNEL_CAPACITY);
    let dispatcher = {
        let ctx = ctx.clone();
        let cancel = cancel.clone();
        let semaphore = Arc::new(Semaphore::new(
            ctx.config.crawler.max_concurrent_documents as usize,
        ));
        let mut doc_rx = doc_rx;
        tokio::spawn(async move {
            let mut workers = JoinSet::new();
            while let Some(doc) = doc_rx.recv().await {
                // stop launching new fetches on cancellation; workers
                // already in flight run to completion
                if *cancel.borrow() {
                    break;
                }
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => break,
                };
                let ctx = ctx.clone();
                let tx = out_tx.clone();
                workers.spawn(async move {
                    let item = process_document(&ctx, &doc).await;
                    let _ = tx.send(item).await;
                    drop(permit);
                });
            }
            while workers.join_next().await.is_some() {}
            // out_tx clones are all gone now; the consumer loop ends
        })
    };

    while let Some(item) = out_rx.recv().await {
        match item {
            Processed::Stored {
                document,
                candidates,
                backend_payload,
            } => {
                summary.counts.documents_fetched += 1;
                if document.unreadable {
                    summary.counts.unreadable += 1;
                }
                record_attempt(&ctx, run_id, &document.url, AttemptOutcome::Fetched, "");

                let doc_id = match ctx.sink.insert_document(run_id, payer_id, &document) {
                    Ok(id) => id,
                    Err(e) => {
                        error!(url = %document.url, error = %e, "Failed to catalog document");
                        continue;
                    }
                };

                if let Some((model_id, payload)) = backend_payload {
                    if let Err(e) = ctx.sink.store_backend_payload(doc_id, &model_id, &payload) {
                        error!(url = %document.url, error = %e, "Failed to store backend payload");
                    }
                }

                for candidate in candidates {
                    summary.counts.candidate_rules += 1;
                    match filter.check(&payer.name, &candidate) {
                        Ok(()) => {
                            let rule = Rule::from_candidate(
                                candidate,
                                &payer.name,
                                &document.url,
                                &document.fingerprint,
                            );
                            match ctx.sink.insert_rule(doc_id, payer_id, &rule) {
                                Ok(_) => {
                                    summary.counts.accepted_rules += 1;
                                    *summary.rules_by_type.entry(rule.rule_type).or_insert(0) += 1;
                                }
                                Err(e) => {
                                    error!(url = %document.url, error = %e, "Failed to store rule")
                                }
                            }
                        }
                        Err(reason) => {
                            debug!(url = %document.url, reason = ?reason, "Rule dropped")
                        }
                    }
                }
            }
            Processed::Duplicate { url, fingerprint } => {
                summary.counts.duplicates_skipped += 1;
                if !fingerprint.is_empty() {
                    if let Err(e) = ctx.sink.link_duplicate(run_id, &url, &fingerprint) {
                        error!(url = %url, error = %e, "Failed to link duplicate");
                    }
                }
                record_attempt(&ctx, run_id, &url, AttemptOutcome::Duplicate, &fingerprint);
            }
            Processed::Rejected { url, detail } => {
                summary.counts.rejected += 1;
                summary.failures.record(FailureKind::UnsupportedFormat);
                record_attempt(&ctx, run_id, &url, AttemptOutcome::Rejected, &detail);
            }
            Processed::FetchFailed { url, message } => {
                summary.failures.record(FailureKind::Network);
                record_attempt(&ctx, run_id, &url, AttemptOutcome::NetworkFailure, &message);
            }
            Processed::ExtractFailed { url, message } => {
                summary.failures.record(FailureKind::Extraction);
                record_attempt(
                    &ctx,
                    run_id,
                    &url,
                    AttemptOutcome::ExtractionFailure,
                    &message,
                );
            }
        }
    }

    match discover.await {
        Ok(Ok(stats)) => {
            summary.counts.pages_visited = stats.pages_visited;
            summary.counts.documents_discovered = stats.documents_found;
            summary.failures.network += stats.network_failures;
            summary.failures.render += stats.render_failures;
        }
        Ok(Err(e)) => error!(payer = %payer.name, error = %e, "Discovery failed"),
        Err(e) => error!(payer = %payer.name, error = %e, "Discovery task panicked"),
    }
    if let Err(e) = dispatcher.await {
        error!(payer = %payer.name, error = %e, "Worker dispatcher panicked");
    }

    summary
}

fn record_attempt(ctx: &PayerContext, run_id: i64, url: &str, outcome: AttemptOutcome, detail: &str) {
    if let Err(e) = ctx.sink.record_attempt(run_id, url, outcome, detail) {
        error!(url = %url, error = %e, "Failed to record attempt");
    }
}

/// Fetches, extracts, and mines one discovered document
async fn process_document(ctx: &PayerContext, doc: &DiscoveredDocument) -> Processed {
    let fetched = match ctx.fetcher.fetch(doc).await {
        FetchOutcome::Fetched(f) => f,
        FetchOutcome::Duplicate { fingerprint } => {
            return Processed::Duplicate {
                url: doc.url.to_string(),
                fingerprint,
            }
        }
        FetchOutcome::Rejected(reason) => {
            let detail = match reason {
                RejectReason::Oversized { bytes } => format!("oversized: {} bytes", bytes),
                RejectReason::Undersized { bytes } => format!("undersized: {} bytes", bytes),
                RejectReason::UnsupportedType { content_type } => {
                    format!("unsupported type: {}", content_type)
                }
            };
            return Processed::Rejected {
                url: doc.url.to_string(),
                detail,
            };
        }
        FetchOutcome::Failed { message } => {
            return Processed::FetchFailed {
                url: doc.url.to_string(),
                message,
            }
        }
    };

    // extraction is CPU-bound and untrusted input can make the PDF engines
    // crawl; run it off the async workers with a hard per-document timeout
    let extracted = {
        let extractor = ctx.extractor.clone();
        let bytes = fetched.bytes.clone();
        let content_type = fetched.content_type.clone();
        let attempt = tokio::time::timeout(
            std::time::Duration::from_secs(ctx.config.extraction.extraction_timeout),
            tokio::task::spawn_blocking(move || extractor.extract(&bytes, &content_type)),
        )
        .await;

        match attempt {
            Ok(Ok(Ok(extracted))) => extracted,
            Ok(Ok(Err(e))) => {
                return Processed::ExtractFailed {
                    url: fetched.url.to_string(),
                    message: e.to_string(),
                }
            }
            Ok(Err(e)) => {
                return Processed::ExtractFailed {
                    url: fetched.url.to_string(),
                    message: format!("extraction task failed: {}", e),
                }
            }
            Err(_) => {
                return Processed::ExtractFailed {
                    url: fetched.url.to_string(),
                    message: format!(
                        "extraction timed out after {}s",
                        ctx.config.extraction.extraction_timeout
                    ),
                }
            }
        }
    };

    for warning in &extracted.warnings {
        debug!(url = %fetched.url, warning = %warning, "Extraction warning");
    }

    let mut unreadable = extracted.unreadable;
    let mut used_fallback = extracted.used_fallback;
    let mut page_count = extracted.pages.len() as u32;

    let mut candidates = ctx.engine.mine_document(&extracted);
    let mut backend_payload = None;

    // a locally unreadable document gets one more chance through the
    // analysis backend; its text is treated like fallback-engine text
    if unreadable {
        if let Some(backend) = &ctx.backend {
            match backend.analyze(&fetched.bytes, &fetched.content_type).await {
                Ok(analysis) => {
                    info!(url = %fetched.url, model = %analysis.model_id, "Backend recovered unreadable document");
                    unreadable = false;
                    used_fallback = true;
                    page_count = analysis.pages.len() as u32;
                    candidates = analysis
                        .pages
                        .iter()
                        .enumerate()
                        .flat_map(|(i, text)| ctx.engine.mine_page(text, i as u32 + 1, true))
                        .collect();
                    backend_payload = Some((analysis.model_id, analysis.raw));
                }
                Err(e) => {
                    warn!(url = %fetched.url, error = %e, "Backend analysis failed");
                }
            }
        }
    }

    Processed::Stored {
        document: StoredDocument {
            url: fetched.url.to_string(),
            found_on: fetched.found_on.to_string(),
            anchor_text: fetched.anchor_text.clone(),
            depth: fetched.depth,
            content_type: fetched.content_type.clone(),
            byte_size: fetched.bytes.len() as u64,
            fingerprint: fetched.fingerprint.clone(),
            relevance: fetched.relevance,
            page_count,
            unreadable,
            used_fallback,
            fetched_at: fetched.fetched_at,
        },
        candidates,
        backend_payload,
    }
}

use crate::config::{Config, PayerProfile};
use crate::crawl::{
    classify_anchor, extract_anchors, fetch_page, needs_render, url_relevance, AnchorClass,
    DiscoveredDocument, DynamicRenderer, Frontier, MimeGuess, PageFetch, RateLimiter,
};
use crate::url::normalize_url;
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use url::Url;

/// Redirect hops followed per page before giving up
const MAX_REDIRECTS: u32 = 5;

/// Counters for one payer's discovery pass
#[derive(Debug, Default, Clone)]
pub struct DiscoveryStats {
    pub pages_visited: u32,
    pub documents_found: u32,
    pub network_failures: u32,
    pub render_failures: u32,
    pub low_value_dropped: u32,
}

/// Breadth-first portal crawler for a single payer
///
/// Document candidates stream out through an mpsc channel as they are found,
/// so fetching overlaps discovery instead of waiting for the whole crawl.
pub struct Crawler {
    client: reqwest::Client,
    config: Arc<Config>,
    limiter: Arc<RateLimiter>,
    renderer: Option<Arc<dyn DynamicRenderer>>,
}

impl Crawler {
    pub fn new(
        client: reqwest::Client,
        config: Arc<Config>,
        limiter: Arc<RateLimiter>,
        renderer: Option<Arc<dyn DynamicRenderer>>,
    ) -> Self {
        Self {
            client,
            config,
            limiter,
            renderer,
        }
    }

    /// Crawls one payer's portal, streaming document candidates to `tx`
    ///
    /// Runs until the frontier empties, the page budget is exhausted, the
    /// receiver side hangs up, or cancellation is signalled. Per-page
    /// failures are counted and crawling continues.
    pub async fn discover(
        &self,
        payer: &PayerProfile,
        tx: mpsc::Sender<DiscoveredDocument>,
        cancel: watch::Receiver<bool>,
    ) -> Result<DiscoveryStats> {
        let allowed = vec![payer.domain.clone(), format!("*.{}", payer.domain)];
        let mut frontier = Frontier::new(
            allowed,
            self.config.crawler.max_depth,
            self.config.crawler.max_domain_requests,
        );

        for seed in payer.seed_urls() {
            match normalize_url(&seed) {
                Ok(url) => {
                    frontier.push(url, 0);
                }
                Err(e) => {
                    // seeds are validated at config load, but overrides may race
                    warn!(payer = %payer.name, seed = %seed, error = %e, "Skipping bad seed");
                }
            }
        }

        // One probe per run; an unreachable renderer downgrades every
        // dynamic page to a render failure instead of failing the crawl.
        let renderer = match &self.renderer {
            Some(r) if r.ready().await => Some(r.clone()),
            Some(_) => {
                warn!(payer = %payer.name, "Renderer not ready, dynamic pages will be skipped");
                None
            }
            None => None,
        };

        let mut stats = DiscoveryStats::default();
        // each normalized candidate URL is yielded once, no matter how many
        // anchors reference it
        let mut emitted: HashSet<Url> = HashSet::new();

        while let Some(entry) = frontier.pop() {
            if *cancel.borrow() {
                info!(payer = %payer.name, "Discovery cancelled");
                break;
            }

            if stats.pages_visited >= self.config.crawler.page_visit_budget {
                info!(
                    payer = %payer.name,
                    budget = self.config.crawler.page_visit_budget,
                    "Page visit budget exhausted"
                );
                break;
            }

            let domain = match crate::url::extract_domain(&entry.url) {
                Some(d) => d,
                None => continue,
            };

            self.limiter.acquire(&domain).await;
            let fetch = fetch_page(&self.client, &self.config, &entry.url, MAX_REDIRECTS).await;
            stats.pages_visited += 1;
            self.limiter.record_outcome(&domain, !fetch.is_failure()).await;

            match fetch {
                PageFetch::Success { body, final_url } => {
                    let html = if needs_render(&body) {
                        match &renderer {
                            Some(r) => match r.render(&final_url).await {
                                Ok(rendered) => rendered,
                                Err(e) => {
                                    warn!(url = %final_url, error = %e, "Render failed");
                                    stats.render_failures += 1;
                                    body
                                }
                            },
                            None => {
                                stats.render_failures += 1;
                                body
                            }
                        }
                    } else {
                        body
                    };

                    if !self
                        .process_page(
                            &html,
                            &final_url,
                            entry.depth,
                            &mut frontier,
                            &mut emitted,
                            &tx,
                            &mut stats,
                        )
                        .await
                    {
                        // receiver hung up, nothing left to discover for
                        break;
                    }
                }
                PageFetch::NotHtml { content_type } => {
                    // the "page" is itself a document served without a flag
                    debug!(url = %entry.url, content_type = %content_type, "Non-HTML page, treating as document");
                    if !self
                        .emit_document(
                            &entry.url,
                            &entry.url,
                            "",
                            entry.depth,
                            &mut emitted,
                            &tx,
                            &mut stats,
                        )
                        .await
                    {
                        break;
                    }
                }
                PageFetch::RedirectedOffSite { location } => {
                    debug!(url = %entry.url, location = %location, "Dropped off-site redirect");
                }
                PageFetch::ClientError { status } => {
                    debug!(url = %entry.url, status = status, "Client error");
                }
                PageFetch::ServerError { status } => {
                    warn!(url = %entry.url, status = status, "Server error");
                    stats.network_failures += 1;
                }
                PageFetch::NetworkError { message } => {
                    warn!(url = %entry.url, error = %message, "Network error");
                    stats.network_failures += 1;
                }
            }
        }

        info!(
            payer = %payer.name,
            pages = stats.pages_visited,
            documents = stats.documents_found,
            "Discovery complete"
        );
        Ok(stats)
    }

    /// Parses a page's anchors, routing documents out and navigation into
    /// the frontier; returns false when the document receiver hung up
    async fn process_page(
        &self,
        html: &str,
        page_url: &Url,
        depth: u32,
        frontier: &mut Frontier,
        emitted: &mut HashSet<Url>,
        tx: &mpsc::Sender<DiscoveredDocument>,
        stats: &mut DiscoveryStats,
    ) -> bool {
        for anchor in extract_anchors(html, page_url) {
            match classify_anchor(&anchor, &self.config.crawler) {
                AnchorClass::Document(_) => {
                    if !self
                        .emit_document(&anchor.url, page_url, &anchor.text, depth, emitted, tx, stats)
                        .await
                    {
                        return false;
                    }
                }
                AnchorClass::Navigation => {
                    frontier.push(anchor.url, depth + 1);
                }
            }
        }
        true
    }

    async fn emit_document(
        &self,
        url: &Url,
        found_on: &Url,
        anchor_text: &str,
        depth: u32,
        emitted: &mut HashSet<Url>,
        tx: &mpsc::Sender<DiscoveredDocument>,
        stats: &mut DiscoveryStats,
    ) -> bool {
        if !emitted.insert(url.clone()) {
            return true;
        }

        let relevance =
            url_relevance(url, anchor_text, &self.config.filter.low_value_url_patterns);
        if relevance == 0.0 {
            stats.low_value_dropped += 1;
            return true;
        }

        let doc = DiscoveredDocument {
            url: url.clone(),
            found_on: found_on.clone(),
            anchor_text: anchor_text.to_string(),
            depth,
            mime_guess: MimeGuess::from_url(url),
            relevance,
        };

        stats.documents_found += 1;
        tx.send(doc).await.is_ok()
    }
}

use serde::Deserialize;

/// Main configuration structure for a payerscope run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub payer: Vec<PayerProfile>,
    #[serde(default)]
    pub patterns: PatternConfig,
    #[serde(default)]
    pub backend: Option<BackendConfig>,
}

impl Config {
    /// Returns the run's domain allow-list: every payer's domain plus a
    /// wildcard for its subdomains.
    pub fn allowed_domains(&self) -> Vec<String> {
        let mut allowed = Vec::with_capacity(self.payer.len() * 2);
        for payer in &self.payer {
            allowed.push(payer.domain.clone());
            allowed.push(format!("*.{}", payer.domain));
        }
        allowed
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum BFS depth from seed URLs
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Global page-visit budget per payer; discovery stops when either the
    /// frontier empties or this budget is exhausted
    #[serde(rename = "page-visit-budget")]
    pub page_visit_budget: u32,

    /// Maximum number of concurrent document fetch/extract workers
    #[serde(rename = "max-concurrent-documents")]
    pub max_concurrent_documents: u32,

    /// Minimum time between requests to the same domain (milliseconds)
    #[serde(rename = "min-request-interval")]
    pub min_request_interval: u64,

    /// Maximum number of page visits per domain
    #[serde(rename = "max-domain-requests")]
    pub max_domain_requests: u32,

    /// Per-request timeout for page fetches (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// File extensions treated as document candidates
    #[serde(rename = "document-extensions", default = "default_document_extensions")]
    pub document_extensions: Vec<String>,

    /// Anchor-text vocabulary that marks a link as a document candidate
    /// even without a document extension
    #[serde(rename = "anchor-vocabulary", default = "default_anchor_vocabulary")]
    pub anchor_vocabulary: Vec<String>,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_document_extensions() -> Vec<String> {
    ["pdf", "doc", "docx", "xls", "xlsx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_anchor_vocabulary() -> Vec<String> {
    [
        "manual",
        "guide",
        "prior auth",
        "authorization",
        "timely filing",
        "filing",
        "appeals",
        "provider",
        "policy",
        "billing",
        "reimbursement",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the full user-agent string sent with every request
    pub fn agent_string(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Document fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Size ceiling for a single document; oversized downloads are
    /// rejected, never truncated
    #[serde(rename = "max-document-bytes")]
    pub max_document_bytes: u64,

    /// Downloads smaller than this are rejected as error pages or stubs
    #[serde(rename = "min-document-bytes", default = "default_min_document_bytes")]
    pub min_document_bytes: u64,

    /// Content-type prefixes accepted for documents
    #[serde(rename = "allowed-content-types", default = "default_content_types")]
    pub allowed_content_types: Vec<String>,

    /// Per-download timeout (seconds)
    #[serde(rename = "download-timeout", default = "default_download_timeout")]
    pub download_timeout: u64,
}

fn default_min_document_bytes() -> u64 {
    1000
}

fn default_content_types() -> Vec<String> {
    [
        "application/pdf",
        "application/octet-stream",
        "text/html",
        "application/msword",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_download_timeout() -> u64 {
    60
}

/// Content extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Documents whose total extracted character count falls below this
    /// threshold are flagged unreadable (scanned or image-only)
    #[serde(rename = "min-document-chars", default = "default_min_document_chars")]
    pub min_document_chars: usize,

    /// Confidence ceiling applied to rules extracted from fallback-engine text
    #[serde(
        rename = "fallback-confidence-cap",
        default = "default_fallback_confidence_cap"
    )]
    pub fallback_confidence_cap: f64,

    /// Per-document extraction timeout (seconds)
    #[serde(rename = "extraction-timeout", default = "default_extraction_timeout")]
    pub extraction_timeout: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_document_chars: default_min_document_chars(),
            fallback_confidence_cap: default_fallback_confidence_cap(),
            extraction_timeout: default_extraction_timeout(),
        }
    }
}

fn default_extraction_timeout() -> u64 {
    60
}

fn default_min_document_chars() -> usize {
    500
}

fn default_fallback_confidence_cap() -> f64 {
    0.75
}

/// Quality filter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Rules scoring below this floor are dropped
    #[serde(rename = "confidence-floor", default = "default_confidence_floor")]
    pub confidence_floor: f64,

    /// Token-overlap similarity above which a match is considered
    /// boilerplate and dropped
    #[serde(
        rename = "similarity-threshold",
        default = "default_similarity_threshold"
    )]
    pub similarity_threshold: f64,

    /// Boilerplate signatures compared against candidate rule text
    #[serde(
        rename = "boilerplate-signatures",
        default = "default_boilerplate_signatures"
    )]
    pub boilerplate_signatures: Vec<String>,

    /// URL substrings that mark a discovered document as low-value
    #[serde(
        rename = "low-value-url-patterns",
        default = "default_low_value_url_patterns"
    )]
    pub low_value_url_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            confidence_floor: default_confidence_floor(),
            similarity_threshold: default_similarity_threshold(),
            boilerplate_signatures: default_boilerplate_signatures(),
            low_value_url_patterns: default_low_value_url_patterns(),
        }
    }
}

fn default_confidence_floor() -> f64 {
    0.2
}

fn default_similarity_threshold() -> f64 {
    0.8
}

fn default_boilerplate_signatures() -> Vec<String> {
    [
        "this privacy policy describes how we collect use and share your personal information",
        "we use cookies and similar technologies to improve your browsing experience",
        "by using this website you agree to our terms of use and conditions",
        "sign up for our newsletter to receive the latest news and special offers",
        "all rights reserved this material may not be reproduced without permission",
        "lorem ipsum dolor sit amet consectetur adipiscing elit",
        "this page intentionally left blank",
        "draft not for distribution",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_low_value_url_patterns() -> Vec<String> {
    [
        "privacy-policy",
        "privacy_policy",
        "terms-of-use",
        "terms_of_use",
        "legal-notice",
        "marketing",
        "brochure",
        "newsletter",
        "press-release",
        "annual-report",
        "financial-report",
        "sample",
        "template",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite sink database
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A payer portal to crawl
///
/// Immutable per run; the orchestrator never mutates profiles.
#[derive(Debug, Clone, Deserialize)]
pub struct PayerProfile {
    /// Payer display name ("United Healthcare")
    pub name: String,

    /// Root domain; the allow-list covers this domain and its subdomains
    pub domain: String,

    /// Known or guessed provider-portal URL, used as the crawl seed
    #[serde(rename = "portal-url")]
    pub portal_url: String,

    /// Crawl priority tier; lower tiers are crawled first
    #[serde(default)]
    pub priority: u8,

    /// Per-domain override of the minimum inter-request interval (ms)
    #[serde(rename = "rate-limit-override")]
    pub rate_limit_override: Option<u64>,

    /// Additional seed URLs beyond the portal root
    #[serde(default)]
    pub seeds: Vec<String>,
}

impl PayerProfile {
    /// All seed URLs for this payer: the portal URL plus extras
    pub fn seed_urls(&self) -> Vec<String> {
        let mut seeds = vec![self.portal_url.clone()];
        seeds.extend(self.seeds.iter().cloned());
        seeds
    }
}

/// Rule-type pattern lists, represented as data so adding a rule type is a
/// configuration change validated at load time
#[derive(Debug, Clone, Deserialize)]
pub struct PatternConfig {
    #[serde(
        rename = "prior-authorization",
        default = "default_prior_auth_patterns"
    )]
    pub prior_authorization: Vec<String>,

    #[serde(rename = "timely-filing", default = "default_timely_filing_patterns")]
    pub timely_filing: Vec<String>,

    #[serde(default = "default_appeals_patterns")]
    pub appeals: Vec<String>,

    #[serde(default = "default_claims_patterns")]
    pub claims: Vec<String>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            prior_authorization: default_prior_auth_patterns(),
            timely_filing: default_timely_filing_patterns(),
            appeals: default_appeals_patterns(),
            claims: default_claims_patterns(),
        }
    }
}

fn default_prior_auth_patterns() -> Vec<String> {
    [
        r"prior[ -]?authorization",
        r"pre-?authorization",
        r"authorization (?:is )?required",
        r"must obtain (?:prior )?approval",
        r"medical necessity review",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_timely_filing_patterns() -> Vec<String> {
    [
        r"timely filing",
        r"filing deadline",
        r"claims? must be (?:submitted|received|filed) within",
        r"submission deadline",
        r"filing limit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_appeals_patterns() -> Vec<String> {
    [
        r"appeals? process",
        r"appeal within",
        r"grievance procedure",
        r"dispute resolution",
        r"reconsideration request",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_claims_patterns() -> Vec<String> {
    [
        r"claims? submission",
        r"clean claims?",
        r"billing guidelines",
        r"reimbursement polic(?:y|ies)",
        r"claims? processing",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Optional high-accuracy document-understanding backend
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base endpoint of the analysis service
    pub endpoint: String,

    /// API key sent as a bearer token
    #[serde(rename = "api-key")]
    pub api_key: String,
}

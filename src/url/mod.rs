//! URL handling for the portal crawler
//!
//! Provides URL normalization, domain extraction, and allow-list matching.
//! Normalized URLs are the keys of the crawler's visited-set, so every URL
//! must pass through [`normalize_url`] before being tested against it.

mod domain;
mod normalize;

pub use domain::extract_domain;
pub use normalize::normalize_url;

/// Checks if a domain matches an allow-list pattern
///
/// Two pattern forms are supported:
/// 1. Exact match: `"payer.example"` matches only `"payer.example"`
/// 2. Wildcard match: `"*.payer.example"` matches the bare domain and any
///    subdomain (`"providers.payer.example"`, `"files.docs.payer.example"`)
pub fn matches_pattern(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Checks a domain against the run's allow-list
///
/// A domain outside the allow-list is not an error anywhere in the pipeline;
/// the frontier silently drops such entries at push time.
pub fn is_allowed_domain(domain: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|p| matches_pattern(p, domain))
}

//! Quality filtering of mined rules
//!
//! The last gate before the sink: drops low-confidence spans, boilerplate
//! (privacy notices, cookie banners, copyright lines), and per-payer
//! near-duplicate rules. Comparison happens on normalized token sets, so
//! whitespace and punctuation differences between two extractions of the
//! same clause do not defeat deduplication.

use crate::config::FilterConfig;
use crate::rules::CandidateRule;
use std::collections::{HashMap, HashSet};

/// Common English words ignored during similarity comparison
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "is",
    "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "will", "with",
];

/// Why the filter dropped a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    BelowConfidenceFloor,
    Boilerplate,
    DuplicateRule,
}

/// Per-payer filter counters
#[derive(Debug, Default, Clone)]
pub struct FilterStats {
    pub accepted: u32,
    pub below_floor: u32,
    pub boilerplate: u32,
    pub duplicates: u32,
}

/// Stateful per-payer rule filter
///
/// One instance per payer per run; the seen-set it carries is what makes
/// cross-document deduplication work within that payer.
pub struct QualityFilter {
    config: FilterConfig,
    boilerplate_tokens: Vec<HashSet<String>>,
    seen: HashMap<String, HashSet<String>>,
    stats: FilterStats,
}

impl QualityFilter {
    pub fn new(config: FilterConfig) -> Self {
        let boilerplate_tokens = config
            .boilerplate_signatures
            .iter()
            .map(|sig| token_set(sig))
            .collect();
        Self {
            config,
            boilerplate_tokens,
            seen: HashMap::new(),
            stats: FilterStats::default(),
        }
    }

    /// Accepts or drops one candidate for one payer
    pub fn check(&mut self, payer: &str, candidate: &CandidateRule) -> Result<(), DropReason> {
        if candidate.confidence < self.config.confidence_floor {
            self.stats.below_floor += 1;
            return Err(DropReason::BelowConfidenceFloor);
        }

        let tokens = token_set(&candidate.text);

        for signature in &self.boilerplate_tokens {
            if jaccard(&tokens, signature) >= self.config.similarity_threshold {
                self.stats.boilerplate += 1;
                return Err(DropReason::Boilerplate);
            }
        }

        let normalized = normalize_text(&candidate.text);
        let payer_seen = self.seen.entry(payer.to_string()).or_default();
        if !payer_seen.insert(normalized) {
            self.stats.duplicates += 1;
            return Err(DropReason::DuplicateRule);
        }

        self.stats.accepted += 1;
        Ok(())
    }

    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }
}

/// Lowercases, strips punctuation, collapses whitespace, drops stopwords
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOPWORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn token_set(text: &str) -> HashSet<String> {
    normalize_text(text)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

/// Jaccard similarity of two token sets
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

use crate::config::ExtractionConfig;
use crate::extract::ExtractedDocument;
use crate::rules::geo::detect_scope;
use crate::rules::patterns::PatternLibrary;
use crate::rules::types::{CandidateRule, GeographicScope, RuleType};
use regex::Regex;

/// Spans shorter than this are discarded as pattern echoes with no
/// actionable content around them
const MIN_SPAN_CHARS: usize = 50;

/// Span length at which the length component of the confidence score
/// saturates
const SPAN_SATURATION_CHARS: usize = 500;

/// Bytes of surrounding page text consulted for geographic signals when
/// the span itself has none
const CONTEXT_PAD_CHARS: usize = 200;

/// Mines typed rule spans from extracted document text
///
/// For every pattern hit the engine grows a span forward to the next
/// paragraph break (blank line or a newline followed by a capital letter),
/// drops spans under the length floor, merges overlaps of the same type
/// into the widest span, and scores each survivor deterministically.
pub struct RuleEngine {
    library: PatternLibrary,
    quantity: Regex,
    fallback_confidence_cap: f64,
}

impl RuleEngine {
    pub fn new(library: PatternLibrary, extraction: &ExtractionConfig) -> Self {
        Self {
            library,
            // quantities with units are what make a span actionable:
            // day counts, dollar thresholds, percentages, CPT-style codes
            quantity: Regex::new(
                r"(?i)\b\d+\s*(?:calendar\s+|business\s+|working\s+)?(?:days?|months?|years?|hours?)\b|\b\d+\s*%|\$\s*\d[\d,]*(?:\.\d{2})?|\b\d{5}\b",
            )
            // static pattern, cannot fail
            .unwrap(),
            fallback_confidence_cap: extraction.fallback_confidence_cap,
        }
    }

    /// Mines all pages of an extracted document
    pub fn mine_document(&self, document: &ExtractedDocument) -> Vec<CandidateRule> {
        if document.unreadable {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for page in &document.pages {
            let fallback_page = page.engine != "lopdf" && page.engine != "html";
            candidates.extend(self.mine_page(&page.text, page.page_number, fallback_page));
        }
        candidates
    }

    /// Mines one page of text
    pub fn mine_page(&self, text: &str, page_number: u32, from_fallback: bool) -> Vec<CandidateRule> {
        let mut candidates = Vec::new();

        for (rule_type, patterns) in self.library.groups() {
            let mut spans: Vec<(usize, usize)> = Vec::new();
            for pattern in patterns {
                for hit in pattern.find_iter(text) {
                    let end = span_end(text, hit.end());
                    if end - hit.start() >= MIN_SPAN_CHARS {
                        spans.push((hit.start(), end));
                    }
                }
            }

            for (start, end) in merge_spans(spans) {
                let span = text[start..end].trim();
                let confidence = self.score(rule_type, span, from_fallback);

                // the span itself wins; surrounding text is consulted only
                // when the span carries no geographic signal of its own
                let mut scope = detect_scope(span);
                if scope == GeographicScope::Unspecified {
                    scope = detect_scope(context_window(text, start, end, CONTEXT_PAD_CHARS));
                }

                candidates.push(CandidateRule {
                    rule_type,
                    text: span.to_string(),
                    page_number,
                    confidence,
                    scope,
                });
            }
        }

        candidates
    }

    /// Deterministic confidence score in [0, 1]
    ///
    /// Weighted sum of keyword density (0.5), quantitative qualifiers (0.3),
    /// and span length (0.2). Text recovered by the fallback engine is
    /// capped; its spacing reconstruction is too lossy to trust fully.
    fn score(&self, rule_type: RuleType, span: &str, from_fallback: bool) -> f64 {
        let keyword_hits: usize = self
            .library
            .for_type(rule_type)
            .iter()
            .map(|p| p.find_iter(span).count())
            .sum();
        let keyword_component = (keyword_hits as f64 * 0.34).min(1.0);

        let quantity_hits = self.quantity.find_iter(span).count();
        let quantity_component = (quantity_hits as f64 * 0.5).min(1.0);

        let span_component = (span.len() as f64 / SPAN_SATURATION_CHARS as f64).min(1.0);

        let score = 0.5 * keyword_component + 0.3 * quantity_component + 0.2 * span_component;
        let score = score.clamp(0.0, 1.0);

        if from_fallback {
            score.min(self.fallback_confidence_cap)
        } else {
            score
        }
    }
}

/// Finds the end of a rule span: the next blank line, the next newline
/// followed by a capital letter (a heading or new clause), or end of text
fn span_end(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let mut j = i + 1;
            // swallow whitespace after the newline
            while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t' || bytes[j] == b'\r') {
                j += 1;
            }
            if j >= bytes.len() || bytes[j] == b'\n' || bytes[j].is_ascii_uppercase() {
                return i;
            }
            i = j;
        } else {
            i += 1;
        }
    }
    text.len()
}

/// The span plus up to `pad` bytes either side, clamped to char boundaries
fn context_window(text: &str, start: usize, end: usize, pad: usize) -> &str {
    let mut lo = start.saturating_sub(pad);
    while lo > 0 && !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + pad).min(text.len());
    while hi < text.len() && !text.is_char_boundary(hi) {
        hi += 1;
    }
    &text[lo..hi]
}

/// Merges overlapping or adjacent spans into the widest covering span
fn merge_spans(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    if spans.is_empty() {
        return spans;
    }
    spans.sort_unstable();

    let mut merged: Vec<(usize, usize)> = vec![spans[0]];
    for (start, end) in spans.into_iter().skip(1) {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

use chrono::{DateTime, Utc};
use std::fmt;

/// Categories of provider policy rules mined from documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    PriorAuthorization,
    TimelyFiling,
    Appeals,
    Claims,
    /// Catch-all for rules from the analysis backend that fit no
    /// configured pattern group; never produced by pattern mining
    Other,
}

impl RuleType {
    /// Stable identifier used in the sink and in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::PriorAuthorization => "prior_authorization",
            RuleType::TimelyFiling => "timely_filing",
            RuleType::Appeals => "appeals",
            RuleType::Claims => "claims",
            RuleType::Other => "other",
        }
    }

}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic applicability of a rule
///
/// Inferred from the rule's span text plus nearby context. Absence of any
/// signal is `Unspecified`, never a guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeographicScope {
    /// Applies everywhere ("all states", "nationwide", commercial plans)
    National,
    /// A single named state
    State(String),
    /// A named region, zone, service area, or multi-state group
    Regional(String),
    /// No geographic signal in or around the span
    Unspecified,
}

impl GeographicScope {
    pub fn as_str(&self) -> &str {
        match self {
            GeographicScope::National => "national",
            GeographicScope::State(s) => s,
            GeographicScope::Regional(r) => r,
            GeographicScope::Unspecified => "unspecified",
        }
    }

    /// Stable category label for the sink
    pub fn kind(&self) -> &'static str {
        match self {
            GeographicScope::National => "national",
            GeographicScope::State(_) => "state",
            GeographicScope::Regional(_) => "regional",
            GeographicScope::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for GeographicScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule span mined from one page, before quality filtering
#[derive(Debug, Clone)]
pub struct CandidateRule {
    pub rule_type: RuleType,
    /// The bounded span of policy text
    pub text: String,
    /// 1-based page the span came from
    pub page_number: u32,
    /// Deterministic score in [0, 1]
    pub confidence: f64,
    pub scope: GeographicScope,
}

/// A rule that survived quality filtering, ready for the sink
#[derive(Debug, Clone)]
pub struct Rule {
    pub payer: String,
    pub document_url: String,
    pub document_fingerprint: String,
    pub rule_type: RuleType,
    pub text: String,
    pub page_number: u32,
    pub confidence: f64,
    pub scope: GeographicScope,
    pub extracted_at: DateTime<Utc>,
}

impl Rule {
    pub fn from_candidate(
        candidate: CandidateRule,
        payer: &str,
        document_url: &str,
        fingerprint: &str,
    ) -> Self {
        Self {
            payer: payer.to_string(),
            document_url: document_url.to_string(),
            document_fingerprint: fingerprint.to_string(),
            rule_type: candidate.rule_type,
            text: candidate.text,
            page_number: candidate.page_number,
            confidence: candidate.confidence,
            scope: candidate.scope,
            extracted_at: Utc::now(),
        }
    }
}

use crate::rules::RuleType;
use crate::FailureKind;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

/// Document/rule counts for one payer's pass through the pipeline
#[derive(Debug, Default, Clone)]
pub struct StageCounts {
    pub pages_visited: u32,
    pub documents_discovered: u32,
    pub documents_fetched: u32,
    pub duplicates_skipped: u32,
    pub rejected: u32,
    pub unreadable: u32,
    pub candidate_rules: u32,
    pub accepted_rules: u32,
}

/// Per-unit failures, counted and reported but never fatal
#[derive(Debug, Default, Clone)]
pub struct FailureCounts {
    pub network: u32,
    pub render: u32,
    pub unsupported_format: u32,
    pub extraction: u32,
}

impl FailureCounts {
    pub fn record(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::Network => self.network += 1,
            FailureKind::Render => self.render += 1,
            FailureKind::UnsupportedFormat => self.unsupported_format += 1,
            FailureKind::Extraction => self.extraction += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.network + self.render + self.unsupported_format + self.extraction
    }
}

/// One payer's results
#[derive(Debug, Clone)]
pub struct PayerSummary {
    pub payer: String,
    pub counts: StageCounts,
    pub failures: FailureCounts,
    /// Accepted rules broken down by type
    pub rules_by_type: HashMap<RuleType, u32>,
}

impl PayerSummary {
    pub fn new(payer: String) -> Self {
        Self {
            payer,
            counts: StageCounts::default(),
            failures: FailureCounts::default(),
            rules_by_type: HashMap::new(),
        }
    }
}

/// Results of a whole run, one entry per payer
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    pub config_hash: String,
    pub duration: Duration,
    pub payers: Vec<PayerSummary>,
}

impl RunSummary {
    /// Column totals across payers
    pub fn totals(&self) -> (StageCounts, FailureCounts) {
        let mut counts = StageCounts::default();
        let mut failures = FailureCounts::default();
        for payer in &self.payers {
            counts.pages_visited += payer.counts.pages_visited;
            counts.documents_discovered += payer.counts.documents_discovered;
            counts.documents_fetched += payer.counts.documents_fetched;
            counts.duplicates_skipped += payer.counts.duplicates_skipped;
            counts.rejected += payer.counts.rejected;
            counts.unreadable += payer.counts.unreadable;
            counts.candidate_rules += payer.counts.candidate_rules;
            counts.accepted_rules += payer.counts.accepted_rules;

            failures.network += payer.failures.network;
            failures.render += payer.failures.render;
            failures.unsupported_format += payer.failures.unsupported_format;
            failures.extraction += payer.failures.extraction;
        }
        (counts, failures)
    }

    /// Human-readable run report
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Run {} ({}) finished in {:.1}s",
            self.run_id,
            &self.config_hash[..12.min(self.config_hash.len())],
            self.duration.as_secs_f64(),
        );

        for payer in &self.payers {
            let _ = writeln!(out, "\n{}", payer.payer);
            let _ = writeln!(
                out,
                "  pages: {}  discovered: {}  fetched: {}  duplicates: {}  rejected: {}",
                payer.counts.pages_visited,
                payer.counts.documents_discovered,
                payer.counts.documents_fetched,
                payer.counts.duplicates_skipped,
                payer.counts.rejected,
            );
            let _ = writeln!(
                out,
                "  rules: {} accepted of {} candidates  unreadable docs: {}",
                payer.counts.accepted_rules,
                payer.counts.candidate_rules,
                payer.counts.unreadable,
            );
            if !payer.rules_by_type.is_empty() {
                let mut by_type: Vec<_> = payer
                    .rules_by_type
                    .iter()
                    .map(|(t, n)| format!("{}: {}", t, n))
                    .collect();
                by_type.sort();
                let _ = writeln!(out, "  by type: {}", by_type.join(", "));
            }
            if payer.failures.total() > 0 {
                let _ = writeln!(
                    out,
                    "  failures: {} network, {} render, {} format, {} extraction",
                    payer.failures.network,
                    payer.failures.render,
                    payer.failures.unsupported_format,
                    payer.failures.extraction,
                );
            }
        }

        let (counts, failures) = self.totals();
        let _ = writeln!(
            out,
            "\nTotal: {} documents, {} rules, {} failures",
            counts.documents_fetched,
            counts.accepted_rules,
            failures.total(),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_recording() {
        let mut failures = FailureCounts::default();
        failures.record(FailureKind::Network);
        failures.record(FailureKind::Network);
        failures.record(FailureKind::Extraction);
        assert_eq!(failures.network, 2);
        assert_eq!(failures.extraction, 1);
        assert_eq!(failures.total(), 3);
    }

    #[test]
    fn test_totals_sum_across_payers() {
        let mut a = PayerSummary::new("A".to_string());
        a.counts.documents_fetched = 3;
        a.counts.accepted_rules = 5;
        a.rules_by_type.insert(RuleType::TimelyFiling, 3);
        a.rules_by_type.insert(RuleType::Appeals, 2);

        let mut b = PayerSummary::new("B".to_string());
        b.counts.documents_fetched = 2;
        b.counts.accepted_rules = 1;
        b.failures.network = 1;

        let summary = RunSummary {
            run_id: 1,
            config_hash: "abcdef0123456789".to_string(),
            duration: Duration::from_secs(3),
            payers: vec![a, b],
        };

        let (counts, failures) = summary.totals();
        assert_eq!(counts.documents_fetched, 5);
        assert_eq!(counts.accepted_rules, 6);
        assert_eq!(failures.total(), 1);

        let report = summary.render();
        assert!(report.contains("Total: 5 documents, 6 rules, 1 failures"));
        assert!(report.contains("by type: appeals: 2, timely_filing: 3"));
    }
}

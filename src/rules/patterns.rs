use crate::config::PatternConfig;
use crate::rules::types::RuleType;
use crate::{ConfigError, ConfigResult};
use regex::{Regex, RegexBuilder};

/// Compiled rule patterns, grouped by rule type
///
/// Compiled once at startup from [`PatternConfig`]; a pattern that fails to
/// compile aborts the run before any network activity. All patterns match
/// case-insensitively.
#[derive(Debug)]
pub struct PatternLibrary {
    groups: Vec<(RuleType, Vec<Regex>)>,
}

impl PatternLibrary {
    pub fn compile(config: &PatternConfig) -> ConfigResult<Self> {
        let sources = [
            (RuleType::PriorAuthorization, &config.prior_authorization),
            (RuleType::TimelyFiling, &config.timely_filing),
            (RuleType::Appeals, &config.appeals),
            (RuleType::Claims, &config.claims),
        ];

        let mut groups = Vec::with_capacity(sources.len());
        for (rule_type, patterns) in sources {
            let mut compiled = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidPattern {
                        rule_type: rule_type.as_str().to_string(),
                        message: format!("{}: {}", pattern, e),
                    })?;
                compiled.push(regex);
            }
            groups.push((rule_type, compiled));
        }

        Ok(Self { groups })
    }

    pub fn groups(&self) -> impl Iterator<Item = (RuleType, &[Regex])> {
        self.groups.iter().map(|(t, rs)| (*t, rs.as_slice()))
    }

    /// Patterns for one rule type
    pub fn for_type(&self, rule_type: RuleType) -> &[Regex] {
        self.groups
            .iter()
            .find(|(t, _)| *t == rule_type)
            .map(|(_, rs)| rs.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_compile() {
        let library = PatternLibrary::compile(&PatternConfig::default()).unwrap();
        assert_eq!(library.groups().count(), 4);
        for (_, patterns) in library.groups() {
            assert!(!patterns.is_empty());
        }
    }

    #[test]
    fn test_case_insensitive() {
        let library = PatternLibrary::compile(&PatternConfig::default()).unwrap();
        let timely = library.for_type(RuleType::TimelyFiling);
        assert!(timely.iter().any(|r| r.is_match("TIMELY FILING deadline")));
    }

    #[test]
    fn test_bad_pattern_reports_rule_type() {
        let config = PatternConfig {
            appeals: vec!["(unclosed".to_string()],
            ..PatternConfig::default()
        };
        let err = PatternLibrary::compile(&config).unwrap_err();
        match err {
            ConfigError::InvalidPattern { rule_type, .. } => assert_eq!(rule_type, "appeals"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

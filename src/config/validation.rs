use crate::config::types::Config;
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates a parsed configuration
///
/// Checks ranges, URL shapes, and compiles every rule pattern. A pattern
/// that fails to compile aborts the load; a run with a silently broken
/// pattern set would under-extract everything and look like a quiet success.
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    validate_crawler(config)?;
    validate_fetcher(config)?;
    validate_thresholds(config)?;
    validate_payers(config)?;
    validate_patterns(config)?;
    Ok(())
}

fn validate_crawler(config: &Config) -> ConfigResult<()> {
    if config.crawler.max_depth == 0 {
        return Err(ConfigError::Validation(
            "crawler.max-depth must be at least 1".to_string(),
        ));
    }

    if config.crawler.page_visit_budget == 0 {
        return Err(ConfigError::Validation(
            "crawler.page-visit-budget must be at least 1".to_string(),
        ));
    }

    if config.crawler.max_concurrent_documents == 0 {
        return Err(ConfigError::Validation(
            "crawler.max-concurrent-documents must be at least 1".to_string(),
        ));
    }

    if config.crawler.max_domain_requests == 0 {
        return Err(ConfigError::Validation(
            "crawler.max-domain-requests must be at least 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetcher(config: &Config) -> ConfigResult<()> {
    if config.fetcher.max_document_bytes == 0 {
        return Err(ConfigError::Validation(
            "fetcher.max-document-bytes must be greater than 0".to_string(),
        ));
    }

    if config.fetcher.min_document_bytes >= config.fetcher.max_document_bytes {
        return Err(ConfigError::Validation(
            "fetcher.min-document-bytes must be smaller than max-document-bytes".to_string(),
        ));
    }

    Ok(())
}

fn validate_thresholds(config: &Config) -> ConfigResult<()> {
    let checks = [
        ("filter.confidence-floor", config.filter.confidence_floor),
        (
            "filter.similarity-threshold",
            config.filter.similarity_threshold,
        ),
        (
            "extraction.fallback-confidence-cap",
            config.extraction.fallback_confidence_cap,
        ),
    ];

    for (name, value) in checks {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 0.0 and 1.0, got {}",
                name, value
            )));
        }
    }

    Ok(())
}

fn validate_payers(config: &Config) -> ConfigResult<()> {
    if config.payer.is_empty() {
        return Err(ConfigError::Validation(
            "At least one [[payer]] must be configured".to_string(),
        ));
    }

    for payer in &config.payer {
        if payer.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "payer.name must not be empty".to_string(),
            ));
        }

        if payer.domain.trim().is_empty() || payer.domain.contains('/') {
            return Err(ConfigError::Validation(format!(
                "payer.domain must be a bare domain, got: {}",
                payer.domain
            )));
        }

        for seed in payer.seed_urls() {
            let url = Url::parse(&seed)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", seed, e)))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::InvalidUrl(format!(
                    "{}: only http(s) seeds are supported",
                    seed
                )));
            }
        }
    }

    Ok(())
}

fn validate_patterns(config: &Config) -> ConfigResult<()> {
    let groups = [
        ("prior-authorization", &config.patterns.prior_authorization),
        ("timely-filing", &config.patterns.timely_filing),
        ("appeals", &config.patterns.appeals),
        ("claims", &config.patterns.claims),
    ];

    for (rule_type, patterns) in groups {
        if patterns.is_empty() {
            return Err(ConfigError::InvalidPattern {
                rule_type: rule_type.to_string(),
                message: "pattern list must not be empty".to_string(),
            });
        }

        for pattern in patterns {
            regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                rule_type: rule_type.to_string(),
                message: format!("{}: {}", pattern, e),
            })?;
        }
    }

    Ok(())
}

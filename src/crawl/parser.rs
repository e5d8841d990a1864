use crate::config::CrawlerConfig;
use crate::crawl::MimeGuess;
use crate::url::normalize_url;
use scraper::{Html, Selector};
use url::Url;

/// URL path segments that strongly suggest policy content
const HIGH_VALUE_PATH_TERMS: &[&str] = &[
    "provider",
    "manual",
    "policy",
    "policies",
    "authorization",
    "prior-auth",
    "priorauth",
    "claims",
    "billing",
    "reimbursement",
    "appeals",
    "filing",
    "guidelines",
];

/// An anchor extracted from a portal page
#[derive(Debug, Clone)]
pub struct Anchor {
    /// Resolved, normalized target URL
    pub url: Url,
    /// Trimmed anchor text
    pub text: String,
}

/// How the discovery loop should treat an anchor
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorClass {
    /// Fetch as a policy-document candidate
    Document(MimeGuess),
    /// Push into the frontier for further crawling
    Navigation,
}

/// Extracts all same-scheme anchors from an HTML page
///
/// Relative hrefs resolve against the page URL; anchors that fail to parse
/// or normalize are silently skipped. Fragment-only and `javascript:` hrefs
/// never make it past normalization.
pub fn extract_anchors(html: &str, page_url: &Url) -> Vec<Anchor> {
    let document = Html::parse_document(html);
    // static selector, cannot fail
    let selector = Selector::parse("a[href]").unwrap();

    let mut anchors = Vec::new();
    for element in document.select(&selector) {
        let href = match element.value().attr("href") {
            Some(h) => h.trim(),
            None => continue,
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let resolved = match page_url.join(href) {
            Ok(u) => u,
            Err(_) => continue,
        };

        let normalized = match normalize_url(resolved.as_str()) {
            Ok(u) => u,
            Err(_) => continue,
        };

        let text = element.text().collect::<String>().trim().to_string();
        anchors.push(Anchor {
            url: normalized,
            text,
        });
    }

    anchors
}

/// Classifies an anchor as a document candidate, navigation, or noise
///
/// A link is a document candidate when its URL carries a document extension
/// OR its anchor text contains a vocabulary term ("manual", "prior auth",
/// "filing"...). Extension-less vocabulary hits are guessed as HTML pages;
/// policy pages served as plain HTML are documents too.
pub fn classify_anchor(anchor: &Anchor, config: &CrawlerConfig) -> AnchorClass {
    let path = anchor.url.path().to_lowercase();
    let has_doc_extension = config
        .document_extensions
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext)));

    if has_doc_extension {
        return AnchorClass::Document(MimeGuess::from_url(&anchor.url));
    }

    let text = anchor.text.to_lowercase();
    let vocabulary_hit = config
        .anchor_vocabulary
        .iter()
        .any(|term| text.contains(term.as_str()));

    if vocabulary_hit {
        return AnchorClass::Document(MimeGuess::Html);
    }

    AnchorClass::Navigation
}

/// Scores URL relevance from path terms and anchor text, in [0, 1]
///
/// Used to rank document candidates and to pre-filter obviously low-value
/// targets before spending a download on them.
pub fn url_relevance(url: &Url, anchor_text: &str, low_value_patterns: &[String]) -> f64 {
    let path = url.path().to_lowercase();

    for pattern in low_value_patterns {
        if path.contains(pattern.as_str()) {
            return 0.0;
        }
    }

    let path_hits = HIGH_VALUE_PATH_TERMS
        .iter()
        .filter(|term| path.contains(*term))
        .count();

    let text = anchor_text.to_lowercase();
    let text_hits = HIGH_VALUE_PATH_TERMS
        .iter()
        .filter(|term| text.contains(*term))
        .count();

    let score = 0.2 + 0.15 * path_hits as f64 + 0.1 * text_hits as f64;
    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler_config() -> CrawlerConfig {
        CrawlerConfig {
            max_depth: 3,
            page_visit_budget: 100,
            max_concurrent_documents: 4,
            min_request_interval: 1000,
            max_domain_requests: 100,
            request_timeout: 30,
            document_extensions: vec!["pdf".to_string(), "docx".to_string()],
            anchor_vocabulary: vec![
                "manual".to_string(),
                "prior auth".to_string(),
                "filing".to_string(),
            ],
        }
    }

    fn page() -> Url {
        Url::parse("https://payer.example/providers/").unwrap()
    }

    #[test]
    fn test_extract_resolves_relative_hrefs() {
        let html = r#"<html><body>
            <a href="/docs/manual.pdf">Provider Manual</a>
            <a href="resources">Resources</a>
        </body></html>"#;
        let anchors = extract_anchors(html, &page());
        assert_eq!(anchors.len(), 2);
        assert_eq!(
            anchors[0].url.as_str(),
            "https://payer.example/docs/manual.pdf"
        );
        assert_eq!(
            anchors[1].url.as_str(),
            "https://payer.example/providers/resources"
        );
    }

    #[test]
    fn test_extract_skips_fragments_and_bad_hrefs() {
        let html = r##"<html><body>
            <a href="#section">Jump</a>
            <a href="javascript:void(0)">Click</a>
            <a href="mailto:ops@payer.example">Mail</a>
            <a href="/real">Real</a>
        </body></html>"##;
        let anchors = extract_anchors(html, &page());
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].url.as_str(), "https://payer.example/real");
    }

    #[test]
    fn test_classify_pdf_extension() {
        let anchor = Anchor {
            url: Url::parse("https://payer.example/docs/manual.pdf").unwrap(),
            text: "Download".to_string(),
        };
        assert_eq!(
            classify_anchor(&anchor, &crawler_config()),
            AnchorClass::Document(MimeGuess::Pdf)
        );
    }

    #[test]
    fn test_classify_vocabulary_without_extension() {
        let anchor = Anchor {
            url: Url::parse("https://payer.example/resources/2024").unwrap(),
            text: "Provider Manual 2024".to_string(),
        };
        assert_eq!(
            classify_anchor(&anchor, &crawler_config()),
            AnchorClass::Document(MimeGuess::Html)
        );
    }

    #[test]
    fn test_classify_navigation() {
        let anchor = Anchor {
            url: Url::parse("https://payer.example/about").unwrap(),
            text: "About us".to_string(),
        };
        assert_eq!(
            classify_anchor(&anchor, &crawler_config()),
            AnchorClass::Navigation
        );
    }

    #[test]
    fn test_relevance_low_value_zeroed() {
        let url = Url::parse("https://payer.example/legal/privacy-policy.pdf").unwrap();
        let score = url_relevance(&url, "Privacy", &vec!["privacy-policy".to_string()]);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_relevance_rewards_policy_terms() {
        let rich = Url::parse("https://payer.example/provider/manual/claims.pdf").unwrap();
        let plain = Url::parse("https://payer.example/files/x.pdf").unwrap();
        let rich_score = url_relevance(&rich, "Claims filing manual", &[]);
        let plain_score = url_relevance(&plain, "x", &[]);
        assert!(rich_score > plain_score);
        assert!(rich_score <= 1.0);
    }
}

//! Breadth-first portal crawling
//!
//! The crawler walks each payer's portal from its seed URLs, level by level,
//! within a domain allow-list. Pages are fetched politely (per-domain rate
//! limiting with backoff), parsed for anchors, and classified: document
//! candidates stream out to the fetch stage, navigation links feed back into
//! the frontier, everything else is dropped.

mod discovery;
mod frontier;
mod limiter;
mod page;
mod parser;
mod render;

pub use discovery::{Crawler, DiscoveryStats};
pub use frontier::{Frontier, FrontierEntry};
pub use limiter::RateLimiter;
pub use page::{build_http_client, fetch_page, PageFetch};
pub use parser::{classify_anchor, extract_anchors, url_relevance, Anchor, AnchorClass};
pub use render::{needs_render, DynamicRenderer};

use url::Url;

/// Best-effort document type guess made at discovery time
///
/// The guess comes from the URL extension and anchor text only; the fetcher
/// confirms or corrects it from the response Content-Type header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeGuess {
    Pdf,
    Html,
    Word,
    Spreadsheet,
    Unknown,
}

impl MimeGuess {
    /// Guesses a document type from a normalized URL's path extension
    pub fn from_url(url: &Url) -> Self {
        let path = url.path().to_lowercase();
        if path.ends_with(".pdf") {
            MimeGuess::Pdf
        } else if path.ends_with(".doc") || path.ends_with(".docx") {
            MimeGuess::Word
        } else if path.ends_with(".xls") || path.ends_with(".xlsx") {
            MimeGuess::Spreadsheet
        } else if path.ends_with(".html") || path.ends_with(".htm") {
            MimeGuess::Html
        } else {
            MimeGuess::Unknown
        }
    }
}

/// A candidate policy document found during crawling
#[derive(Debug, Clone)]
pub struct DiscoveredDocument {
    /// Normalized document URL
    pub url: Url,
    /// Page the anchor was found on
    pub found_on: Url,
    /// Anchor text of the link, trimmed
    pub anchor_text: String,
    /// BFS depth of the page the anchor was found on
    pub depth: u32,
    /// Extension-based type guess
    pub mime_guess: MimeGuess,
    /// URL relevance score from path and anchor keywords
    pub relevance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_guess_from_extension() {
        let pdf = Url::parse("https://payer.example/docs/manual.pdf").unwrap();
        assert_eq!(MimeGuess::from_url(&pdf), MimeGuess::Pdf);

        let word = Url::parse("https://payer.example/docs/form.docx").unwrap();
        assert_eq!(MimeGuess::from_url(&word), MimeGuess::Word);

        let page = Url::parse("https://payer.example/policies.html").unwrap();
        assert_eq!(MimeGuess::from_url(&page), MimeGuess::Html);

        let bare = Url::parse("https://payer.example/policies").unwrap();
        assert_eq!(MimeGuess::from_url(&bare), MimeGuess::Unknown);
    }

    #[test]
    fn test_mime_guess_ignores_query() {
        let pdf = Url::parse("https://payer.example/manual.pdf?v=202210").unwrap();
        assert_eq!(MimeGuess::from_url(&pdf), MimeGuess::Pdf);
    }
}

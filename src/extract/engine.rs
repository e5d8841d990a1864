use scraper::{Html, Selector};
use thiserror::Error;

/// Errors from a single extraction engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Document contains no extractable pages")]
    Empty,
}

/// A text extraction engine
///
/// Engines return one string per page, in page order. An empty string is a
/// valid per-page result (image-only page); a document-level failure is an
/// error. The extractor chains engines so a page one engine cannot read may
/// still be recovered by the next.
pub trait ExtractionEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, EngineError>;
}

/// Primary PDF engine, backed by lopdf
pub struct LopdfEngine;

impl ExtractionEngine for LopdfEngine {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, EngineError> {
        let document =
            lopdf::Document::load_mem(bytes).map_err(|e| EngineError::Parse(e.to_string()))?;

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(EngineError::Empty);
        }

        let mut pages = Vec::with_capacity(page_numbers.len());
        for number in page_numbers {
            // a page lopdf cannot decode becomes an empty string; the
            // fallback engine gets a chance at it
            let text = document.extract_text(&[number]).unwrap_or_default();
            pages.push(text);
        }
        Ok(pages)
    }
}

/// Secondary PDF engine, backed by pdf-extract
///
/// Slower and laxer than lopdf; it reads some malformed files the primary
/// rejects, which is exactly why it runs second.
pub struct PdfExtractEngine;

impl ExtractionEngine for PdfExtractEngine {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, EngineError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| EngineError::Parse(e.to_string()))?;
        if pages.is_empty() {
            return Err(EngineError::Empty);
        }
        Ok(pages)
    }
}

/// Extraction engine for policy pages served as plain HTML
///
/// An HTML document is a single "page": markup is stripped, script and
/// style content dropped, and block boundaries become newlines so the rule
/// engine's span termination still works.
pub struct HtmlTextEngine;

impl ExtractionEngine for HtmlTextEngine {
    fn name(&self) -> &'static str {
        "html"
    }

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, EngineError> {
        let html = String::from_utf8_lossy(bytes);
        let document = Html::parse_document(&html);
        // static selector, cannot fail
        let selector = Selector::parse("p, li, h1, h2, h3, h4, h5, h6, td, div").unwrap();

        let mut blocks: Vec<String> = Vec::new();
        for element in document.select(&selector) {
            // only leaf-ish blocks; containers repeat their children's text
            let has_block_child = element
                .children()
                .filter_map(scraper::ElementRef::wrap)
                .any(|child| {
                    matches!(
                        child.value().name(),
                        "p" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "td" | "div" | "ul" | "ol" | "table"
                    )
                });
            if has_block_child {
                continue;
            }

            let text = element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !text.is_empty() {
                blocks.push(text);
            }
        }

        if blocks.is_empty() {
            return Err(EngineError::Empty);
        }

        Ok(vec![blocks.join("\n\n")])
    }
}

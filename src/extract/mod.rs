//! Document text extraction
//!
//! Turns fetched document bytes into per-page text. PDFs go through an
//! engine fallback chain; HTML policy pages are stripped to text blocks.
//! Which engine produced each page travels with the text, because
//! fallback-derived text caps the confidence of any rule mined from it.

mod engine;
mod extractor;

pub use engine::{EngineError, ExtractionEngine, HtmlTextEngine, LopdfEngine, PdfExtractEngine};
pub use extractor::{ContentExtractor, ExtractedDocument, ExtractedPage};

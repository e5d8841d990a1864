use crate::config::ExtractionConfig;
use crate::extract::engine::{EngineError, ExtractionEngine, HtmlTextEngine, LopdfEngine, PdfExtractEngine};

/// Text of one extracted page
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// 1-based page number
    pub page_number: u32,
    pub text: String,
    /// Name of the engine that produced this page's text
    pub engine: &'static str,
}

/// Result of extracting a whole document
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub pages: Vec<ExtractedPage>,
    /// Total extracted characters fell below the configured floor; the
    /// document is catalogued but mined for nothing
    pub unreadable: bool,
    /// Any page came from the secondary engine; rules mined from this text
    /// get a confidence ceiling
    pub used_fallback: bool,
    pub warnings: Vec<String>,
}

impl ExtractedDocument {
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.text.len()).sum()
    }
}

/// Extracts document text through an engine fallback chain
///
/// PDFs run lopdf first, then pdf-extract for whatever lopdf could not
/// read: a whole-document parse failure hands the entire file over, and a
/// per-page blank hands just that page over (aligned by page index). HTML
/// documents use the markup-stripping engine with no fallback.
pub struct ContentExtractor {
    config: ExtractionConfig,
    pdf_primary: Box<dyn ExtractionEngine>,
    pdf_secondary: Box<dyn ExtractionEngine>,
    html: HtmlTextEngine,
}

impl ContentExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            pdf_primary: Box::new(LopdfEngine),
            pdf_secondary: Box::new(PdfExtractEngine),
            html: HtmlTextEngine,
        }
    }

    #[cfg(test)]
    fn with_pdf_engines(
        config: ExtractionConfig,
        primary: Box<dyn ExtractionEngine>,
        secondary: Box<dyn ExtractionEngine>,
    ) -> Self {
        Self {
            config,
            pdf_primary: primary,
            pdf_secondary: secondary,
            html: HtmlTextEngine,
        }
    }

    /// Extracts a fetched document's text by content type
    ///
    /// Errors only when every applicable engine fails the whole document.
    pub fn extract(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<ExtractedDocument, EngineError> {
        if content_type.starts_with("text/html") {
            let pages = self.html.extract_pages(bytes)?;
            return Ok(self.assemble(pages, self.html.name(), false, Vec::new()));
        }

        self.extract_pdf(bytes)
    }

    fn extract_pdf(&self, bytes: &[u8]) -> Result<ExtractedDocument, EngineError> {
        let mut warnings = Vec::new();

        match self.pdf_primary.extract_pages(bytes) {
            Ok(mut pages) => {
                let blank_pages: Vec<usize> = pages
                    .iter()
                    .enumerate()
                    .filter(|(_, text)| text.trim().is_empty())
                    .map(|(i, _)| i)
                    .collect();

                if blank_pages.is_empty() {
                    return Ok(self.assemble(pages, self.pdf_primary.name(), false, warnings));
                }

                // recover just the blank pages from the secondary engine,
                // aligned by index
                match self.pdf_secondary.extract_pages(bytes) {
                    Ok(fallback_pages) => {
                        let mut recovered = Vec::new();
                        for &i in &blank_pages {
                            if let Some(text) = fallback_pages.get(i) {
                                if !text.trim().is_empty() {
                                    pages[i] = text.clone();
                                    recovered.push(i + 1);
                                }
                            }
                        }
                        let used_fallback = !recovered.is_empty();
                        if used_fallback {
                            warnings.push(format!(
                                "Pages {:?} recovered by {}",
                                recovered,
                                self.pdf_secondary.name()
                            ));
                        }
                        let still_blank: Vec<usize> = blank_pages
                            .iter()
                            .map(|&i| i + 1)
                            .filter(|n| !recovered.contains(n))
                            .collect();
                        if !still_blank.is_empty() {
                            warnings
                                .push(format!("Pages {:?} unreadable by both engines", still_blank));
                        }
                        Ok(self.assemble_mixed(pages, &recovered, used_fallback, warnings))
                    }
                    Err(e) => {
                        warnings.push(format!(
                            "{} failed on blank-page recovery: {}",
                            self.pdf_secondary.name(),
                            e
                        ));
                        let still_blank: Vec<usize> =
                            blank_pages.iter().map(|&i| i + 1).collect();
                        warnings
                            .push(format!("Pages {:?} unreadable by both engines", still_blank));
                        Ok(self.assemble(pages, self.pdf_primary.name(), false, warnings))
                    }
                }
            }
            Err(primary_error) => {
                warnings.push(format!(
                    "{} failed: {}",
                    self.pdf_primary.name(),
                    primary_error
                ));
                let pages = self.pdf_secondary.extract_pages(bytes)?;
                Ok(self.assemble(pages, self.pdf_secondary.name(), true, warnings))
            }
        }
    }

    fn assemble(
        &self,
        pages: Vec<String>,
        engine: &'static str,
        used_fallback: bool,
        warnings: Vec<String>,
    ) -> ExtractedDocument {
        let pages: Vec<ExtractedPage> = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| ExtractedPage {
                page_number: i as u32 + 1,
                text,
                engine,
            })
            .collect();
        self.finish(pages, used_fallback, warnings)
    }

    fn assemble_mixed(
        &self,
        pages: Vec<String>,
        recovered_page_numbers: &[usize],
        used_fallback: bool,
        warnings: Vec<String>,
    ) -> ExtractedDocument {
        let pages: Vec<ExtractedPage> = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let engine = if recovered_page_numbers.contains(&(i + 1)) {
                    self.pdf_secondary.name()
                } else {
                    self.pdf_primary.name()
                };
                ExtractedPage {
                    page_number: i as u32 + 1,
                    text,
                    engine,
                }
            })
            .collect();
        self.finish(pages, used_fallback, warnings)
    }

    fn finish(
        &self,
        pages: Vec<ExtractedPage>,
        used_fallback: bool,
        mut warnings: Vec<String>,
    ) -> ExtractedDocument {
        let total: usize = pages.iter().map(|p| p.text.len()).sum();
        let unreadable = total < self.config.min_document_chars;
        if unreadable {
            warnings.push(format!(
                "Extracted only {} characters, likely a scanned document",
                total
            ));
        }
        ExtractedDocument {
            pages,
            unreadable,
            used_fallback,
            warnings,
        }
    }
}

use crate::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

/// Renderer for JavaScript-built portal pages
///
/// Plain HTTP fetching covers most portals; some build their navigation
/// client-side and serve an empty shell. A renderer, when one is configured
/// and reachable, turns such a page into post-execution HTML. The crawler
/// probes [`ready`](DynamicRenderer::ready) once per run and falls back to
/// static HTML for every page when the probe fails; a page that needed
/// rendering is then recorded as a render failure, never a fatal error.
#[async_trait]
pub trait DynamicRenderer: Send + Sync {
    /// One-shot availability probe, called once per run
    async fn ready(&self) -> bool;

    /// Renders the page and returns post-execution HTML
    async fn render(&self, url: &Url) -> Result<String>;
}

/// Heuristic for JavaScript-built pages
///
/// A page needs rendering when it has no usable anchors but does reference
/// scripts. Pages with anchors are handled statically even if they also
/// carry scripts; losing a few client-side links is preferable to rendering
/// every page.
pub fn needs_render(html: &str) -> bool {
    let document = Html::parse_document(html);
    // static selectors, cannot fail
    let anchor_selector = Selector::parse("a[href]").unwrap();
    let script_selector = Selector::parse("script[src], script").unwrap();

    let has_usable_anchor = document.select(&anchor_selector).any(|a| {
        a.value()
            .attr("href")
            .map(|h| {
                let h = h.trim();
                !h.is_empty() && !h.starts_with('#') && !h.starts_with("javascript:")
            })
            .unwrap_or(false)
    });

    if has_usable_anchor {
        return false;
    }

    document.select(&script_selector).next().is_some()
}

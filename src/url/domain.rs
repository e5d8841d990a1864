use url::Url;

/// Extracts the lowercase domain from a URL
///
/// Returns None for URLs without a host, which cannot happen for the
/// HTTP(S) URLs produced by [`super::normalize_url`].
///
/// # Examples
///
/// ```
/// use url::Url;
/// use payerscope::url::extract_domain;
///
/// let url = Url::parse("https://Providers.Payer.Example/manual.pdf").unwrap();
/// assert_eq!(extract_domain(&url), Some("providers.payer.example".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

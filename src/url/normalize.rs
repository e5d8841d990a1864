use crate::UrlError;
use url::Url;

/// Tracking query parameters removed during normalization
///
/// Portal pages frequently decorate links with campaign parameters; two
/// anchors to the same manual must normalize to the same visited-set key.
const TRACKING_PARAMS: &[&str] = &["utm_source", "utm_medium", "utm_campaign", "fbclid", "gclid"];

/// Normalizes a URL into the canonical form used by the visited-set
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host and strip a leading `www.`
/// 3. Normalize the path: drop dot segments, collapse duplicate slashes,
///    strip the trailing slash (except for the root)
/// 4. Strip the fragment
/// 5. Drop tracking query parameters and sort the remainder
///
/// Version-pinning query parameters (`?v=202210032112` on payer PDF links)
/// are intentionally preserved: two versions of the same manual are two
/// distinct documents.
///
/// # Examples
///
/// ```
/// use payerscope::url::normalize_url;
///
/// let url = normalize_url("http://WWW.PAYER.EXAMPLE/providers/#auth").unwrap();
/// assert_eq!(url.as_str(), "http://payer.example/providers");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) => {
            let mut normalized_host = host.to_lowercase();
            if normalized_host.starts_with("www.") {
                normalized_host = normalized_host[4..].to_string();
            }
            url.set_host(Some(&normalized_host))
                .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
        }
        None => return Err(UrlError::MissingDomain),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    Ok(url)
}

/// Removes dot segments, duplicate slashes, and the trailing slash
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_host() {
        let result = normalize_url("https://PAYER.EXAMPLE/Providers").unwrap();
        assert_eq!(result.as_str(), "https://payer.example/Providers");
    }

    #[test]
    fn test_remove_www() {
        let result = normalize_url("https://www.payer.example/").unwrap();
        assert_eq!(result.as_str(), "https://payer.example/");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://payer.example/providers/").unwrap();
        assert_eq!(result.as_str(), "https://payer.example/providers");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://payer.example/").unwrap();
        assert_eq!(result.as_str(), "https://payer.example/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://payer.example/manual.pdf#page=4").unwrap();
        assert_eq!(result.as_str(), "https://payer.example/manual.pdf");
    }

    #[test]
    fn test_keep_version_param() {
        let result =
            normalize_url("https://payer.example/docs/manual.pdf?v=202210032112").unwrap();
        assert_eq!(
            result.as_str(),
            "https://payer.example/docs/manual.pdf?v=202210032112"
        );
    }

    #[test]
    fn test_remove_tracking_params() {
        let result = normalize_url("https://payer.example/page?utm_source=mail&v=2").unwrap();
        assert_eq!(result.as_str(), "https://payer.example/page?v=2");
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize_url("https://payer.example/page?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://payer.example/page?a=1&b=2");
    }

    #[test]
    fn test_dot_segments() {
        let result = normalize_url("https://payer.example/a/../docs/./manual.pdf").unwrap();
        assert_eq!(result.as_str(), "https://payer.example/docs/manual.pdf");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = normalize_url("https://payer.example///docs//manual.pdf").unwrap();
        assert_eq!(result.as_str(), "https://payer.example/docs/manual.pdf");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://payer.example/manual.pdf");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_same_document_two_spellings() {
        let a = normalize_url("https://WWW.payer.example/docs/manual.pdf#intro").unwrap();
        let b = normalize_url("https://payer.example/docs//manual.pdf").unwrap();
        assert_eq!(a, b);
    }
}

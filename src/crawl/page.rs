use crate::config::{Config, UserAgentConfig};
use crate::Result;
use std::time::Duration;
use url::Url;

/// Outcome of fetching a single portal page
///
/// Only transport-level problems surface as errors to the caller; HTTP
/// status outcomes are data so the discovery loop can count and continue.
#[derive(Debug)]
pub enum PageFetch {
    /// 2xx with an HTML body
    Success { body: String, final_url: Url },
    /// 2xx but not an HTML content type; the URL may be an unflagged document
    NotHtml { content_type: String },
    /// 3xx redirect that left the allow-list, or a redirect loop
    RedirectedOffSite { location: String },
    /// 4xx client error
    ClientError { status: u16 },
    /// 5xx server error, counts toward domain backoff
    ServerError { status: u16 },
    /// Timeout or connection failure, counts toward domain backoff
    NetworkError { message: String },
}

impl PageFetch {
    /// Whether this outcome counts as a failure for rate-limit backoff
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PageFetch::ServerError { .. } | PageFetch::NetworkError { .. }
        )
    }
}

/// Builds the shared HTTP client used by both crawling and fetching
///
/// Redirects are disabled at the client level; the discovery loop resolves
/// them manually so off-allow-list hops can be dropped instead of followed.
pub fn build_http_client(user_agent: &UserAgentConfig, timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent.agent_string())
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(client)
}

/// Fetches one page, classifying the outcome
///
/// Follows at most `max_redirects` same-allow-list redirects. The caller is
/// expected to have passed the rate limiter first.
pub async fn fetch_page(
    client: &reqwest::Client,
    config: &Config,
    url: &Url,
    max_redirects: u32,
) -> PageFetch {
    let mut current = url.clone();

    for _ in 0..=max_redirects {
        let response = match client.get(current.as_str()).send().await {
            Ok(r) => r,
            Err(e) => {
                return PageFetch::NetworkError {
                    message: e.to_string(),
                }
            }
        };

        let status = response.status();

        if status.is_redirection() {
            let location = match response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
            {
                Some(l) => l.to_string(),
                None => {
                    return PageFetch::NetworkError {
                        message: format!("Redirect without Location header from {}", current),
                    }
                }
            };

            let next = match current.join(&location) {
                Ok(u) => u,
                Err(_) => return PageFetch::RedirectedOffSite { location },
            };

            let domain = match crate::url::extract_domain(&next) {
                Some(d) => d,
                None => return PageFetch::RedirectedOffSite { location },
            };
            if !crate::url::is_allowed_domain(&domain, &config.allowed_domains()) {
                return PageFetch::RedirectedOffSite { location };
            }

            current = next;
            continue;
        }

        if status.is_client_error() {
            return PageFetch::ClientError {
                status: status.as_u16(),
            };
        }

        if status.is_server_error() {
            return PageFetch::ServerError {
                status: status.as_u16(),
            };
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.starts_with("text/html")
            && !content_type.starts_with("application/xhtml")
        {
            return PageFetch::NotHtml { content_type };
        }

        return match response.text().await {
            Ok(body) => PageFetch::Success {
                body,
                final_url: current,
            },
            Err(e) => PageFetch::NetworkError {
                message: e.to_string(),
            },
        };
    }

    PageFetch::RedirectedOffSite {
        location: current.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "payerscope".to_string(),
            crawler_version: "0.3.0".to_string(),
            contact_url: "https://example.org/crawler".to_string(),
            contact_email: "ops@example.org".to_string(),
        }
    }

    #[test]
    fn test_agent_string_format() {
        let s = agent().agent_string();
        assert_eq!(
            s,
            "payerscope/0.3.0 (+https://example.org/crawler; ops@example.org)"
        );
    }

    #[test]
    fn test_build_client() {
        assert!(build_http_client(&agent(), 30).is_ok());
    }

    #[test]
    fn test_failure_classification() {
        assert!(PageFetch::ServerError { status: 503 }.is_failure());
        assert!(PageFetch::NetworkError {
            message: "timeout".to_string()
        }
        .is_failure());
        assert!(!PageFetch::ClientError { status: 404 }.is_failure());
        assert!(!PageFetch::NotHtml {
            content_type: "application/pdf".to_string()
        }
        .is_failure());
    }
}

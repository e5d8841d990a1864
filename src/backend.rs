//! Optional high-accuracy document analysis backend
//!
//! When configured, documents the local engines flag as unreadable can be
//! sent to an external analysis service instead of being written off. The
//! backend is probed once per run; an unreachable service downgrades every
//! would-be call to a warning, it never fails the run.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Backend response malformed: {0}")]
    Malformed(String),
}

/// Analysis result for one document
#[derive(Debug, Clone, Deserialize)]
pub struct BackendAnalysis {
    /// Per-page text, same shape the local engines produce
    pub pages: Vec<String>,
    /// Service-reported extraction confidence in [0, 1]
    pub confidence: f64,
    /// Identifier of the model or pipeline version that produced this
    pub model_id: String,
    /// The service's raw response, kept verbatim for the sink
    #[serde(skip)]
    pub raw: String,
}

/// A remote document-understanding service
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// One-shot availability probe, called once per run
    async fn ready(&self) -> bool;

    /// Analyzes raw document bytes
    async fn analyze(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<BackendAnalysis, BackendError>;
}

/// HTTP implementation speaking a simple JSON protocol
pub struct HttpDocumentBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpDocumentBackend {
    pub fn new(client: reqwest::Client, endpoint: String, api_key: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl DocumentBackend for HttpDocumentBackend {
    async fn ready(&self) -> bool {
        let url = format!("{}/health", self.endpoint.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn analyze(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<BackendAnalysis, BackendError> {
        let url = format!("{}/analyze", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let raw = response
            .text()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        let mut analysis: BackendAnalysis =
            serde_json::from_str(&raw).map_err(|e| BackendError::Malformed(e.to_string()))?;
        analysis.raw = raw;

        if !(0.0..=1.0).contains(&analysis.confidence) {
            return Err(BackendError::Malformed(format!(
                "confidence {} out of range",
                analysis.confidence
            )));
        }

        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(endpoint: &str) -> HttpDocumentBackend {
        HttpDocumentBackend::new(reqwest::Client::new(), endpoint.to_string(), "key".to_string())
    }

    #[tokio::test]
    async fn test_ready_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(backend(&server.uri()).ready().await);
    }

    #[tokio::test]
    async fn test_ready_probe_fails_cleanly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(!backend(&server.uri()).ready().await);
    }

    #[tokio::test]
    async fn test_analyze_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "pages": ["Claims must be submitted within 120 days."],
                "confidence": 0.93,
                "model_id": "docai-2"
            })))
            .mount(&server)
            .await;

        let analysis = backend(&server.uri())
            .analyze(b"%PDF-", "application/pdf")
            .await
            .unwrap();
        assert_eq!(analysis.pages.len(), 1);
        assert_eq!(analysis.model_id, "docai-2");
        assert!(analysis.raw.contains("docai-2"));
    }

    #[tokio::test]
    async fn test_service_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(422).set_body_string("unsupported"))
            .mount(&server)
            .await;

        let err = backend(&server.uri())
            .analyze(b"%PDF-", "application/pdf")
            .await
            .unwrap_err();
        match err {
            BackendError::Service { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "unsupported");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "pages": [],
                "confidence": 1.7,
                "model_id": "docai-2"
            })))
            .mount(&server)
            .await;

        let err = backend(&server.uri())
            .analyze(b"%PDF-", "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }
}

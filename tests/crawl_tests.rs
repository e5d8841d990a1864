//! End-to-end discovery tests against a mock portal

use payerscope::config::{parse_config, Config, PayerProfile};
use payerscope::crawl::{Crawler, DiscoveredDocument, RateLimiter};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server_uri: &str) -> Config {
    let contents = format!(
        r#"
[crawler]
max-depth = 3
page-visit-budget = 50
max-concurrent-documents = 2
min-request-interval = 0
max-domain-requests = 50

[user-agent]
crawler-name = "payerscope-test"
crawler-version = "0.0.0"
contact-url = "https://example.org/crawler"
contact-email = "ops@example.org"

[fetcher]
max-document-bytes = 1048576
min-document-bytes = 10

[output]
database-path = ":memory:"

[[payer]]
name = "Example Health"
domain = "127.0.0.1"
portal-url = "{}/providers"
"#,
        server_uri
    );
    parse_config(&contents).unwrap()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

async fn discover_all(
    server: &MockServer,
) -> (Vec<DiscoveredDocument>, payerscope::crawl::DiscoveryStats) {
    let config = Arc::new(test_config(&server.uri()));
    let client = payerscope::crawl::build_http_client(&config.user_agent, 5).unwrap();
    let limiter = Arc::new(RateLimiter::new(config.crawler.min_request_interval));
    let crawler = Crawler::new(client, config.clone(), limiter, None);

    let payer: PayerProfile = config.payer[0].clone();
    let (tx, mut rx) = mpsc::channel(32);
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let handle = tokio::spawn(async move { crawler.discover(&payer, tx, cancel_rx).await });

    let mut documents = Vec::new();
    while let Some(doc) = rx.recv().await {
        documents.push(doc);
    }
    let stats = handle.await.unwrap().unwrap();
    (documents, stats)
}

#[tokio::test]
async fn discovers_documents_across_levels() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(html(
            r#"<html><body>
                <a href="/docs/manual.pdf">Provider Manual</a>
                <a href="/resources">Resources</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/resources"))
        .respond_with(html(
            r#"<html><body>
                <a href="/docs/state-addendum.pdf">State Addendum</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let (documents, stats) = discover_all(&server).await;

    assert_eq!(documents.len(), 2);
    let urls: Vec<&str> = documents.iter().map(|d| d.url.path()).collect();
    assert!(urls.contains(&"/docs/manual.pdf"));
    assert!(urls.contains(&"/docs/state-addendum.pdf"));

    let manual = documents
        .iter()
        .find(|d| d.url.path() == "/docs/manual.pdf")
        .unwrap();
    assert_eq!(manual.depth, 0);
    assert_eq!(manual.anchor_text, "Provider Manual");

    let addendum = documents
        .iter()
        .find(|d| d.url.path() == "/docs/state-addendum.pdf")
        .unwrap();
    assert_eq!(addendum.depth, 1);

    assert_eq!(stats.pages_visited, 2);
    assert_eq!(stats.documents_found, 2);
}

#[tokio::test]
async fn cyclic_links_fetch_each_page_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(html(r#"<html><body><a href="/other">Other</a></body></html>"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/other"))
        .respond_with(html(
            r#"<html><body><a href="/providers">Back</a><a href="/other">Self</a></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let (_, stats) = discover_all(&server).await;
    assert_eq!(stats.pages_visited, 2);
}

#[tokio::test]
async fn off_domain_links_are_not_followed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(html(
            r#"<html><body>
                <a href="https://elsewhere.example/page">External</a>
                <a href="/local">Local</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/local"))
        .respond_with(html("<html><body>nothing here</body></html>"))
        .mount(&server)
        .await;

    let (_, stats) = discover_all(&server).await;
    assert_eq!(stats.pages_visited, 2);
}

#[tokio::test]
async fn repeated_document_links_yield_one_candidate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(html(
            r#"<html><body>
                <a href="/docs/manual.pdf">Provider Manual</a>
                <a href="/docs/manual.pdf">Download the manual</a>
                <a href="/more">More resources</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/more"))
        .respond_with(html(
            r#"<html><body><a href="/docs/manual.pdf">Manual (PDF)</a></body></html>"#,
        ))
        .mount(&server)
        .await;

    let (documents, stats) = discover_all(&server).await;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].url.path(), "/docs/manual.pdf");
    assert_eq!(stats.documents_found, 1);
}

#[tokio::test]
async fn low_value_documents_are_dropped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(html(
            r#"<html><body>
                <a href="/legal/privacy-policy.pdf">Privacy Policy</a>
                <a href="/docs/manual.pdf">Provider Manual</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let (documents, stats) = discover_all(&server).await;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].url.path(), "/docs/manual.pdf");
    assert_eq!(stats.low_value_dropped, 1);
}

#[tokio::test]
async fn server_errors_are_counted_not_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(html(
            r#"<html><body>
                <a href="/broken">Broken</a>
                <a href="/fine">Fine</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fine"))
        .respond_with(html(
            r#"<html><body><a href="/docs/guide.pdf">Billing Guide</a></body></html>"#,
        ))
        .mount(&server)
        .await;

    let (documents, stats) = discover_all(&server).await;
    assert_eq!(stats.network_failures, 1);
    assert_eq!(documents.len(), 1);
}

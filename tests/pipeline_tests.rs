//! Full-pipeline tests: crawl, fetch, extract, mine, filter, persist

use payerscope::config::parse_config;
use payerscope::pipeline::Orchestrator;
use payerscope::sink::{Sink, SqliteSink};
use std::sync::Arc;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config_toml(server_uri: &str) -> String {
    format!(
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

[extraction]
min-document-chars = 50

[output]
database-path = ":memory:"

[[payer]]
name = "Example Health"
domain = "127.0.0.1"
portal-url = "{}/providers"
"#,
        server_uri
    )
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

async fn run_pipeline(server: &MockServer) -> (Arc<SqliteSink>, payerscope::pipeline::RunSummary) {
    let contents = test_config_toml(&server.uri());
    let config = parse_config(&contents).unwrap();
    let hash = payerscope::config::compute_config_hash(&contents);

    let sink = Arc::new(SqliteSink::in_memory().unwrap());
    let orchestrator = Orchestrator::new(config, hash, sink.clone()).unwrap();

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let summary = orchestrator.run(cancel_rx).await.unwrap();
    (sink, summary)
}

#[tokio::test]
async fn html_policy_page_yields_a_national_timely_filing_rule() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(html(
            r#"<html><body>
                <a href="/policies/filing">Timely Filing Manual</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/policies/filing"))
        .respond_with(html(
            r#"<html><body>
                <h1>Claims Filing Requirements</h1>
                <p>Claims must be submitted within 120 days of the date of service
                for all commercial plans. Claims received after the filing deadline
                will be denied unless a qualifying exception is documented.</p>
                <p>Corrected claims must be filed within 180 days of the original
                remittance advice date.</p>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let (sink, summary) = run_pipeline(&server).await;

    assert_eq!(sink.document_count().unwrap(), 1);
    assert!(sink.rule_count().unwrap() >= 1);

    let (counts, failures) = summary.totals();
    assert_eq!(counts.documents_fetched, 1);
    assert!(counts.accepted_rules >= 1);
    assert_eq!(failures.total(), 0);
}

#[tokio::test]
async fn byte_identical_documents_are_deduplicated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(html(
            r#"<html><body>
                <a href="/docs/manual.pdf">Provider Manual</a>
                <a href="/docs/manual-copy.pdf">Provider Manual (mirror)</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    // identical bodies served from two URLs; not a real PDF, so the first
    // copy fails extraction, but fingerprinting happens before that and
    // the second copy must be skipped without a second pipeline pass
    let body = "identical document body, large enough to pass the size floor";
    for p in ["/docs/manual.pdf", "/docs/manual-copy.pdf"] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/pdf"))
            .expect(1)
            .mount(&server)
            .await;
    }

    let (sink, summary) = run_pipeline(&server).await;

    let (counts, failures) = summary.totals();
    assert_eq!(counts.duplicates_skipped, 1);
    assert_eq!(failures.extraction, 1);
    assert_eq!(sink.document_count().unwrap(), 0);
}

#[tokio::test]
async fn oversized_documents_are_rejected_not_truncated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(html(
            r#"<html><body><a href="/docs/huge.pdf">Provider Manual</a></body></html>"#,
        ))
        .mount(&server)
        .await;

    let huge = vec![b'x'; 2 * 1024 * 1024];
    Mock::given(method("GET"))
        .and(path("/docs/huge.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(huge, "application/pdf"))
        .mount(&server)
        .await;

    let (sink, summary) = run_pipeline(&server).await;

    let (counts, failures) = summary.totals();
    assert_eq!(counts.rejected, 1);
    assert_eq!(failures.unsupported_format, 1);
    assert_eq!(sink.document_count().unwrap(), 0);
}

#[tokio::test]
async fn boilerplate_and_duplicate_rules_are_filtered() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(html(
            r#"<html><body>
                <a href="/policies/a">Claims Manual Part One</a>
                <a href="/policies/b">Claims Manual Part Two</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    // both pages carry the identical timely-filing clause; only the first
    // occurrence may survive per-payer deduplication
    let clause = r#"<p>Claims must be submitted within 120 days of the date of
        service for all commercial plans, and late submissions will be denied
        without a documented exception.</p>"#;
    for p in ["/policies/a", "/policies/b"] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(html(&format!(
                "<html><body><h1>Filing</h1>{}<p>Page marker for {}</p></body></html>",
                clause, p
            )))
            .mount(&server)
            .await;
    }

    let (sink, _summary) = run_pipeline(&server).await;

    assert_eq!(sink.document_count().unwrap(), 2);
    // the clause is stored once, not twice
    assert_eq!(sink.rule_count().unwrap(), 1);
}

#[tokio::test]
async fn failed_urls_do_not_abort_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(html(
            r#"<html><body>
                <a href="/docs/missing.pdf">Provider Manual</a>
                <a href="/policies/good">Timely Filing Guide</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/policies/good"))
        .respond_with(html(
            r#"<html><body>
                <p>Claims must be submitted within 90 days of the date of service,
                and the filing deadline applies to all participating providers.</p>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let (sink, summary) = run_pipeline(&server).await;

    let (counts, failures) = summary.totals();
    assert_eq!(failures.network, 1);
    assert_eq!(counts.documents_fetched, 1);
    assert!(sink.rule_count().unwrap() >= 1);
}

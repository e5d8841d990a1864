use crate::config::PayerProfile;
use crate::rules::Rule;
use crate::sink::schema::initialize_schema;
use crate::sink::traits::{AttemptOutcome, Sink, SinkResult, StoredDocument};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed sink
///
/// A single connection behind a mutex; operations are short single-row
/// writes, so connection-level serialization is the simplest correct thing.
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path` and ensures the schema
    pub fn open<P: AsRef<Path>>(path: P) -> SinkResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory sink for tests
    pub fn in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> SinkResult<T> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        Ok(f(&conn)?)
    }
}

impl Sink for SqliteSink {
    fn begin_run(&self, config_hash: &str) -> SinkResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO runs (config_hash, started_at) VALUES (?1, ?2)",
                params![config_hash, Utc::now().to_rfc3339()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn finish_run(&self, run_id: i64) -> SinkResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE runs SET finished_at = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), run_id],
            )?;
            Ok(())
        })
    }

    fn upsert_payer(&self, payer: &PayerProfile) -> SinkResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO payers (name, domain, portal_url, priority, last_crawled_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(name) DO UPDATE SET
                    domain = excluded.domain,
                    portal_url = excluded.portal_url,
                    priority = excluded.priority,
                    last_crawled_at = excluded.last_crawled_at",
                params![
                    payer.name,
                    payer.domain,
                    payer.portal_url,
                    payer.priority,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            conn.query_row(
                "SELECT id FROM payers WHERE name = ?1",
                params![payer.name],
                |row| row.get(0),
            )
        })
    }

    fn insert_document(
        &self,
        run_id: i64,
        payer_id: i64,
        document: &StoredDocument,
    ) -> SinkResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (run_id, payer_id, url, found_on, anchor_text, depth,
                    content_type, byte_size, fingerprint, relevance, page_count, unreadable,
                    used_fallback, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    run_id,
                    payer_id,
                    document.url,
                    document.found_on,
                    document.anchor_text,
                    document.depth,
                    document.content_type,
                    document.byte_size,
                    document.fingerprint,
                    document.relevance,
                    document.page_count,
                    document.unreadable,
                    document.used_fallback,
                    document.fetched_at.to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn insert_rule(&self, document_id: i64, payer_id: i64, rule: &Rule) -> SinkResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO rules (document_id, payer_id, rule_type, text, page_number,
                    confidence, scope_kind, scope, extracted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    document_id,
                    payer_id,
                    rule.rule_type.as_str(),
                    rule.text,
                    rule.page_number,
                    rule.confidence,
                    rule.scope.kind(),
                    rule.scope.as_str(),
                    rule.extracted_at.to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn record_attempt(
        &self,
        run_id: i64,
        url: &str,
        outcome: AttemptOutcome,
        detail: &str,
    ) -> SinkResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO fetch_attempts (run_id, url, outcome, detail, attempted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![run_id, url, outcome.as_str(), detail, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
    }

    fn link_duplicate(&self, run_id: i64, url: &str, fingerprint: &str) -> SinkResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO document_duplicates (run_id, url, fingerprint, seen_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![run_id, url, fingerprint, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
    }

    fn store_backend_payload(
        &self,
        document_id: i64,
        model_id: &str,
        payload: &str,
    ) -> SinkResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO backend_payloads (document_id, model_id, payload, received_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![document_id, model_id, payload, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
    }

    fn known_fingerprints(&self) -> SinkResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT fingerprint FROM documents")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect()
        })
    }

    fn document_count(&self) -> SinkResult<u64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
        })
    }

    fn rule_count(&self) -> SinkResult<u64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM rules", [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{GeographicScope, RuleType};

    fn payer() -> PayerProfile {
        PayerProfile {
            name: "Example Health".to_string(),
            domain: "payer.example".to_string(),
            portal_url: "https://payer.example/providers".to_string(),
            priority: 1,
            rate_limit_override: None,
            seeds: Vec::new(),
        }
    }

    fn document(fingerprint: &str) -> StoredDocument {
        StoredDocument {
            url: "https://payer.example/manual.pdf".to_string(),
            found_on: "https://payer.example/providers".to_string(),
            anchor_text: "Provider Manual".to_string(),
            depth: 1,
            content_type: "application/pdf".to_string(),
            byte_size: 4096,
            fingerprint: fingerprint.to_string(),
            relevance: 0.65,
            page_count: 12,
            unreadable: false,
            used_fallback: false,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_run_lifecycle() {
        let sink = SqliteSink::in_memory().unwrap();
        let run_id = sink.begin_run("abc123").unwrap();
        assert!(run_id > 0);
        sink.finish_run(run_id).unwrap();
    }

    #[test]
    fn test_upsert_payer_is_stable() {
        let sink = SqliteSink::in_memory().unwrap();
        let first = sink.upsert_payer(&payer()).unwrap();
        let second = sink.upsert_payer(&payer()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_document_and_rule_storage() {
        let sink = SqliteSink::in_memory().unwrap();
        let run_id = sink.begin_run("h").unwrap();
        let payer_id = sink.upsert_payer(&payer()).unwrap();
        let doc_id = sink.insert_document(run_id, payer_id, &document("fp1")).unwrap();

        let rule = Rule {
            payer: "Example Health".to_string(),
            document_url: "https://payer.example/manual.pdf".to_string(),
            document_fingerprint: "fp1".to_string(),
            rule_type: RuleType::TimelyFiling,
            text: "Claims must be submitted within 120 days.".to_string(),
            page_number: 3,
            confidence: 0.82,
            scope: GeographicScope::National,
            extracted_at: Utc::now(),
        };
        sink.insert_rule(doc_id, payer_id, &rule).unwrap();

        assert_eq!(sink.document_count().unwrap(), 1);
        assert_eq!(sink.rule_count().unwrap(), 1);
    }

    #[test]
    fn test_known_fingerprints_round_trip() {
        let sink = SqliteSink::in_memory().unwrap();
        let run_id = sink.begin_run("h").unwrap();
        let payer_id = sink.upsert_payer(&payer()).unwrap();
        sink.insert_document(run_id, payer_id, &document("fp1")).unwrap();

        let mut doc2 = document("fp2");
        doc2.url = "https://payer.example/other.pdf".to_string();
        sink.insert_document(run_id, payer_id, &doc2).unwrap();

        let known = sink.known_fingerprints().unwrap();
        assert!(known.contains(&"fp1".to_string()));
        assert!(known.contains(&"fp2".to_string()));
    }

    #[test]
    fn test_backend_payload_storage() {
        let sink = SqliteSink::in_memory().unwrap();
        let run_id = sink.begin_run("h").unwrap();
        let payer_id = sink.upsert_payer(&payer()).unwrap();
        let doc_id = sink.insert_document(run_id, payer_id, &document("fp1")).unwrap();
        sink.store_backend_payload(doc_id, "docai-2", r#"{"pages":[]}"#)
            .unwrap();
    }

    #[test]
    fn test_attempts_and_duplicates() {
        let sink = SqliteSink::in_memory().unwrap();
        let run_id = sink.begin_run("h").unwrap();
        sink.record_attempt(run_id, "https://payer.example/x.pdf", AttemptOutcome::NetworkFailure, "timeout")
            .unwrap();
        sink.link_duplicate(run_id, "https://payer.example/copy.pdf", "fp1")
            .unwrap();
    }
}

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Creates all tables and indexes if they do not exist
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_info (
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            config_hash TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT
        );

        CREATE TABLE IF NOT EXISTS payers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            domain TEXT NOT NULL,
            portal_url TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            last_crawled_at TEXT
        );

        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES runs(id),
            payer_id INTEGER NOT NULL REFERENCES payers(id),
            url TEXT NOT NULL,
            found_on TEXT NOT NULL,
            anchor_text TEXT NOT NULL DEFAULT '',
            depth INTEGER NOT NULL,
            content_type TEXT NOT NULL,
            byte_size INTEGER NOT NULL,
            fingerprint TEXT NOT NULL UNIQUE,
            relevance REAL NOT NULL,
            page_count INTEGER NOT NULL,
            unreadable INTEGER NOT NULL DEFAULT 0,
            used_fallback INTEGER NOT NULL DEFAULT 0,
            fetched_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_payer ON documents(payer_id);
        CREATE INDEX IF NOT EXISTS idx_documents_fingerprint ON documents(fingerprint);

        CREATE TABLE IF NOT EXISTS document_duplicates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES runs(id),
            url TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            seen_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fetch_attempts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES runs(id),
            url TEXT NOT NULL,
            outcome TEXT NOT NULL,
            detail TEXT NOT NULL DEFAULT '',
            attempted_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL REFERENCES documents(id),
            payer_id INTEGER NOT NULL REFERENCES payers(id),
            rule_type TEXT NOT NULL,
            text TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            confidence REAL NOT NULL,
            scope_kind TEXT NOT NULL,
            scope TEXT NOT NULL,
            extracted_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_rules_payer_type ON rules(payer_id, rule_type);

        CREATE TABLE IF NOT EXISTS backend_payloads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL REFERENCES documents(id),
            model_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            received_at TEXT NOT NULL
        );
        "#,
    )?;

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM schema_info", [], |row| row.get(0))?;
    if count == 0 {
        conn.execute("INSERT INTO schema_info (version) VALUES (?1)", [SCHEMA_VERSION])?;
    }

    Ok(())
}

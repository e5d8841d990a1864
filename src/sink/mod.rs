//! Result persistence
//!
//! Everything the pipeline produces lands in SQLite: payers, the document
//! catalog (keyed by content fingerprint for cross-run deduplication),
//! mined rules, per-URL attempt outcomes, and run metadata with the config
//! hash that produced it.

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, SCHEMA_VERSION};
pub use sqlite::SqliteSink;
pub use traits::{AttemptOutcome, Sink, SinkError, SinkResult, StoredDocument};

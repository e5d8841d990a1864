//! Configuration loading, parsing, and validation
//!
//! Run configuration lives in a single TOML file: crawler politeness knobs,
//! fetcher limits, extraction and filter thresholds, payer profiles, and the
//! rule pattern lists. Everything tunable is data here, not code; a new rule
//! type or threshold change needs no recompile.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use types::{
    BackendConfig, Config, CrawlerConfig, ExtractionConfig, FetcherConfig, FilterConfig,
    OutputConfig, PatternConfig, PayerProfile, UserAgentConfig,
};
pub use validation::validate_config;

//! Rule mining
//!
//! Scans extracted page text for typed policy statements. Patterns anchor a
//! hit; the engine grows each hit into a bounded span, scores it, and tags
//! its geographic scope. Everything here is pure and deterministic: the same
//! text and pattern set always yield the same candidates with the same
//! scores.

mod engine;
mod geo;
mod patterns;
mod types;

pub use engine::RuleEngine;
pub use geo::detect_scope;
pub use patterns::PatternLibrary;
pub use types::{CandidateRule, GeographicScope, Rule, RuleType};

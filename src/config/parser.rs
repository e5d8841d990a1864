use crate::config::types::Config;
use crate::config::validation::validate_config;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and validates configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> ConfigResult<Config> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(contents: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Computes the SHA-256 hash of a config file's contents
///
/// Stored with each run so result rows can be traced back to the exact
/// thresholds and pattern set that produced them.
pub fn compute_config_hash(contents: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads configuration and returns it with its content hash
pub fn load_config_with_hash<P: AsRef<Path>>(path: P) -> ConfigResult<(Config, String)> {
    let contents = std::fs::read_to_string(path)?;
    let config = parse_config(&contents)?;
    let hash = compute_config_hash(&contents);
    Ok((config, hash))
}

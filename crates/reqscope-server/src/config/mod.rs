//! Server config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use reqscope_core::error::{Result, ScopeError};

pub use schema::{
    MetricsSection, RequestLabel, ScopeConfig, ServerSection, SyntheticLoadSection, TracingSection,
};

pub fn load_from_file(path: &str) -> Result<ScopeConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ScopeError::Config(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

/// Like `load_from_file`, but a missing file yields the defaults.
pub fn load_or_default(path: &str) -> Result<ScopeConfig> {
    match fs::read_to_string(path) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(%path, "config file not found, using defaults");
            Ok(ScopeConfig::default())
        }
        Err(e) => Err(ScopeError::Config(format!("read config failed: {e}"))),
    }
}

pub fn load_from_str(s: &str) -> Result<ScopeConfig> {
    let cfg: ScopeConfig = serde_yaml::from_str(s)
        .map_err(|e| ScopeError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

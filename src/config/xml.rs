//! XML configuration support (quick_xml + serde).
//!
//! Notes:
//! - Every element is optional; missing ones keep `Config::default()` values.
//! - Unknown elements are rejected so typos surface instead of being ignored.
//! - Nothing is ever written: a missing default config simply means defaults.

use anyhow::{Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::paths::default_config_path;
use super::types::{Config, LogLevel};
use super::CONFIG_ENV;

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    hide_artifacts: Option<bool>,
    sync_dir: Option<bool>,
    log_level: Option<String>,
    json_logs: Option<bool>,
}

fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();
    if let Some(v) = parsed.hide_artifacts {
        cfg.hide_artifacts = v;
    }
    if let Some(v) = parsed.sync_dir {
        cfg.sync_dir = v;
    }
    if let Some(v) = parsed.json_logs {
        cfg.json_logs = v;
    }
    if let Some(s) = parsed.log_level.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.log_level = trimmed
                .parse::<LogLevel>()
                .map_err(anyhow::Error::msg)?;
        }
    }
    Ok(cfg)
}

/// Load a Config from a specific XML file.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed).with_context(|| format!("invalid value in config xml '{}'", path.display()))
}

/// Resolve the effective Config.
///
/// Order:
///  - `$ATOMIC_TRANSFORM_CONFIG`: must exist and parse
///  - default per-platform path: used if present
///  - `Config::default()`
pub fn load_config() -> Result<Config> {
    let explicit = env::var_os(CONFIG_ENV).is_some();
    let path = match default_config_path() {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "no config path; using defaults");
            return Ok(Config::default());
        }
    };
    if !explicit && !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(Config::default());
    }
    let cfg = load_config_from_xml_path(&path)?;
    debug!(path = %path.display(), ?cfg, "loaded config");
    Ok(cfg)
}

impl Config {
    /// Shorthand for [`load_config`].
    pub fn load() -> Result<Self> {
        load_config()
    }
}

//! Default config path.

use anyhow::{anyhow, Result};
use dirs::config_dir;
use std::env;
use std::path::PathBuf;

use super::CONFIG_ENV;

/// Config path in effect: `$ATOMIC_TRANSFORM_CONFIG` if set, else the
/// OS-appropriate `<config_dir>/atomic_transform/config.xml`.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(p) = env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(p));
    }
    if let Some(base) = config_dir() {
        return Ok(base.join("atomic_transform").join("config.xml"));
    }
    env::var_os("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join("atomic_transform")
                .join("config.xml")
        })
        .ok_or_else(|| anyhow!("cannot determine a config directory (no config dir and no HOME)"))
}

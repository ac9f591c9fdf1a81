//! Config module.
//! Provides configuration types, the default config path, and XML loading.

pub mod paths;
pub mod types;
pub mod xml;

pub use paths::default_config_path;
pub use types::{Config, LogLevel};
pub use xml::{load_config, load_config_from_xml_path};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ATOMIC_TRANSFORM_CONFIG";

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

/// File name of the config inside the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Written by `tl init`. Every value shown is the default.
pub const CONFIG_TEMPLATE: &str = r##"# taskline configuration. Uncomment to override defaults.

[echo]
# how long a just-completed task due today stays visible (milliseconds)
# grace_ms = 1000

[lifecycle]
# un-completing a task returns it to the list it was archived from
# instead of the unsorted bucket
# uncomplete_restores_list = false

[store]
# attempts per store call, including the first
# retry_attempts = 3
# retry_base_delay_ms = 50

[log]
# tracing filter used when TASKLINE_LOG is not set
# filter = "warn"
"##;

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read `config.toml` from the data directory. A missing file yields the
/// defaults.
pub fn read_config(store_dir: &Path) -> Result<Config, ConfigError> {
    let path = store_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    parse_config(&text).map_err(|e| ConfigError::ParseError { path, source: e })
}

pub fn parse_config(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

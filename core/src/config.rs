//! Configuration models and loaders for buildglue runs.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Defaults applied to every command run through a [`crate::ProcessRunner`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Working directory for commands; inherited when unset.
    pub working_dir: Option<PathBuf>,
    /// Whether merged command output is kept and returned.
    pub capture_output: bool,
    /// `tracing` filter directive used when `RUST_LOG` is not set.
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_dir: None,
            capture_output: true,
            log_filter: None,
        }
    }
}

/// Load configuration from the provided path.
///
/// Expected TOML keys, all optional:
/// - `working_dir` as a path string
/// - `capture_output` as a boolean (defaults to `true`)
/// - `log_filter` as a tracing filter directive, e.g. `"debug"`
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Config {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(path, &raw)
}

fn parse_config(path: &Path, raw: &str) -> Result<Config> {
    toml::from_str(raw).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

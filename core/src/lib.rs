//! Core crate for the buildglue workspace: command-line argument parsing
//! and synchronous subprocess execution.

pub mod args;
pub mod config;
pub mod process;
pub mod runner;

pub use args::{ArgumentError, ArgumentErrors, ArgumentSet, ArgumentVector, Validator};
pub use config::Config;
pub use process::{
    execute, execute_command, execute_command_with_output, CommandLine, CommandLineResult,
};
pub use runner::{CommandRunner, ProcessRunner};

use std::path::PathBuf;
use thiserror::Error;

/// Common error type for the buildglue core crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The command could not be launched, or reading its output or waiting
    /// for it failed.
    #[error("Failed to execute command `{command}`: {source}")]
    Execution {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Convenient alias for results returned by the core crate.
pub type Result<T> = std::result::Result<T, Error>;

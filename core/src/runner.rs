//! Command runner abstractions.

use crate::process::{execute, CommandLine, CommandLineResult};
use crate::{Config, Result};
use std::path::PathBuf;

/// Trait describing how to execute commands.
pub trait CommandRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandLineResult>;
}

/// Runs commands as child processes, blocking until each one exits.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    working_dir: Option<PathBuf>,
    capture_output: bool,
}

impl ProcessRunner {
    /// A runner that inherits the working directory and discards output.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            working_dir: config.working_dir.clone(),
            capture_output: config.capture_output,
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandLineResult> {
        execute(command, self.working_dir.as_deref(), self.capture_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn runner_applies_settings() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().canonicalize().unwrap();
        let runner = ProcessRunner::new().working_dir(&expected).capture_output(true);

        let result = runner.run(&CommandLine::new("pwd")).unwrap();
        assert_eq!(result.output(), Some(format!("{}\n", expected.display()).as_str()));
    }

    #[test]
    #[cfg(unix)]
    fn default_runner_discards_output() {
        let result = ProcessRunner::new().run(&CommandLine::new("echo").arg("hi")).unwrap();
        assert!(result.success());
        assert_eq!(result.output(), None);
    }

    #[test]
    #[cfg(unix)]
    fn runner_from_config() {
        let config = Config::default();
        let runner = ProcessRunner::from_config(&config);
        let result = runner.run(&CommandLine::new("echo").arg("hi")).unwrap();
        assert_eq!(result.output(), Some("hi\n"));
    }
}

//! Synchronous execution of external commands.
//!
//! The child's stderr shares one pipe with its stdout, so callers see a single
//! merged stream in whatever order the child wrote it. The stream is always
//! drained to EOF before waiting on the child, which keeps a chatty child from
//! blocking on a full pipe.

use crate::{Error, Result};
use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// A program followed by its arguments, plus an optional working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Build from a token sequence whose first token is the program.
    /// Returns `None` for an empty sequence.
    pub fn from_tokens<I, S>(tokens: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens = tokens.into_iter().map(Into::into);
        let program = tokens.next()?;
        Some(Self {
            program,
            args: tokens.collect(),
            working_dir: None,
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Program and arguments as one sequence.
    pub fn entire_command(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entire_command().join(" "))
    }
}

/// Outcome of one completed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLineResult {
    exit_code: i32,
    output: Option<String>,
}

impl CommandLineResult {
    pub fn new(exit_code: i32, output: Option<String>) -> Self {
        Self { exit_code, output }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Merged stdout and stderr, one `\n`-terminated line per line read.
    /// `None` unless output was captured.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

}

/// Execute `command` without capturing its output.
pub fn execute_command(command: &CommandLine) -> Result<CommandLineResult> {
    execute(command, None, false)
}

/// Execute `command` and capture its merged output.
pub fn execute_command_with_output(command: &CommandLine) -> Result<CommandLineResult> {
    execute(command, None, true)
}

/// Run `command` to completion.
///
/// `working_dir` takes precedence over the command's own working directory;
/// with neither, the child inherits the caller's. Output is read whether or
/// not `capture_output` is set.
pub fn execute(
    command: &CommandLine,
    working_dir: Option<&Path>,
    capture_output: bool,
) -> Result<CommandLineResult> {
    run(command, working_dir, capture_output).map_err(|source| Error::Execution {
        command: command.to_string(),
        source,
    })
}

fn run(
    command: &CommandLine,
    working_dir: Option<&Path>,
    capture_output: bool,
) -> io::Result<CommandLineResult> {
    if command.program.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
    }

    let (reader, writer) = os_pipe::pipe()?;
    let writer_clone = writer.try_clone()?;

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(writer_clone);
    if let Some(dir) = working_dir.or(command.working_dir()) {
        cmd.current_dir(dir);
    }

    debug!(command = %command, "spawning process");
    let mut child = cmd.spawn()?;
    // The Command still owns both write ends; EOF never arrives until they are closed.
    drop(cmd);

    let output = drain(reader, capture_output)?;
    let status = child.wait()?;
    let exit_code = exit_code(status);
    debug!(command = %command, exit_code, "process exited");

    Ok(CommandLineResult::new(exit_code, output))
}

fn drain(reader: os_pipe::PipeReader, capture_output: bool) -> io::Result<Option<String>> {
    let mut reader = BufReader::new(reader);
    let mut output = capture_output.then(String::new);
    let mut line = Vec::new();
    while read_line(&mut reader, &mut line)? {
        if let Some(output) = output.as_mut() {
            output.push_str(&String::from_utf8_lossy(&line));
            output.push('\n');
        }
    }
    Ok(output)
}

/// Read one line into `line`, without its terminator. A line ends at `\n`,
/// `\r\n`, a lone `\r`, or EOF. Returns `false` once nothing is left.
fn read_line<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<bool> {
    line.clear();
    let mut read_any = false;
    loop {
        let (terminator, used) = {
            let available = match reader.fill_buf() {
                Ok(buf) => buf,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            if available.is_empty() {
                return Ok(read_any);
            }
            read_any = true;
            match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(i) => {
                    line.extend_from_slice(&available[..i]);
                    (Some(available[i]), i + 1)
                }
                None => {
                    line.extend_from_slice(available);
                    (None, available.len())
                }
            }
        };
        reader.consume(used);

        match terminator {
            Some(b'\r') => {
                if reader.fill_buf()?.first() == Some(&b'\n') {
                    reader.consume(1);
                }
                return Ok(true);
            }
            Some(_) => return Ok(true),
            None => {}
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => 128 + signal,
        None => -1,
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_status: ExitStatus) -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entire_command_and_display() {
        let cmd = CommandLine::new("git").arg("commit").args(["-m", "msg"]);
        assert_eq!(cmd.entire_command(), vec!["git", "commit", "-m", "msg"]);
        assert_eq!(cmd.to_string(), "git commit -m msg");
        assert_eq!(cmd.working_dir(), None);
    }

    #[test]
    fn from_tokens_splits_program() {
        let cmd = CommandLine::from_tokens(["ls", "-l"]).unwrap();
        assert_eq!(cmd.program(), "ls");
        assert_eq!(cmd.get_args().to_vec(), vec!["-l"]);
        assert!(CommandLine::from_tokens(Vec::<String>::new()).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn echo_captures_output() {
        let result = execute(&CommandLine::new("echo").arg("hello"), None, true).unwrap();
        assert_eq!(result.exit_code(), 0);
        assert!(result.success());
        assert_eq!(result.output(), Some("hello\n"));
    }

    #[test]
    #[cfg(unix)]
    fn false_reports_failure_without_output() {
        let result = execute(&CommandLine::new("false"), None, false).unwrap();
        assert_ne!(result.exit_code(), 0);
        assert_eq!(result.output(), None);
    }

    #[test]
    #[cfg(unix)]
    fn stderr_is_merged_into_output() {
        let cmd = CommandLine::new("sh").args(["-c", "echo out; echo err 1>&2; exit 3"]);
        let result = execute_command_with_output(&cmd).unwrap();
        assert_eq!(result.exit_code(), 3);
        assert_eq!(result.output(), Some("out\nerr\n"));
    }

    #[test]
    #[cfg(unix)]
    fn final_line_without_newline_gets_one() {
        let cmd = CommandLine::new("printf").arg("a\\r\\nb");
        let result = execute_command_with_output(&cmd).unwrap();
        assert_eq!(result.output(), Some("a\nb\n"));
    }

    #[test]
    #[cfg(unix)]
    fn lone_carriage_return_ends_a_line() {
        let cmd = CommandLine::new("printf").arg("ab\\rcd\\n");
        let result = execute_command_with_output(&cmd).unwrap();
        assert_eq!(result.output(), Some("ab\ncd\n"));
    }

    #[test]
    fn line_terminators() {
        let mut reader = io::Cursor::new(b"a\rb\r\nc\n\nd\r".to_vec());
        let mut line = Vec::new();
        let mut lines = Vec::new();
        while read_line(&mut reader, &mut line).unwrap() {
            lines.push(String::from_utf8(line.clone()).unwrap());
        }
        assert_eq!(lines, vec!["a", "b", "c", "", "d"]);
    }

    #[test]
    fn carriage_return_split_across_reads() {
        let inner = io::Cursor::new(b"progress\r\ndone".to_vec());
        let mut reader = BufReader::with_capacity(9, inner);
        let mut line = Vec::new();
        assert!(read_line(&mut reader, &mut line).unwrap());
        assert_eq!(line, b"progress");
        assert!(read_line(&mut reader, &mut line).unwrap());
        assert_eq!(line, b"done");
        assert!(!read_line(&mut reader, &mut line).unwrap());
    }

    #[test]
    #[cfg(unix)]
    fn large_output_is_drained_without_capture() {
        let cmd = CommandLine::new("sh").args(["-c", "yes line | head -n 200000"]);
        let result = execute_command(&cmd).unwrap();
        assert_eq!(result.exit_code(), 0);
        assert_eq!(result.output(), None);
    }

    #[test]
    #[cfg(unix)]
    fn working_dir_argument_overrides_command() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let expected = dir.path().canonicalize().unwrap();

        let cmd = CommandLine::new("pwd").current_dir(other.path());
        let result = execute(&cmd, Some(expected.as_path()), true).unwrap();
        assert_eq!(result.output(), Some(format!("{}\n", expected.display()).as_str()));

        let cmd = CommandLine::new("pwd").current_dir(&expected);
        let result = execute_command_with_output(&cmd).unwrap();
        assert_eq!(result.output(), Some(format!("{}\n", expected.display()).as_str()));
    }

    #[test]
    #[cfg(unix)]
    fn signal_exit_code() {
        let cmd = CommandLine::new("sh").args(["-c", "kill -9 $$"]);
        let result = execute_command(&cmd).unwrap();
        assert_eq!(result.exit_code(), 128 + 9);
    }

    #[test]
    fn missing_executable_is_execution_failure() {
        let cmd = CommandLine::new("buildglue-definitely-not-a-program");
        let err = execute_command(&cmd).unwrap_err();
        match err {
            Error::Execution { command, source } => {
                assert_eq!(command, "buildglue-definitely-not-a-program");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_program_is_execution_failure() {
        let err = execute_command(&CommandLine::new("")).unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
    }

    #[test]
    #[cfg(unix)]
    fn missing_working_dir_is_execution_failure() {
        let cmd = CommandLine::new("true");
        let err = execute(&cmd, Some(Path::new("/nonexistent/buildglue/dir")), false).unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
    }
}

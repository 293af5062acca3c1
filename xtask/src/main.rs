use buildglue_core::{CommandLine, CommandRunner, ProcessRunner};
use clap::{Parser, ValueEnum};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Utility tasks for developing the buildglue workspace")]
struct Xtask {
    /// Task to run
    task: Task,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Task {
    Format,
    Build,
    Check,
    Test,
}

impl Task {
    fn commands(self) -> Vec<CommandLine> {
        let cargo = |args: &[&str]| CommandLine::new("cargo").args(args.iter().copied());
        match self {
            Task::Format => vec![cargo(&["fmt", "--all"])],
            Task::Build => vec![cargo(&["build", "--workspace"])],
            Task::Check => vec![
                cargo(&["fmt", "--all", "--", "--check"]),
                cargo(&["clippy", "--workspace", "--all-targets"]),
            ],
            Task::Test => vec![cargo(&["test", "--workspace"])],
        }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Xtask::parse();
    let runner = ProcessRunner::new().capture_output(true);

    for command in cli.task.commands() {
        info!(command = %command, "running");
        match runner.run(&command) {
            Ok(result) => {
                if let Some(output) = result.output() {
                    print!("{output}");
                }
                if !result.success() {
                    error!(command = %command, exit_code = result.exit_code(), "task step failed");
                    return ExitCode::FAILURE;
                }
            }
            Err(err) => {
                error!(error = %err, "task step could not run");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

use buildglue_core::config::load_config;
use buildglue_core::{
    ArgumentSet, ArgumentVector, CommandLine, CommandRunner, Config, ProcessRunner, Validator,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Options accepted by `buildglue`.
///
/// `--command` is repeated once per token: the first occurrence names the
/// program, later ones are its arguments.
#[derive(Debug)]
struct RunArguments {
    command: Vec<String>,
    workdir: Option<PathBuf>,
    config: Option<PathBuf>,
    quiet: bool,
}

impl ArgumentSet for RunArguments {
    fn validate(v: &mut Validator<'_>) -> Self {
        RunArguments {
            command: v.required_list("--command"),
            workdir: v.optional("--workdir").map(PathBuf::from),
            config: v.optional("--config").map(PathBuf::from),
            quiet: v.flag("--quiet"),
        }
    }
}

fn main() -> ExitCode {
    let args = match RunArguments::from_args(ArgumentVector::from_env()) {
        Ok(args) => args,
        Err(errors) => {
            eprintln!("{errors}");
            return ExitCode::from(2);
        }
    };

    let config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("buildglue: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    init_tracing(&config);

    let mut runner = ProcessRunner::from_config(&config);
    if let Some(dir) = args.workdir {
        runner = runner.working_dir(dir);
    }
    if args.quiet {
        runner = runner.capture_output(false);
    }

    let Some(command) = CommandLine::from_tokens(args.command) else {
        eprintln!("buildglue: no command given");
        return ExitCode::from(2);
    };

    match runner.run(&command) {
        Ok(result) => {
            if let Some(output) = result.output() {
                print!("{output}");
            }
            info!(command = %command, exit_code = result.exit_code(), "command finished");
            ExitCode::from(exit_byte(result.exit_code()))
        }
        Err(err) => {
            error!(error = %err, "command failed to run");
            eprintln!("buildglue: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &Config) {
    let default_filter = config.log_filter.as_deref().unwrap_or("info");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

use std::path::PathBuf;
use std::process::{self, ExitStatus};

use docopt::Docopt;
use log::{debug, error};
use nix::unistd::Pid;
use serde_derive::Deserialize;

use fcsh::errors::*;
use fcsh::{Shell, ShellConfig, ShellExitStatusExt};

const COMMAND_HISTORY_CAPACITY: usize = 20;
const LOG_FILE_NAME: &str = ".fcsh_log";

const USAGE: &str = "
fcsh.

Usage:
    fcsh [options]
    fcsh [options] -c <command>
    fcsh [options] <file>
    fcsh (-h | --help)
    fcsh --version

Options:
    -h --help       Show this screen.
    --version       Show version.
    -c              If the -c option is present, then commands are read from the first non-option
                        argument command_string.
    --log=<path>    File to write log to, defaults to ~/.fcsh_log
    --max-jobs=<n>  Number of background jobs tracked at once [default: 64].
";

/// Docopts input arguments.
#[derive(Debug, Deserialize)]
struct Args {
    arg_command: Option<String>,
    arg_file: Option<String>,
    flag_version: bool,
    flag_c: bool,
    flag_log: Option<String>,
    flag_max_jobs: usize,
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    init_logger(&args.flag_log);
    debug!("{:?}", args);

    if args.flag_version {
        println!("fcsh version {}", env!("CARGO_PKG_VERSION"));
    } else if args.flag_c || args.arg_file.is_some() {
        execute_from_command_string_or_file(&args);
    } else {
        execute_from_stdin(&args);
    }
}

/// Sends log records to the log file. Without a usable file the shell runs
/// with logging disabled.
fn init_logger(path: &Option<String>) {
    let log_path = match path.clone().map(PathBuf::from).or_else(default_log_path) {
        Some(log_path) => log_path,
        None => return,
    };

    let log_file = match fern::log_file(&log_path) {
        Ok(log_file) => log_file,
        Err(e) => {
            eprintln!("fcsh: cannot open log file {}: {}", log_path.display(), e);
            return;
        }
    };

    let pid = Pid::this();
    let result = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                pid,
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Trace)
        .chain(log_file)
        .apply();
    if let Err(e) = result {
        eprintln!("fcsh: cannot install logger: {}", e);
    }
}

fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(LOG_FILE_NAME))
}

fn execute_from_command_string_or_file(args: &Args) -> ! {
    let shell_config = ShellConfig::noninteractive().with_job_capacity(args.flag_max_jobs);
    let mut shell = Shell::new(shell_config).unwrap_or_else(|e| display_error_and_exit(&e));

    let result = match (&args.arg_command, &args.arg_file) {
        (Some(command), _) => shell.execute_command_string(command),
        (None, Some(file_path)) => shell.execute_commands_from_file(file_path),
        (None, None) => Ok(()),
    };

    exit(result, &mut shell);
}

fn execute_from_stdin(args: &Args) -> ! {
    let shell_config =
        ShellConfig::interactive(COMMAND_HISTORY_CAPACITY).with_job_capacity(args.flag_max_jobs);
    let mut shell = Shell::new(shell_config).unwrap_or_else(|e| display_error_and_exit(&e));
    shell.execute_from_stdin();
    shell.exit(Some(ExitStatus::from_success()))
}

fn display_error_and_exit(error: &Error) -> ! {
    error!("failed to create shell: {}", error);
    eprintln!("fcsh: {}", error.message());
    process::exit(ExitStatus::from_failure().code().unwrap_or(1));
}

/// End of input is a clean exit whatever the last command returned.
fn exit(result: Result<()>, shell: &mut Shell) -> ! {
    if let Err(e) = result {
        eprintln!("fcsh: {}", e.message());
        shell.exit(Some(ExitStatus::from_failure()));
    } else {
        shell.exit(Some(ExitStatus::from_success()));
    }
}

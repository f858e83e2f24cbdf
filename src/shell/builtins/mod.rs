//! Fcsh builtins
//!
//! This module includes the implementations of common shell builtin commands.
//! Where possible the commands conform to their standard Bash counterparts.

use std::iter;

use docopt::Docopt;
use serde::de::DeserializeOwned;

use self::prelude::*;

use self::dirs::Cd;
use self::env::{Set, Unset};
use self::exit::Exit;
use self::help::Help;
use self::history::History;
use self::jobs::Jobs;

pub mod prelude {
    pub use std::io::Write;
    pub use std::process::ExitStatus;

    pub use super::parse_args;
    pub use crate::errors::{Error, ErrorKind, Result};
    pub use crate::shell::Shell;
    pub use crate::util::ShellExitStatusExt;
}

mod dirs;
mod env;
mod exit;
mod help;
mod history;
mod jobs;

const CD_NAME: &str = "cd";
const EXIT_NAME: &str = "exit";
const HELP_NAME: &str = "help";
const HISTORY_NAME: &str = "history";
const JOBS_NAME: &str = "jobs";
const SET_NAME: &str = "set";
const UNSET_NAME: &str = "unset";

/// Exit status for a builtin given arguments it cannot parse.
const USAGE_EXIT_STATUS: i32 = 2;

/// Represents a Fcsh builtin command such as cd or help.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;
    /// The help string to display to the user.
    const HELP: &'static str;
    /// The usage string to display to the user.
    fn usage() -> &'static str {
        Self::HELP.lines().next().unwrap_or(Self::NAME)
    }
    /// Runs the command with the given arguments in the `shell` environment.
    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()>;
}

pub fn is_builtin<T: AsRef<str>>(program: T) -> bool {
    [
        CD_NAME,
        EXIT_NAME,
        HELP_NAME,
        HISTORY_NAME,
        JOBS_NAME,
        SET_NAME,
        UNSET_NAME,
    ]
    .contains(&program.as_ref())
}

/// precondition: command is a builtin.
/// Returns (`exit_status_code`, `builtin_result`)
pub fn run<S1, S2>(
    shell: &mut Shell,
    program: S1,
    args: &[S2],
    stdout: &mut dyn Write,
) -> (ExitStatus, Result<()>)
where
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    debug_assert!(is_builtin(&program));

    let result = match program.as_ref() {
        CD_NAME => Cd::run(shell, args, stdout),
        EXIT_NAME => Exit::run(shell, args, stdout),
        HELP_NAME => Help::run(shell, args, stdout),
        HISTORY_NAME => History::run(shell, args, stdout),
        JOBS_NAME => Jobs::run(shell, args, stdout),
        SET_NAME => Set::run(shell, args, stdout),
        UNSET_NAME => Unset::run(shell, args, stdout),
        other => Err(Error::builtin_command(
            format!("{}: not a shell builtin", other),
            1,
        )),
    };

    let exit_status = get_builtin_exit_status(&result);
    (exit_status, result)
}

fn get_builtin_exit_status(result: &Result<()>) -> ExitStatus {
    let status = match *result {
        Ok(()) => 0,
        Err(ref e) => e.exit_code(),
    };

    ExitStatus::from_status(status)
}

/// Parses a builtin's arguments against the docopt `usage` text.
pub fn parse_args<D, S, I>(usage: &str, program: &str, args: I) -> Result<D>
where
    D: DeserializeOwned,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let argv = iter::once(program.to_string())
        .chain(args.into_iter().map(|a| a.as_ref().to_string()));
    Docopt::new(usage)
        .and_then(|d| d.help(false).argv(argv).deserialize())
        .map_err(|e| Error::builtin_command(format!("{}: {}", program, e), USAGE_EXIT_STATUS))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;

    use crate::shell::ShellConfig;

    #[test]
    fn test_is_builtin() {
        for name in &["cd", "exit", "help", "history", "jobs", "set", "unset"] {
            assert!(is_builtin(name), "{}", name);
        }
        assert!(!is_builtin("ls"));
        assert!(!is_builtin("kill"));
    }

    #[test]
    fn test_failed_builtin_status() {
        let mut shell = Shell::new(ShellConfig::noninteractive()).unwrap();
        let (status, result) = run(&mut shell, "unset", &["1abc"], &mut io::sink());
        assert!(result.is_err());
        assert_eq!(status.code(), Some(1));

        let (status, result) = run(&mut shell, "history", &["-x"], &mut io::sink());
        assert!(result.is_err());
        assert_eq!(status.code(), Some(USAGE_EXIT_STATUS));
    }
}

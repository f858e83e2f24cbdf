use crate::shell::builtins::{self, prelude::*, BuiltinCommand};
use crate::shell::builtins::{
    dirs::Cd,
    env::{Set, Unset},
    exit::Exit,
    history::History,
    jobs::Jobs,
};

pub struct Help;

impl builtins::BuiltinCommand for Help {
    const NAME: &'static str = builtins::HELP_NAME;

    const HELP: &'static str = "\
help: help [command ...]
    Display helpful information about builtin commands. If COMMAND is specified,
    gives detailed help on all commands matching COMMAND, otherwise a list of the
    builtins is printed.";

    fn run<T: AsRef<str>>(_shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        if args.is_empty() {
            for usage in &[
                Cd::usage(),
                Exit::usage(),
                Help::usage(),
                History::usage(),
                Jobs::usage(),
                Set::usage(),
                Unset::usage(),
            ] {
                writeln!(stdout, "{}", usage)?;
            }
            return Ok(());
        }

        let mut all_invalid = true;
        for arg in args {
            let msg = match arg.as_ref() {
                builtins::CD_NAME => Some(Cd::HELP),
                builtins::EXIT_NAME => Some(Exit::HELP),
                builtins::HELP_NAME => Some(Help::HELP),
                builtins::HISTORY_NAME => Some(History::HELP),
                builtins::JOBS_NAME => Some(Jobs::HELP),
                builtins::SET_NAME => Some(Set::HELP),
                builtins::UNSET_NAME => Some(Unset::HELP),
                _ => None,
            };
            if let Some(msg) = msg {
                writeln!(stdout, "{}", msg)?;
                all_invalid = false;
            }
        }

        if all_invalid {
            let topics = args
                .iter()
                .map(|arg| arg.as_ref())
                .collect::<Vec<&str>>()
                .join(" ");
            return Err(Error::builtin_command(
                format!("help: no help topics match `{}'", topics),
                1,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::shell::ShellConfig;

    fn help(args: &[&str]) -> (String, Result<()>) {
        let mut shell = Shell::new(ShellConfig::noninteractive()).unwrap();
        let mut out = Vec::new();
        let result = Help::run(&mut shell, args, &mut out);
        (String::from_utf8(out).unwrap(), result)
    }

    #[test]
    fn lists_every_builtin() {
        let (out, result) = help(&[]);
        assert!(result.is_ok());
        assert_eq!(out.lines().count(), 7);
        assert!(out.starts_with("cd: cd [dir]\n"));
    }

    #[test]
    fn known_topic() {
        let (out, result) = help(&["nope", "jobs"]);
        assert!(result.is_ok());
        assert!(out.starts_with("jobs: jobs\n"));
    }

    #[test]
    fn unknown_topic() {
        let (out, result) = help(&["nope"]);
        assert!(out.is_empty());
        assert_eq!(result.unwrap_err().exit_code(), 1);
    }
}

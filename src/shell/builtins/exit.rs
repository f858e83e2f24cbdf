use log::warn;

use crate::shell::builtins::{self, prelude::*};

pub struct Exit;

impl builtins::BuiltinCommand for Exit {
    const NAME: &'static str = builtins::EXIT_NAME;

    const HELP: &'static str = "\
exit: exit [n]
    Exit the shell with a status of N. If N is omitted, the exit status
    is 0. Background jobs keep running.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        if !shell.jobs().is_empty() {
            warn!("exiting with {} background jobs", shell.jobs().len());
        }

        let status_code = match args.first() {
            None => 0,
            Some(arg) => arg.as_ref().parse::<i32>().unwrap_or_else(|_| {
                eprintln!("fcsh: exit: {}: numeric argument required", arg.as_ref());
                2
            }),
        };

        stdout.flush()?;
        shell.exit(Some(ExitStatus::from_status(status_code)));
    }
}

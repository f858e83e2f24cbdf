use log::debug;
use serde_derive::Deserialize;

use crate::shell::builtins::{self, prelude::*};

pub struct History;

#[derive(Debug, Deserialize)]
struct HistoryArgs {
    arg_n: Option<String>,
    flag_c: bool,
}

impl builtins::BuiltinCommand for History {
    const NAME: &'static str = builtins::HISTORY_NAME;

    const HELP: &'static str = "\
history: history [-c] [<n>]
    Display the history list with line numbers. Argument of N
    says to list only the last N lines. The `-c' option causes
    the history list to be cleared by deleting all of the entries.

Usage:
    history [-c] [<n>]";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        let args: HistoryArgs = parse_args(Self::HELP, Self::NAME, args)?;
        debug!("{:?}", args);

        if args.flag_c {
            shell.editor_mut().clear_history();
            return Ok(());
        }

        let n_last_entries = match args.arg_n {
            Some(ref n) => n.parse::<usize>().map_err(|_| {
                Error::builtin_command(
                    format!("history: {}: nonnegative numeric argument required", n),
                    1,
                )
            })?,
            None => shell.editor().history_len(),
        };

        let editor = shell.editor();
        let skip = editor.history_len().saturating_sub(n_last_entries);
        for (number, entry) in editor.history_entries().skip(skip) {
            writeln!(stdout, "\t{}\t{}", number, entry)?;
        }

        Ok(())
    }
}

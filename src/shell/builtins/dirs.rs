use std::env;
use std::path::PathBuf;

use crate::shell::builtins::{self, prelude::*};

pub struct Cd;

impl builtins::BuiltinCommand for Cd {
    const NAME: &'static str = builtins::CD_NAME;

    const HELP: &'static str = "\
cd: cd [dir]
    Change the current directory to DIR. The home directory is the default DIR.
    If DIR is '-', then the current directory will be the variable $OLDPWD,
    which is the last working directory.";

    fn run<T: AsRef<str>>(_shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        let dir = match args.first().map(|arg| arg.as_ref()) {
            None | Some("~") => ::dirs::home_dir()
                .ok_or_else(|| Error::builtin_command("cd: HOME not set", 1))?,
            Some("-") => match env::var_os("OLDPWD") {
                Some(val) => {
                    let dir = PathBuf::from(val);
                    writeln!(stdout, "{}", dir.display())?;
                    dir
                }
                None => return Err(Error::builtin_command("cd: OLDPWD not set", 1)),
            },
            Some(val) => PathBuf::from(val),
        };

        let previous = env::current_dir()?;
        env::set_current_dir(&dir).map_err(|e| {
            Error::builtin_command(format!("cd: {}: {}", dir.display(), e), 1)
        })?;
        env::set_var("OLDPWD", previous);
        env::set_var("PWD", env::current_dir()?);
        Ok(())
    }
}

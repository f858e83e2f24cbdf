use std::env;

use crate::core::variables;
use crate::shell::builtins::{self, prelude::*};

pub struct Set;

impl builtins::BuiltinCommand for Set {
    const NAME: &'static str = builtins::SET_NAME;

    const HELP: &'static str = "\
set: set
    Display the shell variables as `name=value`, in the order they were
    first assigned. Assign a variable with `name=value`.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        if !args.is_empty() {
            return Err(Error::builtin_command(
                format!("set: usage: {}", Self::usage()),
                2,
            ));
        }

        write!(stdout, "{}", shell.variables())?;
        Ok(())
    }
}

pub struct Unset;

impl builtins::BuiltinCommand for Unset {
    const NAME: &'static str = builtins::UNSET_NAME;

    const HELP: &'static str = "\
unset: unset [name ...]
    For each name, remove the corresponding shell variable, and the
    environment variable of the same name.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        let mut bad_args = Vec::new();
        for arg in args {
            let name = arg.as_ref();
            if !is_identifier(name) {
                bad_args.push(name);
                continue;
            }

            shell.variables_mut().unset(name);
            env::remove_var(name);
        }

        if !bad_args.is_empty() {
            let msg = bad_args
                .iter()
                .map(|arg| format!("unset: {} is not a valid identifier", arg))
                .collect::<Vec<String>>()
                .join("\n");
            return Err(Error::builtin_command(msg, 1));
        }

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    variables::parse_assignment(&format!("{}=", name)).map_or(false, |(n, _)| n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;

    use crate::shell::builtins::BuiltinCommand;
    use crate::shell::ShellConfig;

    macro_rules! generate_unique_env_key {
        () => {
            format!("FCSH_KEY_LINE{}_COLUMN{}", line!(), column!())
        };
    }

    fn shell() -> Shell {
        Shell::new(ShellConfig::noninteractive()).unwrap()
    }

    #[test]
    fn set_prints_in_assignment_order() {
        let mut shell = shell();
        shell.variables_mut().set("B", "2");
        shell.variables_mut().set("A", "1");
        shell.variables_mut().set("B", "3");

        let mut out = Vec::new();
        Set::run(&mut shell, &[] as &[&str], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "B=3\nA=1\n");
    }

    #[test]
    fn set_rejects_arguments() {
        let mut shell = shell();
        assert!(Set::run(&mut shell, &["-x"], &mut io::sink()).is_err());
    }

    #[test]
    fn unset_invalid_identifier() {
        let mut shell = shell();
        let key = generate_unique_env_key!();
        shell.variables_mut().set(key.as_str(), "1");

        assert!(Unset::run(&mut shell, &["", key.as_str(), "=FOO"], &mut io::sink()).is_err());
        assert_eq!(shell.variables().get(&key), None);
    }

    #[test]
    fn unset_multiple() {
        let mut shell = shell();
        let key1 = generate_unique_env_key!();
        let key2 = generate_unique_env_key!();
        shell.variables_mut().set(key1.as_str(), "a");
        shell.variables_mut().set(key2.as_str(), "b");
        env::set_var(&key2, "from env");

        assert!(Unset::run(&mut shell, &[&key1, &key2], &mut io::sink()).is_ok());
        assert!(shell.variables().is_empty());
        assert!(env::var(&key2).is_err());
    }

    #[test]
    fn unset_absent_is_ok() {
        let mut shell = shell();
        assert!(Unset::run(&mut shell, &[generate_unique_env_key!()], &mut io::sink()).is_ok());
    }
}

use crate::shell::builtins::{self, prelude::*};

pub struct Jobs;

impl builtins::BuiltinCommand for Jobs {
    const NAME: &'static str = builtins::JOBS_NAME;

    const HELP: &'static str = "\
jobs: jobs
    Display status of jobs.

    Lists the background jobs that have not been reported as finished, one
    per line as `[N] PID COMMAND`. N is the job's current position, so
    numbers shift down when an earlier job finishes.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        if let Some(arg) = args.first() {
            return Err(Error::builtin_command(
                format!("jobs: {}: unexpected argument\n{}", arg.as_ref(), Self::usage()),
                2,
            ));
        }

        for (number, job) in shell.jobs().list() {
            writeln!(stdout, "[{}] {} {}", number, job.pid(), job.command())?;
        }

        Ok(())
    }
}

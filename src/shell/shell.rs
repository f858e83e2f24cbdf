//! Fcsh - Shell Module
//!
//! The Shell itself is responsible for tracking background jobs, holding the
//! shell variables and maintaining an editor of previous commands.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{self, ExitStatus};

use log::{debug, error, info, warn};

use crate::core::{
    chain,
    lexer::{self, Token},
    pipeline::{CommandSpec, Pipeline},
    variables::{self, Variables},
};
use crate::editor::Editor;
use crate::errors::{Error, ErrorKind, Result, ResultExt};
use crate::shell::{
    builtins,
    conditional::Conditional,
    execute_command::{self, Launch},
    job_control::{self, JobTable, MAX_JOBS},
};
use crate::util::{self, ShellExitStatusExt};

const HISTORY_FILE_NAME: &str = ".fcsh_history";
const PROMPT: &str = "FCIT> ";

/// Fcsh Shell
pub struct Shell {
    /// Responsible for readline and history.
    editor: Editor,
    history_file: Option<PathBuf>,
    jobs: JobTable,
    variables: Variables,
    /// Exit status of last command executed.
    last_exit_status: ExitStatus,
    config: ShellConfig,
    /// Is `false` if standard input is not a terminal.
    is_interactive: bool,
}

impl Shell {
    /// Constructs a new Shell to manage running jobs and command history.
    pub fn new(config: ShellConfig) -> Result<Shell> {
        let mut shell = Shell {
            editor: Editor::with_capacity(config.command_history_capacity),
            history_file: None,
            jobs: JobTable::with_capacity(config.job_capacity),
            variables: Variables::new(),
            last_exit_status: ExitStatus::from_success(),
            config,
            is_interactive: util::isatty(),
        };

        if config.enable_command_history {
            shell.load_history()?
        }

        if shell.is_interactive {
            log_if_err!(
                job_control::ignore_interactive_signals(),
                "ignore_interactive_signals"
            );
        }

        info!("fcsh started up");
        Ok(shell)
    }

    fn load_history(&mut self) -> Result<()> {
        self.history_file = dirs::home_dir().map(|p| p.join(HISTORY_FILE_NAME));
        if let Some(ref history_file) = self.history_file {
            self.editor.load_history(history_file).or_else(|e| {
                if let ErrorKind::HistoryFileNotFound = *e.kind() {
                    debug!("no history at {}", history_file.display());
                    return Ok(());
                }

                Err(e)
            })?;
        } else {
            warn!("unable to get home directory")
        }

        Ok(())
    }

    /// Reads the next line of input.
    /// Returns `None` when end of file is reached.
    pub fn prompt(&mut self) -> Result<Option<String>> {
        self.editor.readline(PROMPT)
    }

    /// Runs one line of input.
    ///
    /// With command history enabled, `!` references are resolved first and
    /// the resolved line is recorded. Errors in individual commands are
    /// reported on stderr and do not stop the rest of the line.
    pub fn execute_command_string(&mut self, input: &str) -> Result<()> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        let mut command = input.to_owned();
        if self.config.enable_command_history {
            if let Err(e) = self.editor.expand_history(&mut command) {
                self.report_error(&e);
                return Ok(());
            }
            self.editor.add_history_entry(&command);
        }

        self.execute_line(&command)
    }

    /// Runs a conditional, or else every `;`-separated segment in order.
    pub(crate) fn execute_line(&mut self, line: &str) -> Result<()> {
        if let Some(conditional) = Conditional::parse(line) {
            return self.execute_conditional(&conditional);
        }

        for segment in chain::split_segments(line) {
            if let Err(e) = self.execute_segment(segment) {
                self.report_error(&e);
            }
        }

        Ok(())
    }

    /// Runs each line of a script file.
    pub fn execute_commands_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let buffer = fs::read_to_string(path)
            .chain_err(|| format!("cannot read {}", path.display()))?;

        for line in buffer.lines() {
            self.do_job_notification();
            self.execute_command_string(line)?;
        }

        Ok(())
    }

    /// Runs jobs from stdin until EOF is received.
    pub fn execute_from_stdin(&mut self) {
        loop {
            // Check the status of background jobs, removing exited ones.
            self.do_job_notification();

            let input = match self.prompt() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!("failed to read input: {}", e);
                    eprintln!("fcsh: {}", e.message());
                    break;
                }
            };

            let temp_result = self.execute_command_string(&input);
            log_if_err!(temp_result, "execute_command_string");
        }
    }

    /// Reports every background job that terminated since the last call.
    pub fn do_job_notification(&mut self) {
        for notification in self.jobs.reap() {
            println!("\n{}", notification);
        }
    }

    /// Runs one segment: a variable assignment, a builtin, or a pipeline.
    fn execute_segment(&mut self, segment: &str) -> Result<()> {
        let tokens = match lexer::tokenize(segment) {
            Some(tokens) => tokens,
            None => return Ok(()),
        };

        if let [Token::Word(ref word)] = tokens[..] {
            if let Some((name, value)) = variables::parse_assignment(word) {
                debug!("{}={}", name, value);
                self.variables.set(name, value);
                self.last_exit_status = ExitStatus::from_success();
                return Ok(());
            }
        }

        let tokens = variables::expand_variables(tokens, &self.variables, dirs::home_dir());
        let pipeline = Pipeline::build(tokens)?;

        if let Some(command) = pipeline.single() {
            if builtins::is_builtin(command.program()) {
                return self.execute_builtin(command);
            }
        }

        match execute_command::launch(&pipeline, &mut self.jobs, &mut io::stdout())? {
            Launch::Foreground(status) => self.last_exit_status = status,
            Launch::Background { .. } => self.last_exit_status = ExitStatus::from_success(),
        }

        Ok(())
    }

    /// Runs a builtin in the shell process. An output redirection receives
    /// what the builtin prints; an input redirection is ignored.
    fn execute_builtin(&mut self, command: &CommandSpec) -> Result<()> {
        let (status, result) = match command.output {
            Some(ref path) => {
                let mut file = open_output(path)?;
                builtins::run(self, command.program(), command.args(), &mut file)
            }
            None => builtins::run(self, command.program(), command.args(), &mut io::stdout()),
        };

        self.last_exit_status = status;
        result
    }

    /// Prints `e` and records the exit status it implies.
    fn report_error(&mut self, e: &Error) {
        warn!("{}", e.message());
        eprintln!("fcsh: {}", e.message());
        self.last_exit_status = ExitStatus::from_status(e.exit_code());
    }

    pub(crate) fn last_exit_status(&self) -> ExitStatus {
        self.last_exit_status
    }

    pub(crate) fn set_last_exit_status(&mut self, status: ExitStatus) {
        self.last_exit_status = status;
    }

    pub(crate) fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub(crate) fn variables(&self) -> &Variables {
        &self.variables
    }

    pub(crate) fn variables_mut(&mut self) -> &mut Variables {
        &mut self.variables
    }

    pub(crate) fn editor(&self) -> &Editor {
        &self.editor
    }

    pub(crate) fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    /// Exit the shell.
    ///
    /// Valid exit codes are between 0 and 255. Like bash and its descendents, it automatically
    /// converts exit codes to a u8 such that positive n becomes n % 256 and negative n becomes
    /// (256 + n) % 256.
    ///
    /// Exit the shell with a status of n. If n is None, then the exit status is that of the last
    /// command executed.
    pub fn exit(&mut self, n: Option<ExitStatus>) -> ! {
        if self.config.display_messages && self.is_interactive {
            println!("exit");
        }

        let code = n
            .unwrap_or(self.last_exit_status)
            .code()
            .unwrap_or(util::SIGNAL_EXIT_STATUS_BASE);
        let code_like_u8 = if code < 0 {
            (256 + code) % 256
        } else {
            code % 256
        };

        if self.config.enable_command_history {
            if let Some(ref history_file) = self.history_file {
                if let Err(e) = self.editor.save_history(history_file) {
                    error!(
                        "error: failed to save history to file during shutdown: {}",
                        e
                    );
                }
            }
        }

        log_if_err!(io::stdout().flush(), "flush stdout");
        info!("fcsh has shut down with {}", code_like_u8);
        process::exit(code_like_u8);
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}\n{:?}", self.jobs, self.editor)
    }
}

/// Opens a builtin's output redirection the same way a child's is opened.
fn open_output(path: &str) -> Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
        .chain_err(|| ErrorKind::Resource(format!("open {}", path)))
}

/// Policy object to control a Shell's behavior
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Determines if new command entries will be added to the shell's command history.
    ///
    /// Note: This is checked before the other command history config fields.
    enable_command_history: bool,

    /// Number of entries to store in the shell's command history
    command_history_capacity: usize,

    /// Determines if some messages (e.g. "exit") should be displayed.
    display_messages: bool,

    /// Maximum number of background jobs tracked at once.
    job_capacity: usize,
}

impl ShellConfig {
    /// Creates an interactive shell, e.g. command history
    ///
    /// # Complete List
    /// - Command History is enabled and history expansions are performed
    /// - Some additional messages are displayed
    pub fn interactive(command_history_capacity: usize) -> ShellConfig {
        ShellConfig {
            enable_command_history: true,
            command_history_capacity,
            display_messages: true,
            ..Default::default()
        }
    }

    /// Creates a noninteractive shell, e.g. no command history
    ///
    /// # Complete List
    /// - Command History is disabled. Commands are not saved and history expansions are not
    ///   performed. The history builtin command is not affected by this option.
    /// - Fewer messages are displayed
    pub fn noninteractive() -> ShellConfig {
        Default::default()
    }

    /// Limits how many background jobs are tracked at once.
    pub fn with_job_capacity(self, job_capacity: usize) -> ShellConfig {
        ShellConfig {
            job_capacity,
            ..self
        }
    }
}

impl Default for ShellConfig {
    fn default() -> ShellConfig {
        ShellConfig {
            enable_command_history: false,
            command_history_capacity: 0,
            display_messages: false,
            job_capacity: MAX_JOBS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> Shell {
        Shell::new(ShellConfig::noninteractive()).unwrap()
    }

    #[test]
    fn test_assignment_sets_variable() {
        let mut shell = shell();
        shell.execute_command_string("GREETING=hello").unwrap();
        assert_eq!(shell.variables().get("GREETING"), Some("hello"));
        assert!(shell.last_exit_status().success());
    }

    #[test]
    fn test_assignments_in_a_chain() {
        let mut shell = shell();
        shell.execute_command_string("A=1; B=2 ;A=3").unwrap();
        let vars: Vec<(&str, &str)> = shell.variables().iter().collect();
        assert_eq!(vars, vec![("A", "3"), ("B", "2")]);
    }

    #[test]
    fn test_syntax_error_sets_status() {
        let mut shell = shell();
        shell.execute_command_string("echo a | b | c").unwrap();
        assert_eq!(shell.last_exit_status().code(), Some(2));

        shell.execute_command_string("echo >").unwrap();
        assert_eq!(shell.last_exit_status().code(), Some(2));
    }

    #[test]
    fn test_later_segment_runs_after_error() {
        let mut shell = shell();
        shell.execute_command_string("cat < ; X=after").unwrap();
        assert_eq!(shell.variables().get("X"), Some("after"));
        assert!(shell.last_exit_status().success());
    }

    #[test]
    fn test_builtin_output_redirect() {
        let dir = tempdir::TempDir::new("fcsh").unwrap();
        let out = dir.path().join("vars.txt");

        let mut shell = shell();
        shell
            .execute_command_string(&format!("ONE=1; TWO=2; set > {}", out.display()))
            .unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "ONE=1\nTWO=2\n");
    }

    #[test]
    fn test_conditional_takes_else_branch_on_syntax_error() {
        let mut shell = shell();
        shell
            .execute_command_string("if echo | ; then X=then; else X=else; fi")
            .unwrap();
        assert_eq!(shell.variables().get("X"), Some("else"));
    }

    #[test]
    fn test_job_capacity() {
        let mut shell = Shell::new(ShellConfig::noninteractive().with_job_capacity(1)).unwrap();
        shell
            .execute_command_string("sleep 0.1 &; sleep 0.1 &")
            .unwrap();
        assert_eq!(shell.jobs().len(), 1);
        assert!(shell.last_exit_status().success());

        let tracked: Vec<_> = shell.jobs().list().map(|(_, job)| job.pid()).collect();
        for pid in tracked {
            let _ = nix::sys::wait::waitpid(pid, None);
        }
    }

    #[test]
    fn test_empty_line_is_noop() {
        let mut shell = shell();
        shell.set_last_exit_status(ExitStatus::from_status(5));
        shell.execute_command_string("   ").unwrap();
        shell.execute_command_string(" ; ; ").unwrap();
        assert_eq!(shell.last_exit_status().code(), Some(5));
    }
}

//! Error module. See the [error-chain](https://crates.io/crates/error-chain) crate for details.
//!
//! Nothing in here is fatal to the interpreter: the shell reports every error
//! on stderr, records an exit status, and moves on to the next segment.

#![allow(deprecated)]

use error_chain::error_chain;

error_chain! {
    foreign_links {
        Docopt(::docopt::Error);
        Io(::std::io::Error);
        Nix(::nix::Error);
        Readline(::rustyline::error::ReadlineError);
    }

    errors {
        /// Malformed redirection, misplaced pipe or background marker, or a
        /// command with no program name.
        Syntax(reason: String) {
            description("syntax error")
            display("syntax error: {}", reason)
        }

        /// Pipe, fork, or file-open failure in the interpreter itself.
        Resource(step: String) {
            description("resource error")
            display("{} failed", step)
        }

        /// The job table has no free slot for a background process.
        JobTableFull(pid: i32) {
            description("job table full")
            display("jobs: job list full, cannot add pid {}", pid)
        }

        /// A builtin failed; `code` becomes the last exit status.
        BuiltinCommandError(message: String, code: i32) {
            description("builtin command error")
            display("{}", message)
        }

        HistoryFileNotFound {
            description("history file not found")
            display("history file not found")
        }
    }
}

impl Error {
    pub(crate) fn syntax<T: AsRef<str>>(reason: T) -> Error {
        ErrorKind::Syntax(reason.as_ref().to_string()).into()
    }

    pub(crate) fn builtin_command<T: AsRef<str>>(message: T, code: i32) -> Error {
        ErrorKind::BuiltinCommandError(message.as_ref().to_string(), code).into()
    }

    /// The error followed by each of its causes, `": "`-separated.
    pub fn message(&self) -> String {
        self.iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(": ")
    }

    /// Exit status recorded when this error aborts a command.
    pub fn exit_code(&self) -> i32 {
        match *self.kind() {
            ErrorKind::Syntax(_) => 2,
            ErrorKind::BuiltinCommandError(_, code) => code,
            _ => 1,
        }
    }

    /// Returns `true` for errors caused by the input line rather than the OS.
    pub fn is_syntax(&self) -> bool {
        match *self.kind() {
            ErrorKind::Syntax(_) => true,
            _ => false,
        }
    }
}

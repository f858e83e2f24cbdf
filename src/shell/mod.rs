//! Shell Module
//!
//! The `Shell` owns everything that lives for the whole session (the job
//! table, shell variables, command history) and drives each input line
//! through the tokenizer, the pipeline builder and the process launcher.

pub use self::shell::{Shell, ShellConfig};

mod builtins;
pub mod conditional;
pub mod execute_command;
pub mod job_control;
#[allow(clippy::module_inception)]
mod shell;

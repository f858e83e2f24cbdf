//! Fcsh - a small command interpreter
//!
//! Reads a line, splits it on `;`, turns each segment into a one- or
//! two-stage pipeline with optional redirections and runs it in the
//! foreground or as a tracked background job.

#![deny(missing_debug_implementations, unused_import_braces)]
#![recursion_limit = "1024"]

/// Logs the error of a `Result` without consuming or propagating it.
macro_rules! log_if_err {
    ($result:expr, $fmt:expr) => {{
        if let Err(ref e) = $result {
            log::error!("{}: {}", $fmt, e);
        }
    }};
    ($result:expr, $fmt:literal, $($arg:tt)*) => {{
        if let Err(ref e) = $result {
            log::error!("{}: {}", format_args!($fmt, $($arg)*), e);
        }
    }};
}

pub mod core;
mod editor;
pub mod errors;
pub mod shell;
pub mod util;

pub use crate::shell::{Shell, ShellConfig};
pub use crate::util::ShellExitStatusExt;

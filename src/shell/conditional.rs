//! `if COND; then A; else B; fi`
//!
//! The construct is recognized on a whole input line. Each part is handed
//! back to the shell as a line of its own, so a branch may chain several
//! segments with `;`. Nesting is not supported.

use std::process::ExitStatus;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::errors::Result;
use crate::shell::Shell;
use crate::util::ShellExitStatusExt;

lazy_static! {
    static ref CONDITIONAL: Regex = Regex::new(
        r"^\s*if\s+(.+?)\s*;?\s+then\s+(.+?)(?:\s*;?\s+else\s+(.+?))?\s*;?\s+fi\s*$"
    )
    .unwrap();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conditional<'a> {
    pub condition: &'a str,
    pub then_branch: &'a str,
    pub else_branch: Option<&'a str>,
}

impl<'a> Conditional<'a> {
    /// Returns `None` unless all of `line` is one conditional.
    pub fn parse(line: &'a str) -> Option<Conditional<'a>> {
        let caps = CONDITIONAL.captures(line)?;
        Some(Conditional {
            condition: caps.get(1)?.as_str(),
            then_branch: caps.get(2)?.as_str(),
            else_branch: caps.get(3).map(|m| m.as_str()),
        })
    }
}

impl Shell {
    /// Runs the condition, then the branch its exit status selects.
    pub(crate) fn execute_conditional(&mut self, conditional: &Conditional<'_>) -> Result<()> {
        self.execute_line(conditional.condition)?;
        let taken = self.last_exit_status().success();
        debug!("{:?}: condition succeeded: {}", conditional, taken);

        if taken {
            self.execute_line(conditional.then_branch)
        } else if let Some(else_branch) = conditional.else_branch {
            self.execute_line(else_branch)
        } else {
            self.set_last_exit_status(ExitStatus::from_success());
            Ok(())
        }
    }
}

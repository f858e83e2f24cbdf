//! Line source for the interactive loop.
//!
//! Reads lines through `rustyline` and remembers the most recent ones for `!`
//! recall and the `history` builtin. Entries are numbered from 1, oldest
//! first, within what is currently remembered: once the list is full the
//! oldest line is forgotten and every number shifts down by one.

use std::io;
use std::path::Path;

use rustyline::{error::ReadlineError, Config};

use crate::errors::{Error, ErrorKind, Result};

/// Marks a history reference at the start of a line.
const RECALL_MARKER: char = '!';

/// Exit status for a reference that matches no remembered line.
const EVENT_NOT_FOUND_EXIT_STATUS: i32 = 1;

#[derive(Debug)]
pub struct Editor {
    line_reader: rustyline::Editor<()>,
}

impl Editor {
    /// An editor remembering at most `history_capacity` lines.
    pub fn with_capacity(history_capacity: usize) -> Editor {
        let config = Config::builder()
            .max_history_size(history_capacity)
            .history_ignore_space(true)
            .build();

        Editor {
            line_reader: rustyline::Editor::with_config(config),
        }
    }

    /// Returns `None` at end of input.
    pub fn readline(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.line_reader.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof) => Ok(None),
            // ^C discards the line being edited
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(e) => Err(e.into()),
        }
    }

    pub fn load_history<P: AsRef<Path> + ?Sized>(&mut self, path: &P) -> Result<()> {
        self.line_reader.load_history(path).map_err(|e| match e {
            ReadlineError::Io(ref inner) if inner.kind() == io::ErrorKind::NotFound => {
                ErrorKind::HistoryFileNotFound.into()
            }
            e => e.into(),
        })
    }

    pub fn save_history<P: AsRef<Path> + ?Sized>(&mut self, path: &P) -> Result<()> {
        self.line_reader.save_history(path)?;
        Ok(())
    }

    /// Remembers `line` unless it repeats the previous entry.
    pub fn add_history_entry(&mut self, line: &str) {
        self.line_reader.add_history_entry(line);
    }

    pub fn history_len(&self) -> usize {
        self.line_reader.history().len()
    }

    /// The entry numbered `number`, counting from 1.
    pub fn history_entry(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|index| self.line_reader.history().get(index))
            .map(String::as_str)
    }

    /// Every remembered line with its number, oldest first.
    pub fn history_entries(&self) -> impl Iterator<Item = (usize, &str)> {
        self.line_reader
            .history()
            .iter()
            .enumerate()
            .map(|(i, line)| (i + 1, line.as_str()))
    }

    pub fn clear_history(&mut self) {
        self.line_reader.clear_history();
    }

    /// Replaces a line that is a history reference with the line it names.
    ///
    /// - `!n`: the entry numbered `n`
    /// - `!-n`: the `n`-th most recent entry
    /// - `!prefix`: the most recent entry starting with `prefix`
    ///
    /// Any other line, including a lone `!`, is left alone.
    pub fn expand_history(&self, command: &mut String) -> Result<()> {
        let reference = match command.strip_prefix(RECALL_MARKER) {
            Some(reference) if !reference.is_empty() => reference,
            _ => return Ok(()),
        };

        let resolved = match reference.parse::<isize>() {
            Ok(n) if n > 0 => self.history_entry(n as usize),
            Ok(n) if n < 0 => self
                .history_len()
                .checked_sub(n.unsigned_abs() - 1)
                .and_then(|number| self.history_entry(number)),
            Ok(_) => None,
            Err(_) => self
                .line_reader
                .history()
                .iter()
                .rev()
                .find(|line| line.starts_with(reference))
                .map(String::as_str),
        };

        match resolved {
            Some(line) => {
                *command = line.to_string();
                Ok(())
            }
            None => Err(Error::builtin_command(
                format!("{}: event not found", command),
                EVENT_NOT_FOUND_EXIT_STATUS,
            )),
        }
    }
}

//! Shell variables and `$NAME` / `~` expansion.

use std::env;
use std::fmt;
use std::path::PathBuf;

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::lexer::Token;

lazy_static! {
    static ref ASSIGNMENT: Regex = Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)=(.*)$").unwrap();
}

const SIGIL: char = '$';

/// Variables set with `NAME=value`, kept in assignment order.
#[derive(Clone, Debug, Default)]
pub struct Variables {
    vars: Vec<(String, String)>,
}

impl Variables {
    pub fn new() -> Variables {
        Default::default()
    }

    /// Adds `name`, or replaces its value in place.
    pub fn set<S1, S2>(&mut self, name: S1, value: S2)
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let name = name.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if `name` was set.
    pub fn unset(&mut self, name: &str) -> bool {
        let len = self.vars.len();
        self.vars.retain(|(n, _)| n != name);
        self.vars.len() != len
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Value of `name` as seen by expansion: shell variables first, then the
    /// process environment.
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(str::to_string)
            .or_else(|| env::var(name).ok())
    }
}

impl fmt::Display for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Splits a `NAME=value` word into its parts.
pub fn parse_assignment(word: &str) -> Option<(&str, &str)> {
    ASSIGNMENT.captures(word).map(|caps| {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let value = caps.get(2).map_or("", |m| m.as_str());
        (name, value)
    })
}

/// Replaces each word starting with `$` by the variable's value (empty when
/// unset) and each bare `~` by `home_dir`.
pub fn expand_variables(
    tokens: Vec<Token>,
    variables: &Variables,
    home_dir: Option<PathBuf>,
) -> Vec<Token> {
    tokens
        .into_iter()
        .map(|token| match token {
            Token::Word(word) => Token::Word(expand_word(word, variables, &home_dir)),
            other => other,
        })
        .collect()
}

fn expand_word(word: String, variables: &Variables, home_dir: &Option<PathBuf>) -> String {
    if word == "~" {
        return match *home_dir {
            Some(ref home) => home.to_string_lossy().into_owned(),
            None => word,
        };
    }

    if word.len() > 1 && word.starts_with(SIGIL) {
        return variables.lookup(&word[1..]).unwrap_or_default();
    }

    word
}

//! Pipeline Builder
//!
//! Turns the tokens of one segment into at most two commands joined by a
//! pipe, each with its own argument vector and optional redirections.

use std::fmt;

use crate::core::lexer::Token;
use crate::errors::{Error, ErrorKind, Result};

/// One program to run: its argument vector (program name first) and the files
/// its standard input and output are redirected to, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    /// Opened read-only; must exist.
    pub input: Option<String>,
    /// Opened write-only, created with mode 0644 if absent, truncated if present.
    pub output: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stages {
    Single(CommandSpec),
    /// `(producer, consumer)`
    Piped(CommandSpec, CommandSpec),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Stages,
    pub background: bool,
}

impl CommandSpec {
    pub fn new<S: AsRef<str>>(argv: &[S]) -> CommandSpec {
        CommandSpec {
            argv: argv.iter().map(|a| a.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// Walks `tokens` left to right, pairing each redirection operator with the
    /// word that follows it and collecting every other word into `argv`.
    fn from_tokens(tokens: Vec<Token>) -> Result<CommandSpec> {
        let mut spec = CommandSpec::default();
        let mut tokens = tokens.into_iter();

        while let Some(token) = tokens.next() {
            match token {
                Token::Word(word) => spec.argv.push(word),
                Token::RedirectIn => {
                    let path = expect_filename(&mut tokens, &Token::RedirectIn)?;
                    if spec.input.replace(path).is_some() {
                        return Err(Error::syntax("more than one input redirection"));
                    }
                }
                Token::RedirectOut => {
                    let path = expect_filename(&mut tokens, &Token::RedirectOut)?;
                    if spec.output.replace(path).is_some() {
                        return Err(Error::syntax("more than one output redirection"));
                    }
                }
                other => return Err(Error::syntax(format!("unexpected '{}'", other))),
            }
        }

        if spec.argv.is_empty() {
            return Err(Error::syntax("no command to execute"));
        }

        Ok(spec)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))?;
        if let Some(ref input) = self.input {
            write!(f, " < {}", input)?;
        }
        if let Some(ref output) = self.output {
            write!(f, " > {}", output)?;
        }
        Ok(())
    }
}

impl Pipeline {
    /// Builds a pipeline from the tokens of one segment.
    ///
    /// Fails without side effects on any malformed input, including more than
    /// one `|`.
    pub fn build(mut tokens: Vec<Token>) -> Result<Pipeline> {
        let pipes: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|&(_, t)| *t == Token::Pipe)
            .map(|(i, _)| i)
            .collect();

        match pipes.len() {
            0 => {
                let (tokens, background) = strip_background(tokens)?;
                Ok(Pipeline {
                    stages: Stages::Single(CommandSpec::from_tokens(tokens)?),
                    background,
                })
            }
            1 => {
                let right = tokens.split_off(pipes[0] + 1);
                tokens.pop();

                let (left, left_background) = strip_background(tokens)?;
                let (right, right_background) = strip_background(right)?;
                let producer = CommandSpec::from_tokens(left).map_err(side_error)?;
                let consumer = CommandSpec::from_tokens(right).map_err(side_error)?;
                Ok(Pipeline {
                    stages: Stages::Piped(producer, consumer),
                    background: left_background || right_background,
                })
            }
            _ => Err(Error::syntax(
                "multiple pipes not supported (only a single '|' is allowed)",
            )),
        }
    }

    /// The command when this pipeline has no pipe.
    pub fn single(&self) -> Option<&CommandSpec> {
        match self.stages {
            Stages::Single(ref command) => Some(command),
            Stages::Piped(..) => None,
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stages {
            Stages::Single(ref command) => write!(f, "{}", command),
            Stages::Piped(ref producer, ref consumer) => write!(f, "{} | {}", producer, consumer),
        }
    }
}

/// Removes a trailing background marker. Any other `&` is an error.
fn strip_background(mut tokens: Vec<Token>) -> Result<(Vec<Token>, bool)> {
    let background = tokens.last() == Some(&Token::Background);
    if background {
        tokens.pop();
    }

    if tokens.contains(&Token::Background) {
        return Err(Error::syntax("'&' is only allowed at the end of a command"));
    }

    Ok((tokens, background))
}

fn expect_filename<I>(tokens: &mut I, operator: &Token) -> Result<String>
where
    I: Iterator<Item = Token>,
{
    match tokens.next() {
        Some(Token::Word(path)) => Ok(path),
        Some(other) => Err(Error::syntax(format!(
            "expected filename after '{}', found '{}'",
            operator, other
        ))),
        None => Err(Error::syntax(format!(
            "expected filename after '{}'",
            operator
        ))),
    }
}

fn side_error(e: Error) -> Error {
    if let ErrorKind::Syntax(ref reason) = *e.kind() {
        return Error::syntax(format!("invalid command on either side of '|' ({})", reason));
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::lexer::tokenize;

    fn build(line: &str) -> Result<Pipeline> {
        Pipeline::build(tokenize(line).expect("line should not be empty"))
    }

    fn single(command: CommandSpec, background: bool) -> Pipeline {
        Pipeline {
            stages: Stages::Single(command),
            background,
        }
    }

    #[test]
    fn test_simple_command() {
        assert_eq!(
            build("echo bob").unwrap(),
            single(CommandSpec::new(&["echo", "bob"]), false)
        );
    }

    #[test]
    fn test_redirects_are_removed_from_argv() {
        assert_eq!(
            build(">out echo <in bob").unwrap(),
            single(
                CommandSpec {
                    argv: vec!["echo".into(), "bob".into()],
                    input: Some("in".into()),
                    output: Some("out".into()),
                },
                false
            )
        );
    }

    #[test]
    fn test_redirect_without_filename() {
        assert!(build("echo <").unwrap_err().is_syntax());
        assert!(build("echo >").unwrap_err().is_syntax());
        assert!(build("cat < > out").unwrap_err().is_syntax());
        assert!(build("<").unwrap_err().is_syntax());
    }

    #[test]
    fn test_duplicate_redirects() {
        assert!(build("cat < a < b").unwrap_err().is_syntax());
        assert!(build("echo > a > b").unwrap_err().is_syntax());
    }

    #[test]
    fn test_redirect_only_is_not_a_command() {
        assert!(build("< in > out").unwrap_err().is_syntax());
    }

    #[test]
    fn test_single_pipe() {
        assert_eq!(
            build("echo hello | wc -l").unwrap(),
            Pipeline {
                stages: Stages::Piped(
                    CommandSpec::new(&["echo", "hello"]),
                    CommandSpec::new(&["wc", "-l"]),
                ),
                background: false,
            }
        );
    }

    #[test]
    fn test_pipe_with_redirects() {
        let pipeline = build("<in cmd1 | cmd2 >out &").unwrap();
        assert!(pipeline.background);
        assert_eq!(
            pipeline.stages,
            Stages::Piped(
                CommandSpec {
                    argv: vec!["cmd1".into()],
                    input: Some("in".into()),
                    output: None,
                },
                CommandSpec {
                    argv: vec!["cmd2".into()],
                    input: None,
                    output: Some("out".into()),
                },
            )
        );
    }

    #[test]
    fn test_multiple_pipes() {
        assert!(build("a | b | c").unwrap_err().is_syntax());
        assert!(build("a || b").unwrap_err().is_syntax());
    }

    #[test]
    fn test_empty_pipe_side() {
        assert!(build("| wc").unwrap_err().is_syntax());
        assert!(build("echo |").unwrap_err().is_syntax());
    }

    #[test]
    fn test_background() {
        assert_eq!(
            build("sleep 5 &").unwrap(),
            single(CommandSpec::new(&["sleep", "5"]), true)
        );
        assert_eq!(
            build("sleep 5&").unwrap(),
            single(CommandSpec::new(&["sleep", "5"]), true)
        );
        assert!(build("&").unwrap_err().is_syntax());
        assert!(build("sleep & 5").unwrap_err().is_syntax());
        assert!(build("echo a &&").unwrap_err().is_syntax());
    }

    #[test]
    fn test_quoted_ampersand_is_an_argument() {
        assert_eq!(
            build("echo '&'").unwrap(),
            single(CommandSpec::new(&["echo", "&"]), false)
        );
    }

    #[test]
    fn test_background_on_either_side_of_pipe() {
        let pipeline = build("yes & | head -1").unwrap();
        assert!(pipeline.background);
        match pipeline.stages {
            Stages::Piped(ref producer, _) => assert_eq!(producer, &CommandSpec::new(&["yes"])),
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(build("sleep 5 &").unwrap().to_string(), "sleep 5");
        assert_eq!(
            build("sort<in | uniq > out").unwrap().to_string(),
            "sort < in | uniq > out"
        );
    }

    #[test]
    fn test_argv_round_trip() {
        let argv = ["grep", "-n", "needle", "haystack.txt"];
        let pipeline = build(&argv.join(" ")).unwrap();
        assert_eq!(pipeline.single(), Some(&CommandSpec::new(&argv)));
    }
}

//! Tokenizer
//!
//! Splits one line of input into words and the single-character operators
//! `<`, `>` and `|`. Every `&` ending an unquoted word is reported as a
//! background marker, so `sleep 5&` and `sleep 5 &` tokenize alike. Quotes group their raw interior into one word; there is no escape
//! processing, and an unterminated quote runs to the end of the line.

use std::fmt;

use log::debug;

/// Maximum number of tokens kept from one line. Later tokens are dropped.
pub const MAX_TOKENS: usize = 10;

const BACKGROUND_MARKER: char = '&';

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Word(String),
    RedirectIn,
    RedirectOut,
    Pipe,
    Background,
}

impl Token {
    pub fn word<S: Into<String>>(s: S) -> Token {
        Token::Word(s.into())
    }

}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Token::Word(ref w) => write!(f, "{}", w),
            Token::RedirectIn => write!(f, "<"),
            Token::RedirectOut => write!(f, ">"),
            Token::Pipe => write!(f, "|"),
            Token::Background => write!(f, "&"),
        }
    }
}

/// Tokenizes `line`, keeping at most `MAX_TOKENS` tokens.
///
/// Returns `None` when the line holds nothing but whitespace.
pub fn tokenize(line: &str) -> Option<Vec<Token>> {
    tokenize_bounded(line, MAX_TOKENS)
}

/// Tokenizes `line`, keeping at most `limit` tokens.
pub fn tokenize_bounded(line: &str, limit: usize) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while tokens.len() < limit {
        // skip blanks
        while let Some(&(_, c)) = chars.peek() {
            if is_blank(c) {
                chars.next();
            } else {
                break;
            }
        }

        let (start, c) = match chars.next() {
            Some(next) => next,
            None => break,
        };

        match c {
            '<' => tokens.push(Token::RedirectIn),
            '>' => tokens.push(Token::RedirectOut),
            '|' => tokens.push(Token::Pipe),
            '"' | '\'' => {
                let mut word = String::new();
                for (_, inner) in chars.by_ref() {
                    if inner == c {
                        break;
                    }
                    word.push(inner);
                }
                tokens.push(Token::Word(word));
            }
            _ => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if is_blank(next) || is_operator(next) {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }

                let word = &line[start..end];
                let stem = word.trim_end_matches(BACKGROUND_MARKER);
                if !stem.is_empty() {
                    tokens.push(Token::word(stem));
                }
                let markers = word.len() - stem.len();
                tokens.extend((0..markers).map(|_| Token::Background));
            }
        }
    }

    if tokens.len() > limit || chars.any(|(_, c)| !is_blank(c)) {
        tokens.truncate(limit);
        debug!("dropping tokens past the limit of {} in: {}", limit, line);
    }

    if tokens.is_empty() {
        None
    } else {
        Some(tokens)
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\n' || c == '\r'
}

fn is_operator(c: char) -> bool {
    c == '<' || c == '>' || c == '|'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(ws: &[&str]) -> Vec<Token> {
        ws.iter().map(|w| Token::word(*w)).collect()
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(tokenize(""), None);
        assert_eq!(tokenize(" \t  "), None);
    }

    #[test]
    fn test_simple_words() {
        assert_eq!(tokenize("ls -l  /tmp"), Some(words(&["ls", "-l", "/tmp"])));
    }

    #[test]
    fn test_pipe() {
        assert_eq!(
            tokenize("echo hello | wc -l").unwrap(),
            vec![
                Token::word("echo"),
                Token::word("hello"),
                Token::Pipe,
                Token::word("wc"),
                Token::word("-l"),
            ]
        );
    }

    #[test]
    fn test_operators_split_words() {
        assert_eq!(
            tokenize("sort<in>out|uniq").unwrap(),
            vec![
                Token::word("sort"),
                Token::RedirectIn,
                Token::word("in"),
                Token::RedirectOut,
                Token::word("out"),
                Token::Pipe,
                Token::word("uniq"),
            ]
        );
    }

    #[test]
    fn test_quotes() {
        assert_eq!(
            tokenize(r#"echo "a | b" 'c > d'"#).unwrap(),
            words(&["echo", "a | b", "c > d"])
        );
        assert_eq!(tokenize(r#"echo "it's""#).unwrap(), words(&["echo", "it's"]));
        assert_eq!(tokenize(r#"echo """#).unwrap(), words(&["echo", ""]));
    }

    #[test]
    fn test_quotes_have_no_escapes() {
        assert_eq!(tokenize(r#"echo "a\n""#).unwrap(), words(&["echo", r"a\n"]));
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(
            tokenize("echo 'never closed | x").unwrap(),
            words(&["echo", "never closed | x"])
        );
    }

    #[test]
    fn test_background_marker() {
        assert_eq!(
            tokenize("sleep 5 &").unwrap(),
            vec![Token::word("sleep"), Token::word("5"), Token::Background]
        );
        assert_eq!(
            tokenize("sleep 5&").unwrap(),
            vec![Token::word("sleep"), Token::word("5"), Token::Background]
        );
        assert_eq!(
            tokenize("a&&").unwrap(),
            vec![Token::word("a"), Token::Background, Token::Background]
        );
        assert_eq!(tokenize("echo a&b").unwrap(), words(&["echo", "a&b"]));
    }

    #[test]
    fn test_quoted_ampersand_is_a_word() {
        assert_eq!(tokenize("echo '&'").unwrap(), words(&["echo", "&"]));
        assert_eq!(tokenize(r#"echo "a&""#).unwrap(), words(&["echo", "a&"]));
    }

    #[test]
    fn test_token_limit() {
        let line = "a b c d e f g h i j k l";
        let tokens = tokenize(line).unwrap();
        assert_eq!(tokens.len(), MAX_TOKENS);
        assert_eq!(tokens.last(), Some(&Token::word("j")));

        assert_eq!(tokenize_bounded("a | b", 2).unwrap(), vec![Token::word("a"), Token::Pipe]);
    }

    #[test]
    fn test_display_round_trip() {
        let tokens = tokenize("cat < in | wc > out &").unwrap();
        let line = tokens
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(line, "cat < in | wc > out &");
    }
}

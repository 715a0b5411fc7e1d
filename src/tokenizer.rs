//! Quote-aware splitting of a finished line into an argument vector.
//!
//! The grammar is a small subset of POSIX shell quoting:
//!
//! - Outside quotes, whitespace separates words and a backslash makes the next
//!   character literal.
//! - Inside `'...'` every character is literal.
//! - Inside `"..."` a backslash only escapes `"`, `\`, `$` and `` ` ``; a backslash
//!   before a newline removes both; before anything else the backslash is kept.
//!
//! Quoted and unquoted segments with no whitespace between them form a single word,
//! so `'ab'"cd"` is the one word `abcd`.

use core::fmt;
use core::iter::Peekable;
use core::ops::Deref;
use core::str::Chars;

/// Which quote, if any, the scanner is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteState {
    #[default]
    Unquoted,
    InSingleQuote,
    InDoubleQuote,
}

/// Errors that can occur while splitting a line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    /// The line ended before a closing quote was found.
    #[error("unterminated {} quote", quote_name(.quote))]
    UnterminatedQuote { quote: char },
}

fn quote_name(quote: &char) -> &'static str {
    if *quote == '\'' {
        "single"
    } else {
        "double"
    }
}

/// The words of one command line, in order.
///
/// Every entry is fully unescaped. An entry is only empty if it was written as an
/// empty quoted string such as `''`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgVector {
    args: Vec<String>,
}

impl ArgVector {
    /// The command name, `argv[0]`.
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Everything after the command name.
    pub fn args(&self) -> &[String] {
        self.args.get(1..).unwrap_or(&[])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    pub fn into_vec(self) -> Vec<String> {
        self.args
    }
}

impl Deref for ArgVector {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.args
    }
}

impl From<Vec<String>> for ArgVector {
    fn from(args: Vec<String>) -> Self {
        Self { args }
    }
}

impl IntoIterator for ArgVector {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.args.into_iter()
    }
}

impl fmt::Display for ArgVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

/// Splits `line` into words.
///
/// The result depends only on `line`. A line that ends inside a quote is rejected as a
/// whole; no partial vector is produced.
///
/// # Examples
///
/// ```
/// use rawsh::tokenize;
///
/// let argv = tokenize("echo 'a b' c\\ d")?;
/// assert_eq!(argv.as_slice(), ["echo", "a b", "c d"]);
/// assert!(tokenize("o'pen").is_err());
/// # Ok::<(), rawsh::TokenizeError>(())
/// ```
pub fn tokenize(line: &str) -> Result<ArgVector, TokenizeError> {
    Scanner::new(line).run()
}

/// C-locale `isspace`: space, tab, newline, vertical tab, form feed, carriage return.
fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

struct Scanner<'a> {
    input: Peekable<Chars<'a>>,
    state: QuoteState,
    current: Option<String>,
    words: Vec<String>,
}

impl<'a> Scanner<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            input: line.chars().peekable(),
            state: QuoteState::Unquoted,
            current: None,
            words: Vec::new(),
        }
    }

    fn run(mut self) -> Result<ArgVector, TokenizeError> {
        while let Some(c) = self.input.next() {
            self.state = match self.state {
                QuoteState::Unquoted => self.unquoted(c),
                QuoteState::InSingleQuote => self.single_quoted(c),
                QuoteState::InDoubleQuote => self.double_quoted(c),
            };
        }

        match self.state {
            QuoteState::Unquoted => {
                self.finish_word();
                Ok(ArgVector::from(self.words))
            }
            QuoteState::InSingleQuote => Err(TokenizeError::UnterminatedQuote { quote: '\'' }),
            QuoteState::InDoubleQuote => Err(TokenizeError::UnterminatedQuote { quote: '"' }),
        }
    }

    /// The word being built, opening one if none is active.
    fn word(&mut self) -> &mut String {
        self.current.get_or_insert_with(String::new)
    }

    fn finish_word(&mut self) {
        if let Some(word) = self.current.take() {
            self.words.push(word);
        }
    }

    fn unquoted(&mut self, c: char) -> QuoteState {
        match c {
            c if is_separator(c) => self.finish_word(),
            // A trailing backslash has nothing to escape and is dropped.
            '\\' => {
                if let Some(escaped) = self.input.next() {
                    self.word().push(escaped);
                }
            }
            '\'' => {
                self.word();
                return QuoteState::InSingleQuote;
            }
            '"' => {
                self.word();
                return QuoteState::InDoubleQuote;
            }
            c => self.word().push(c),
        }
        QuoteState::Unquoted
    }

    fn single_quoted(&mut self, c: char) -> QuoteState {
        if c == '\'' {
            return QuoteState::Unquoted;
        }
        self.word().push(c);
        QuoteState::InSingleQuote
    }

    fn double_quoted(&mut self, c: char) -> QuoteState {
        match c {
            '"' => return QuoteState::Unquoted,
            '\\' => match self.input.peek().copied() {
                Some(next @ ('"' | '\\' | '$' | '`')) => {
                    self.input.next();
                    self.word().push(next);
                }
                Some('\n') => {
                    self.input.next();
                }
                Some(next) => {
                    self.input.next();
                    let word = self.word();
                    word.push('\\');
                    word.push(next);
                }
                None => self.word().push('\\'),
            },
            c => self.word().push(c),
        }
        QuoteState::InDoubleQuote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn words(line: &str) -> Vec<String> {
        tokenize(line).unwrap().into_vec()
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(words("echo hi"), vec!["echo", "hi"]);
        assert_eq!(words("  ls \t -la   /tmp  "), vec!["ls", "-la", "/tmp"]);
        assert_eq!(words("a\x0bb\x0cc\rd"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_empty_and_blank_lines() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   \t ").unwrap().is_empty());
    }

    #[test]
    fn test_single_quotes() {
        assert_eq!(words("'a b' c"), vec!["a b", "c"]);
        assert_eq!(words(r#"'a\nb "x"'"#), vec![r#"a\nb "x""#]);
    }

    #[test]
    fn test_double_quote_escapes() {
        assert_eq!(words("a\"b\\\"c\"d"), vec!["ab\"cd"]);
        assert_eq!(words(r#""\\ \$ \`""#), vec![r"\ $ `"]);
    }

    #[test]
    fn test_double_quote_line_continuation() {
        assert_eq!(words("\"ab\\\ncd\""), vec!["abcd"]);
    }

    // An unrecognized escape inside double quotes keeps its backslash.
    #[test]
    fn test_double_quote_unknown_escape_keeps_backslash() {
        assert_eq!(words(r#""a\nb""#), vec![r"a\nb"]);
        assert_eq!(words(r#""\q""#), vec![r"\q"]);
    }

    #[test]
    fn test_unquoted_backslash() {
        assert_eq!(words(r"a\ b c"), vec!["a b", "c"]);
        assert_eq!(words(r#"\'x\" \\"#), vec![r#"'x""#, r"\"]);
        assert_eq!(words(r"\n"), vec!["n"]);
    }

    #[test]
    fn test_trailing_backslash_dropped() {
        assert_eq!(words(r"abc\"), vec!["abc"]);
        assert!(tokenize(r"\").unwrap().is_empty());
    }

    #[test]
    fn test_adjacent_segments_concatenate() {
        assert_eq!(words(r#"'ab'"cd"ef"#), vec!["abcdef"]);
        assert_eq!(words(r#"x'y' "z"w"#), vec!["xy", "zw"]);
    }

    #[test]
    fn test_empty_quotes_make_empty_word() {
        assert_eq!(words("echo '' \"\""), vec!["echo", "", ""]);
    }

    #[test]
    fn test_unterminated_quotes() {
        assert_eq!(
            tokenize("o'pen"),
            Err(TokenizeError::UnterminatedQuote { quote: '\'' })
        );
        assert_eq!(
            tokenize("say \"hi"),
            Err(TokenizeError::UnterminatedQuote { quote: '"' })
        );
        assert_eq!(
            tokenize("\"trailing\\"),
            Err(TokenizeError::UnterminatedQuote { quote: '"' })
        );
    }

    #[test]
    fn test_error_message() {
        let err = tokenize("'x").unwrap_err();
        assert_eq!(err.to_string(), "unterminated single quote");
        let err = tokenize("\"x").unwrap_err();
        assert_eq!(err.to_string(), "unterminated double quote");
    }

    #[test]
    fn test_no_state_between_calls() {
        assert!(tokenize("'open").is_err());
        assert_eq!(words("closed"), vec!["closed"]);
    }

    #[test]
    fn test_arg_vector_accessors() {
        let argv = tokenize("cat -n file").unwrap();
        assert_eq!(argv.program(), Some("cat"));
        assert_eq!(argv.args(), ["-n", "file"]);
        assert_eq!(argv.len(), 3);
        assert_eq!(argv.to_string(), "cat -n file");

        let empty = ArgVector::default();
        assert_eq!(empty.program(), None);
        assert!(empty.args().is_empty());
    }
}

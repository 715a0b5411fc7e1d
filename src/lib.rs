//! Line editing and tokenizing core of a small interactive shell.
//!
//! This library reads raw keystrokes from a terminal, offers a readline-like editing
//! experience and turns a finished line into an argument vector. All terminal I/O goes
//! through the [`Terminal`] trait, so the editing logic runs the same against a real
//! tty or an in-memory script.
//!
//! # Features
//!
//! - **End-of-line editing**: append printable characters, erase with Backspace
//! - **Command history**: Up/Down recall that preserves the line being typed
//! - **Executable completion**: Tab completes names found on `PATH`, extends to the
//!   longest common prefix, rings the bell once and then lists candidates
//! - **Quote-aware tokenizer**: single quotes, double quotes and backslash escapes
//! - **Scoped raw mode**: the terminal is restored on every exit path
//!
//! # Quick Start
//!
//! ```no_run
//! use rawsh::{LineEditor, tokenize, terminals::{RawMode, StdioTerminal}};
//!
//! let _raw = RawMode::enable()?;
//! let mut editor = LineEditor::new();
//! let mut terminal = StdioTerminal::new();
//!
//! while let Some(line) = editor.read_line(&mut terminal, "$ ")? {
//!     match tokenize(&line) {
//!         Ok(argv) if argv.is_empty() => continue,
//!         Ok(argv) => println!("argv: {:?}", argv.as_slice()),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! # Ok::<(), rawsh::Error>(())
//! ```
//!
//! # Architecture
//!
//! - [`LineEditor`]: the input state machine; owns the buffer, history and tab counter
//! - [`LineBuffer`]: bounded text of the line being composed
//! - [`History`]: previously accepted lines plus the browse cursor
//! - [`completion`]: `PATH` scanning and candidate classification
//! - [`tokenizer`]: turns a finished line into an [`ArgVector`]
//! - [`dispatch`]: builtins, external commands and redirection for the binary

pub mod completion;
pub mod config;
pub mod dispatch;
mod editor;
pub mod keys;
pub mod terminals;
pub mod tokenizer;

pub use completion::{CandidateSource, Completion, CompletionResult, PathSearch};
pub use editor::LineEditor;
pub use keys::KeyDecoder;
pub use tokenizer::{tokenize, ArgVector, QuoteState, TokenizeError};

/// Error type for shell operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
    /// Querying or setting terminal attributes failed
    #[error("cannot {op} terminal attributes: {source}")]
    TerminalAttributes {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
    /// End of input
    #[error("End of file")]
    Eof,
    /// The line could not be split into words
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::Eof,
            _ => Error::Io(e),
        }
    }
}

/// Result type for shell operations
pub type Result<T> = core::result::Result<T, Error>;

/// Key events produced by the [`KeyDecoder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// Printable character
    Normal(char),
    /// Horizontal tab (completion)
    Tab,
    /// Carriage return or newline
    Enter,
    /// Backspace or DEL
    Backspace,
    /// Up arrow (history older)
    Up,
    /// Down arrow (history newer)
    Down,
    /// Left arrow, ignored by the editor
    Left,
    /// Right arrow, ignored by the editor
    Right,
}

/// Direction of a history recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards older entries.
    Up,
    /// Towards newer entries and finally the saved line.
    Down,
}

/// Byte-level terminal abstraction used by the [`LineEditor`].
///
/// The editor only ever reads single bytes and writes byte strings, so any device
/// that can do both can host it. Raw mode is not part of this trait: it is enabled
/// once per session by [`terminals::RawMode`].
///
/// # Example
///
/// ```
/// use rawsh::{Terminal, Result};
/// use std::collections::VecDeque;
///
/// struct MockTerminal {
///     input: VecDeque<u8>,
///     output: Vec<u8>,
/// }
///
/// impl Terminal for MockTerminal {
///     fn read_byte(&mut self) -> Result<u8> {
///         self.input.pop_front().ok_or(rawsh::Error::Eof)
///     }
///
///     fn write(&mut self, data: &[u8]) -> Result<()> {
///         self.output.extend_from_slice(data);
///         Ok(())
///     }
///
///     fn flush(&mut self) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait Terminal {
    /// Reads a single byte from the input source.
    ///
    /// Should block until a byte is available and return [`Error::Eof`] once the
    /// input is closed.
    fn read_byte(&mut self) -> Result<u8>;

    /// Writes raw bytes to the output.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Flushes any buffered output.
    ///
    /// Called after each key event to ensure immediate visual feedback.
    fn flush(&mut self) -> Result<()>;
}

/// Bounded text buffer for the line being composed.
///
/// Editing only happens at the end of the line, so there is no cursor: the length of
/// the buffer is always the number of characters on screen after the prompt. The
/// buffer never holds more than `limit - 1` bytes; anything beyond that is refused.
#[derive(Debug)]
pub struct LineBuffer {
    buffer: String,
    limit: usize,
}

impl LineBuffer {
    /// Creates a new line buffer that refuses input past `limit - 1` bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use rawsh::LineBuffer;
    ///
    /// let buffer = LineBuffer::new(1024);
    /// assert!(buffer.is_empty());
    /// ```
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: String::with_capacity(limit),
            limit,
        }
    }

    /// Clears the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Returns the length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of bytes that can still be appended.
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(1).saturating_sub(self.buffer.len())
    }

    /// Returns `true` once no further byte can be appended.
    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the buffer contents.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Returns the buffer contents as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Appends a character at the end of the line.
    ///
    /// Returns `false` and leaves the buffer untouched if the character does not fit.
    pub fn push(&mut self, c: char) -> bool {
        if c.len_utf8() > self.remaining() {
            return false;
        }
        self.buffer.push(c);
        true
    }

    /// Appends as much of `text` as fits, whole characters only.
    ///
    /// Returns the part that was actually appended, so the caller can echo exactly that.
    pub fn push_str<'a>(&mut self, text: &'a str) -> &'a str {
        let mut end = 0;
        for (idx, c) in text.char_indices() {
            if idx + c.len_utf8() > self.remaining() {
                break;
            }
            end = idx + c.len_utf8();
        }
        let accepted = &text[..end];
        self.buffer.push_str(accepted);
        accepted
    }

    /// Removes the last character (backspace operation).
    ///
    /// Returns `true` if a character was removed, `false` if the buffer was empty.
    pub fn pop(&mut self) -> bool {
        self.buffer.pop().is_some()
    }

    /// Loads text into the buffer, replacing existing content.
    ///
    /// Text longer than the limit is cut at the last whole character that fits.
    /// Used for history recall.
    pub fn load(&mut self, text: &str) {
        self.buffer.clear();
        self.push_str(text);
    }
}

/// Command history with a browse cursor.
///
/// Entries are kept in the order they were accepted. Empty lines and immediate repeats
/// are never recorded. While browsing, the cursor points at the entry on screen; a cursor
/// equal to [`len`](Self::len) means "not browsing", in which case the line that was
/// being typed before the first Up is held as a snapshot and handed back by Down.
///
/// # Examples
///
/// ```
/// use rawsh::{Direction, History};
///
/// let mut hist = History::new(16);
/// hist.record("first command");
/// hist.record("second command");
///
/// hist.begin_browse("half typ");
/// assert_eq!(hist.recall(Direction::Up), Some("second command"));
/// assert_eq!(hist.recall(Direction::Up), Some("first command"));
/// assert_eq!(hist.recall(Direction::Down), Some("second command"));
/// assert_eq!(hist.recall(Direction::Down), Some("half typ"));
/// ```
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<String>,
    cursor: usize,
    saved_line: Option<String>,
}

impl History {
    /// Creates an empty history with room for `capacity` entries before it grows.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            cursor: 0,
            saved_line: None,
        }
    }

    /// Adds a line to the history.
    ///
    /// Surrounding whitespace is trimmed. Empty lines and a line equal to the most recent
    /// entry are skipped; non-adjacent duplicates are kept. Returns `true` if an entry was
    /// added. Any browse in progress ends.
    pub fn record(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        let added = !trimmed.is_empty() && self.entries.last().map(String::as_str) != Some(trimmed);

        if added {
            self.entries.push(trimmed.to_string());
        }

        self.end_browse();
        added
    }

    /// Starts browsing, saving `current_line` so Down can bring it back.
    ///
    /// Has no effect while an entry is on screen. Once Down has returned to the saved
    /// line, the next call takes a fresh snapshot of whatever was typed since.
    pub fn begin_browse(&mut self, current_line: &str) {
        if self.is_browsing() {
            return;
        }
        self.cursor = self.entries.len();
        self.saved_line = Some(current_line.to_string());
    }

    /// Moves the browse cursor one entry and returns the text to show.
    ///
    /// Up stops at the oldest entry and Down stops at the saved line; `None` means the
    /// cursor did not move and the display should stay as it is.
    pub fn recall(&mut self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Up => {
                if self.cursor == 0 {
                    return None;
                }
                self.cursor -= 1;
                Some(&self.entries[self.cursor])
            }
            Direction::Down => {
                if self.cursor >= self.entries.len() {
                    return None;
                }
                self.cursor += 1;
                if self.cursor == self.entries.len() {
                    Some(self.saved_line.as_deref().unwrap_or(""))
                } else {
                    Some(&self.entries[self.cursor])
                }
            }
        }
    }

    /// Ends browsing: the cursor goes back to "new line" and the snapshot is dropped.
    pub fn end_browse(&mut self) {
        self.cursor = self.entries.len();
        self.saved_line = None;
    }

    /// Returns `true` while the cursor points at a stored entry.
    pub fn is_browsing(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Position of the browse cursor, `len()` when not browsing.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(String::as_str)
    }

    /// Forgets every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.end_browse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_conversions() {
        let eof: Error = std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(eof, Error::Eof));

        let io: Error = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert!(matches!(io, Error::Io(_)));
        assert!(std::error::Error::source(&io).is_some());

        let quote: Error = tokenize("'x").unwrap_err().into();
        assert_eq!(quote.to_string(), "unterminated single quote");
    }

    // LineBuffer tests
    #[test]
    fn test_line_buffer_push() {
        let mut buf = LineBuffer::new(100);
        assert!(buf.push('h'));
        assert!(buf.push('i'));
        assert_eq!(buf.as_str(), "hi");
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_line_buffer_pop() {
        let mut buf = LineBuffer::new(100);
        buf.push('h');
        buf.push('i');
        assert!(buf.pop());
        assert_eq!(buf.as_str(), "h");
        assert!(buf.pop());
        assert!(!buf.pop()); // already empty
        assert!(buf.is_empty());
    }

    #[test]
    fn test_line_buffer_full_refuses_input() {
        let mut buf = LineBuffer::new(4);
        assert!(buf.push('a'));
        assert!(buf.push('b'));
        assert!(buf.push('c'));
        assert!(buf.is_full());
        assert!(!buf.push('d'));
        assert_eq!(buf.as_str(), "abc");
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_line_buffer_push_str_truncates() {
        let mut buf = LineBuffer::new(6);
        buf.push('x');
        assert_eq!(buf.push_str("abcdef"), "abcd");
        assert_eq!(buf.as_str(), "xabcd");
        assert_eq!(buf.push_str("z"), "");
    }

    #[test]
    fn test_line_buffer_push_str_keeps_whole_chars() {
        let mut buf = LineBuffer::new(4);
        buf.push('a');
        // 'ä' is two bytes; only one byte of room is left after "ab"
        assert_eq!(buf.push_str("bä"), "b");
        assert_eq!(buf.as_str(), "ab");
    }

    #[test]
    fn test_line_buffer_load() {
        let mut buf = LineBuffer::new(100);
        buf.push('x');
        buf.load("hello world");
        assert_eq!(buf.as_str(), "hello world");

        let mut small = LineBuffer::new(4);
        small.load("hello");
        assert_eq!(small.as_str(), "hel");
    }

    #[test]
    fn test_line_buffer_zero_limit() {
        let mut buf = LineBuffer::new(0);
        assert!(buf.is_full());
        assert!(!buf.push('a'));
    }

    // History tests
    #[test]
    fn test_history_record() {
        let mut hist = History::new(10);
        assert!(hist.record("first"));
        assert!(hist.record("second"));
        assert_eq!(hist.len(), 2);
        assert_eq!(hist.iter().collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn test_history_skip_empty() {
        let mut hist = History::new(10);
        hist.record("first");
        assert!(!hist.record(""));
        assert!(!hist.record("   "));
        assert_eq!(hist.len(), 1);
    }

    #[test]
    fn test_history_skip_consecutive_duplicates() {
        let mut hist = History::new(10);
        hist.record("test");
        assert!(!hist.record("test"));
        assert!(!hist.record("  test "));
        assert_eq!(hist.len(), 1);

        hist.record("other");
        assert!(hist.record("test")); // not adjacent, kept
        assert_eq!(hist.len(), 3);
    }

    #[test]
    fn test_history_navigation() {
        let mut hist = History::new(10);
        hist.record("first");
        hist.record("second");
        hist.record("third");

        hist.begin_browse("");
        assert_eq!(hist.recall(Direction::Up), Some("third"));
        assert_eq!(hist.recall(Direction::Up), Some("second"));
        assert_eq!(hist.recall(Direction::Up), Some("first"));
        assert_eq!(hist.recall(Direction::Up), None); // clamped at oldest
        assert_eq!(hist.cursor(), 0);

        assert_eq!(hist.recall(Direction::Down), Some("second"));
        assert_eq!(hist.recall(Direction::Down), Some("third"));
        assert_eq!(hist.recall(Direction::Down), Some("")); // saved line (empty)
        assert_eq!(hist.recall(Direction::Down), None);
        assert!(!hist.is_browsing());
    }

    #[test]
    fn test_history_saves_current_line() {
        let mut hist = History::new(10);
        hist.record("first");
        hist.record("second");

        hist.begin_browse("hello");
        assert_eq!(hist.recall(Direction::Up), Some("second"));
        hist.begin_browse("second"); // ignored while browsing
        assert_eq!(hist.recall(Direction::Up), Some("first"));

        assert_eq!(hist.recall(Direction::Down), Some("second"));
        assert_eq!(hist.recall(Direction::Down), Some("hello")); // restored!
    }

    #[test]
    fn test_history_up_down_symmetry() {
        let mut hist = History::new(10);
        for line in ["a", "b", "c", "d"] {
            hist.record(line);
        }

        for n in 1..=hist.len() {
            hist.begin_browse("draft");
            let mut shown = "";
            for _ in 0..n {
                shown = hist.recall(Direction::Up).unwrap();
            }
            assert_eq!(shown, ["d", "c", "b", "a"][n - 1]);

            let mut back = "";
            for _ in 0..n {
                back = hist.recall(Direction::Down).unwrap();
            }
            assert_eq!(back, "draft");
            hist.end_browse();
        }
    }

    #[test]
    fn test_history_down_without_up() {
        let mut hist = History::new(10);
        hist.record("first");

        // Down without going up first should do nothing
        assert_eq!(hist.recall(Direction::Down), None);
    }

    #[test]
    fn test_history_empty_browse() {
        let mut hist = History::new(10);
        hist.begin_browse("typed");
        assert_eq!(hist.recall(Direction::Up), None);
        assert_eq!(hist.recall(Direction::Down), None);
    }

    #[test]
    fn test_history_record_ends_browse() {
        let mut hist = History::new(10);
        hist.record("first");
        hist.record("second");

        hist.begin_browse("");
        assert_eq!(hist.recall(Direction::Up), Some("second"));
        hist.record("second");
        assert!(!hist.is_browsing());
        assert_eq!(hist.cursor(), hist.len());

        // Next browse starts from the newest entry again
        hist.begin_browse("");
        assert_eq!(hist.recall(Direction::Up), Some("second"));
    }

    #[test]
    fn test_history_grows_past_initial_capacity() {
        let mut hist = History::new(2);
        for i in 0..10 {
            hist.record(&i.to_string());
        }
        assert_eq!(hist.len(), 10);
        hist.begin_browse("");
        assert_eq!(hist.recall(Direction::Up), Some("9"));
    }

    #[test]
    fn test_history_clear() {
        let mut hist = History::new(10);
        hist.record("first");
        hist.clear();
        assert!(hist.is_empty());
        assert!(hist.record("first"));
    }

    #[test]
    fn test_history_snapshot_taken_again_after_returning_to_draft() {
        let mut hist = History::new(10);
        hist.record("old");

        hist.begin_browse("ab");
        assert_eq!(hist.recall(Direction::Up), Some("old"));
        assert_eq!(hist.recall(Direction::Down), Some("ab"));

        // Back on the draft; the user keeps typing and browses again
        hist.begin_browse("abcd");
        assert_eq!(hist.recall(Direction::Up), Some("old"));
        assert_eq!(hist.recall(Direction::Down), Some("abcd"));
    }
}

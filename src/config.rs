//! Compiled-in limits and terminal byte sequences.
//!
//! The shell has no configuration file. Everything that would otherwise be a
//! setting lives here as a constant; the binary only exposes the prompt and a
//! log file on its command line.

/// Size of the line buffer. A line holds at most `MAX_LINE_LEN - 1` bytes.
pub const MAX_LINE_LEN: usize = 1024;

/// Initial number of history slots. The store grows past this as needed.
pub const HISTORY_INITIAL_CAPACITY: usize = 64;

/// Initial number of completion candidate slots per scan.
pub const COMPLETION_INITIAL_CAPACITY: usize = 10;

/// Prompt printed before each line.
pub const DEFAULT_PROMPT: &str = "$ ";

/// Names handled inside the shell process instead of by a `PATH` lookup.
pub const BUILTINS: &[&str] = &["echo", "exit", "type", "pwd", "cd", "history"];

/// Separator used when listing ambiguous completion candidates.
pub const CANDIDATE_SEPARATOR: &str = "  ";

pub(crate) const BELL: &[u8] = b"\x07";
pub(crate) const ERASE_LAST: &[u8] = b"\x08 \x08";
pub(crate) const CLEAR_LINE: &[u8] = b"\r\x1b[K";
pub(crate) const NEWLINE: &[u8] = b"\n";

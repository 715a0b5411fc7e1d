//! The input state machine.
//!
//! [`LineEditor`] reads one byte at a time from a [`Terminal`], decodes keys and keeps
//! the screen in step with its [`LineBuffer`]. Every change to the screen goes through
//! [`LineEditor::render`], which emits only the delta for the change, except for history
//! recall and candidate listings, which redraw the prompt line.

use tracing::{debug, trace};

use crate::completion::{CandidateSource, Completion, CompletionResult, PathSearch};
use crate::config::{
    BELL, BUILTINS, CANDIDATE_SEPARATOR, CLEAR_LINE, ERASE_LAST, HISTORY_INITIAL_CAPACITY,
    MAX_LINE_LEN, NEWLINE,
};
use crate::keys::KeyDecoder;
use crate::{Direction, Error, History, KeyEvent, LineBuffer, Result, Terminal};

/// The builtin completed without a `PATH` scan, and the three letters that trigger it.
const EAGER_BUILTIN: &str = "exit";
const EAGER_TRIGGER: &str = "exi";

/// A change to what is shown after the prompt.
enum Delta<'a> {
    /// Characters appended at the end of the line.
    Echo(&'a str),
    /// The last character was removed.
    EraseLast,
    Bell,
    /// The line was accepted.
    Newline,
    /// The whole line changed: clear it and print prompt and buffer again.
    Redraw,
    /// Print the candidates below the line, then prompt and buffer again.
    List(&'a [String]),
}

/// Interactive line reader with history recall and executable completion.
///
/// # Examples
///
/// ```no_run
/// use rawsh::{LineEditor, terminals::{RawMode, StdioTerminal}};
///
/// let _raw = RawMode::enable()?;
/// let mut editor = LineEditor::new();
/// let mut terminal = StdioTerminal::new();
///
/// if let Some(line) = editor.read_line(&mut terminal, "$ ")? {
///     println!("Got: {}", line);
/// }
/// # Ok::<(), rawsh::Error>(())
/// ```
///
/// # Key Bindings
///
/// - **Printable keys**: append to the line
/// - **Backspace**: delete the last character
/// - **Up/Down**: navigate history
/// - **Tab**: complete the command name; a second Tab lists ambiguous candidates
/// - **Enter**: submit line
#[derive(Debug)]
pub struct LineEditor<C = PathSearch> {
    line: LineBuffer,
    history: History,
    decoder: KeyDecoder,
    completer: C,
    builtins: Vec<String>,
    tab_presses: u8,
    at_eof: bool,
}

impl LineEditor<PathSearch> {
    /// Creates an editor that completes from the live `PATH`.
    pub fn new() -> Self {
        Self::with_completer(PathSearch::new())
    }
}

impl Default for LineEditor<PathSearch> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CandidateSource> LineEditor<C> {
    /// Creates an editor that asks `completer` for candidates.
    pub fn with_completer(completer: C) -> Self {
        Self {
            line: LineBuffer::new(MAX_LINE_LEN),
            history: History::new(HISTORY_INITIAL_CAPACITY),
            decoder: KeyDecoder::new(),
            completer,
            builtins: BUILTINS.iter().map(|name| name.to_string()).collect(),
            tab_presses: 0,
            at_eof: false,
        }
    }

    /// Replaces the builtin names known to the editor.
    pub fn with_builtins<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.builtins = names.iter().map(|name| name.as_ref().to_string()).collect();
        self
    }

    /// Replaces the line buffer with one refusing input past `limit - 1` bytes.
    pub fn with_line_limit(mut self, limit: usize) -> Self {
        self.line = LineBuffer::new(limit);
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// The line currently being composed.
    pub fn buffer(&self) -> &str {
        self.line.as_str()
    }

    /// Reads a line from the terminal with editing support.
    ///
    /// Prints `prompt`, processes keys until Enter and returns the line as typed. A
    /// non-blank line is added to history. Returns `Ok(None)` once the input is closed;
    /// a partial line pending at that moment is returned first.
    ///
    /// The terminal is expected to be in raw mode already.
    pub fn read_line<T: Terminal>(&mut self, terminal: &mut T, prompt: &str) -> Result<Option<String>> {
        if self.at_eof {
            return Ok(None);
        }

        self.line.clear();
        self.history.end_browse();
        self.decoder.reset();
        self.tab_presses = 0;

        terminal.write(prompt.as_bytes())?;
        terminal.flush()?;

        loop {
            let byte = match terminal.read_byte() {
                Ok(byte) => byte,
                Err(Error::Eof) => {
                    debug!(pending = self.line.len(), "end of input");
                    self.at_eof = true;
                    if self.line.is_empty() {
                        return Ok(None);
                    }
                    break;
                }
                Err(e) => return Err(e),
            };

            let Some(event) = self.decoder.feed(byte) else {
                continue;
            };
            trace!(?event, "key");

            if event == KeyEvent::Enter {
                break;
            }

            self.handle_key_event(terminal, prompt, event)?;
        }

        self.render(terminal, prompt, Delta::Newline)?;
        terminal.flush()?;

        let result = self.line.as_str().to_string();
        self.history.record(&result);
        Ok(Some(result))
    }

    fn handle_key_event<T: Terminal>(&mut self, terminal: &mut T, prompt: &str, event: KeyEvent) -> Result<()> {
        if event != KeyEvent::Tab {
            self.tab_presses = 0;
        }

        match event {
            KeyEvent::Normal(c) => {
                // A full buffer drops the key without any output.
                if self.line.push(c) {
                    let mut buf = [0; 4];
                    self.render(terminal, prompt, Delta::Echo(c.encode_utf8(&mut buf)))?;
                }
            }
            KeyEvent::Backspace => {
                if self.line.pop() {
                    self.render(terminal, prompt, Delta::EraseLast)?;
                }
            }
            KeyEvent::Tab => self.complete(terminal, prompt)?,
            KeyEvent::Up => {
                self.history.begin_browse(self.line.as_str());
                self.recall(terminal, prompt, Direction::Up)?;
            }
            KeyEvent::Down => self.recall(terminal, prompt, Direction::Down)?,
            // No cursor movement within the line
            KeyEvent::Left | KeyEvent::Right => {}
            KeyEvent::Enter => {}
        }

        terminal.flush()?;
        Ok(())
    }

    fn recall<T: Terminal>(&mut self, terminal: &mut T, prompt: &str, direction: Direction) -> Result<()> {
        if let Some(text) = self.history.recall(direction) {
            self.line.load(text);
            debug!(?direction, cursor = self.history.cursor(), "history recall");
            self.render(terminal, prompt, Delta::Redraw)?;
        }
        Ok(())
    }

    fn complete<T: Terminal>(&mut self, terminal: &mut T, prompt: &str) -> Result<()> {
        if self.line.as_str() == EAGER_TRIGGER && self.builtins.iter().any(|name| name == EAGER_BUILTIN) {
            self.tab_presses = 0;
            let suffix = format!("{} ", &EAGER_BUILTIN[EAGER_TRIGGER.len()..]);
            return self.append(terminal, prompt, &suffix);
        }

        let result = CompletionResult::scan(&self.completer, self.line.as_str());
        let completion = result.classify();
        debug!(?completion, tab_presses = self.tab_presses, "completion");

        match completion {
            Completion::NoMatch => self.render(terminal, prompt, Delta::Bell)?,
            Completion::Unique { suffix } => {
                self.tab_presses = 0;
                self.append(terminal, prompt, &suffix)?;
            }
            Completion::Extend { extension } => {
                self.tab_presses = 0;
                self.append(terminal, prompt, &extension)?;
            }
            Completion::Ambiguous => {
                if self.tab_presses == 0 {
                    self.render(terminal, prompt, Delta::Bell)?;
                } else {
                    self.render(terminal, prompt, Delta::List(result.candidates()))?;
                }
                self.tab_presses = self.tab_presses.saturating_add(1);
            }
        }

        Ok(())
    }

    /// Appends what fits of `text` and echoes exactly that part.
    fn append<T: Terminal>(&mut self, terminal: &mut T, prompt: &str, text: &str) -> Result<()> {
        let accepted = self.line.push_str(text);
        if accepted.is_empty() {
            return Ok(());
        }
        self.render(terminal, prompt, Delta::Echo(accepted))
    }

    fn render<T: Terminal>(&self, terminal: &mut T, prompt: &str, delta: Delta<'_>) -> Result<()> {
        match delta {
            Delta::Echo(text) => terminal.write(text.as_bytes()),
            Delta::EraseLast => terminal.write(ERASE_LAST),
            Delta::Bell => terminal.write(BELL),
            Delta::Newline => terminal.write(NEWLINE),
            Delta::Redraw => {
                terminal.write(CLEAR_LINE)?;
                terminal.write(prompt.as_bytes())?;
                terminal.write(self.line.as_bytes())
            }
            Delta::List(candidates) => {
                terminal.write(NEWLINE)?;
                terminal.write(candidates.join(CANDIDATE_SEPARATOR).as_bytes())?;
                terminal.write(NEWLINE)?;
                terminal.write(prompt.as_bytes())?;
                terminal.write(self.line.as_bytes())
            }
        }
    }
}

//! Byte-at-a-time key decoding.
//!
//! The [`KeyDecoder`] turns the raw byte stream of a terminal in raw mode into
//! [`KeyEvent`]s. Arrow keys arrive as three-byte `ESC [ X` (or `ESC O X`) sequences,
//! so the decoder keeps a small amount of state between bytes. Longer sequences with
//! numeric parameters (`ESC [ 3 ~` for Delete, `ESC [ 1 ; 5 C` and so on) are read to
//! their final byte and dropped.

use crate::KeyEvent;

const ESC: u8 = 0x1b;
const TAB: u8 = b'\t';
const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7f;

/// Decoder state between bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeState {
    /// Not inside an escape sequence.
    #[default]
    Normal,
    /// Saw `ESC`, waiting for `[` or `O`.
    EscapeSeq1,
    /// Saw `ESC [`, waiting for the final byte.
    EscapeSeq2,
    /// Inside the parameter bytes of `ESC [ 3 ~` style sequences.
    EscapeParams,
}

/// Incremental decoder from input bytes to key events.
///
/// # Examples
///
/// ```
/// use rawsh::{KeyDecoder, KeyEvent};
///
/// let mut decoder = KeyDecoder::new();
/// assert_eq!(decoder.feed(0x1b), None);
/// assert_eq!(decoder.feed(b'['), None);
/// assert_eq!(decoder.feed(b'A'), Some(KeyEvent::Up));
/// assert_eq!(decoder.feed(b'x'), Some(KeyEvent::Normal('x')));
/// ```
#[derive(Debug, Default)]
pub struct KeyDecoder {
    state: DecodeState,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, mostly useful in tests.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Drops any half-read escape sequence.
    pub fn reset(&mut self) {
        self.state = DecodeState::Normal;
    }

    /// Feeds one byte and returns the completed key event, if any.
    ///
    /// Unknown escape sequences and control bytes produce nothing.
    pub fn feed(&mut self, byte: u8) -> Option<KeyEvent> {
        match self.state {
            DecodeState::Normal => self.feed_normal(byte),
            DecodeState::EscapeSeq1 => {
                self.state = if byte == b'[' || byte == b'O' {
                    DecodeState::EscapeSeq2
                } else {
                    DecodeState::Normal
                };
                None
            }
            DecodeState::EscapeSeq2 => {
                if is_parameter(byte) {
                    self.state = DecodeState::EscapeParams;
                    return None;
                }
                self.state = DecodeState::Normal;
                match byte {
                    b'A' => Some(KeyEvent::Up),
                    b'B' => Some(KeyEvent::Down),
                    b'C' => Some(KeyEvent::Right),
                    b'D' => Some(KeyEvent::Left),
                    _ => None,
                }
            }
            DecodeState::EscapeParams => {
                // Anything other than more parameters ends the sequence
                if !is_parameter(byte) {
                    self.state = DecodeState::Normal;
                }
                None
            }
        }
    }

    fn feed_normal(&mut self, byte: u8) -> Option<KeyEvent> {
        match byte {
            TAB => Some(KeyEvent::Tab),
            b'\r' | b'\n' => Some(KeyEvent::Enter),
            DEL | BACKSPACE => Some(KeyEvent::Backspace),
            ESC => {
                self.state = DecodeState::EscapeSeq1;
                None
            }
            0x20..=0x7e => Some(KeyEvent::Normal(byte as char)),
            // Unknown/control character - ignore
            _ => None,
        }
    }
}

fn is_parameter(byte: u8) -> bool {
    byte.is_ascii_digit() || byte == b';'
}

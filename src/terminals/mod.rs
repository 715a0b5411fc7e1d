//! Terminal implementations.
//!
//! - [`StdioTerminal`]: stdin/stdout as a byte-level [`Terminal`](crate::Terminal)
//! - [`RawMode`]: scoped termios raw mode for a file descriptor
//!
//! Only Unix terminals are supported; raw mode is built on termios.

mod unix;

pub use unix::{RawMode, StdioTerminal};

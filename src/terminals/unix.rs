// Unix terminal implementation using termios

use crate::{Error, Result, Terminal};
use std::fmt;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use tracing::debug;

/// Unix terminal using stdin/stdout.
///
/// Raw mode is handled separately by [`RawMode`], so a `StdioTerminal` can be created
/// and dropped per line without touching terminal attributes.
#[derive(Debug)]
pub struct StdioTerminal {
    stdin: io::Stdin,
    stdout: io::Stdout,
}

impl StdioTerminal {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
        }
    }
}

impl Default for StdioTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for StdioTerminal {
    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        // A closed stdin surfaces as UnexpectedEof, which converts to Error::Eof.
        self.stdin.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.stdout.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.stdout.flush()?;
        Ok(())
    }
}

/// Raw terminal mode guard; restores the original attributes on drop.
///
/// Raw mode here means no canonical line buffering and no echo: every byte reaches the
/// editor as soon as it is typed, control keys included. Output processing and signal
/// keys are left alone.
pub struct RawMode {
    fd: RawFd,
    original: Option<libc::termios>,
}

impl RawMode {
    /// Switches stdin to raw mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TerminalAttributes`] if stdin is not a terminal or its attributes
    /// cannot be changed.
    pub fn enable() -> Result<Self> {
        Self::enable_on(io::stdin().as_raw_fd())
    }

    /// Switches the terminal behind `fd` to raw mode.
    pub fn enable_on(fd: RawFd) -> Result<Self> {
        let mut guard = Self { fd, original: None };

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();

            if libc::tcgetattr(fd, &mut termios) != 0 {
                return Err(Error::TerminalAttributes {
                    op: "query",
                    source: io::Error::last_os_error(),
                });
            }

            // Save original settings
            guard.original = Some(termios);

            // Disable canonical mode and echo
            termios.c_lflag &= !(libc::ECHO | libc::ICANON);

            // Block until at least one byte is available, no timeout
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &termios) != 0 {
                return Err(Error::TerminalAttributes {
                    op: "set",
                    source: io::Error::last_os_error(),
                });
            }
        }

        debug!(fd, "raw mode enabled");
        Ok(guard)
    }

    /// Returns `true` until [`disable`](Self::disable) has restored the terminal.
    pub fn is_active(&self) -> bool {
        self.original.is_some()
    }

    /// Restores the attributes captured by [`enable`](Self::enable).
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn disable(&mut self) -> Result<()> {
        if let Some(original) = self.original.take() {
            unsafe {
                if libc::tcsetattr(self.fd, libc::TCSAFLUSH, &original) != 0 {
                    return Err(Error::TerminalAttributes {
                        op: "restore",
                        source: io::Error::last_os_error(),
                    });
                }
            }
            debug!(fd = self.fd, "raw mode disabled");
        }

        Ok(())
    }
}

// libc::termios only implements Debug with libc's `extra_traits` feature.
impl fmt::Debug for RawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMode")
            .field("fd", &self.fd)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = self.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_on_non_terminal_fails() {
        let file = tempfile::tempfile().unwrap();
        match RawMode::enable_on(file.as_raw_fd()) {
            Err(Error::TerminalAttributes { op, .. }) => assert_eq!(op, "query"),
            other => panic!("expected attribute error, got {:?}", other),
        }
    }
}

//! Single-keystroke input for the `,` instruction.
//!
//! When stdin is a terminal, the terminal is switched into raw mode for the
//! duration of one read so a key press is delivered without Enter and without
//! the terminal echoing it. The previous mode is restored by [`RawModeGuard`]
//! on every exit path. When stdin is not a terminal, a plain one-byte read is
//! performed. On either path an EOT byte (Ctrl-D) is end-of-input.

use std::io::{self, IsTerminal, Read};

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Ctrl-D as delivered by a raw-mode terminal.
const END_OF_TRANSMISSION: u8 = 0x04;
/// Ctrl-C as delivered by a raw-mode terminal (signals are not generated in raw mode).
const END_OF_TEXT: u8 = 0x03;

/// Restores the terminal's previous mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Reads raw bytes from the process's stdin.
#[derive(Debug, Clone, Copy)]
pub struct TerminalInput {
    interactive: bool,
}

impl Default for TerminalInput {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalInput {
    /// Detect whether stdin is attached to a terminal.
    pub fn new() -> Self {
        Self {
            interactive: io::stdin().is_terminal(),
        }
    }

    /// Read one byte. `Ok(None)` is end-of-input.
    pub fn read_byte(&self) -> io::Result<Option<u8>> {
        if !self.interactive {
            return Ok(read_one(&mut io::stdin())?.and_then(end_of_input));
        }

        let byte = {
            let _guard = RawModeGuard::enable()?;
            read_one(&mut io::stdin())?
        };

        Ok(match byte {
            None => None,
            Some(b) => translate_key(b)?,
        })
    }
}

/// EOT ends the input whatever the device.
fn end_of_input(byte: u8) -> Option<u8> {
    (byte != END_OF_TRANSMISSION).then_some(byte)
}

/// Map terminal control keys onto input semantics.
fn translate_key(byte: u8) -> io::Result<Option<u8>> {
    match byte {
        END_OF_TRANSMISSION => Ok(None),
        END_OF_TEXT => Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted by Ctrl-C")),
        b'\r' => Ok(Some(b'\n')),
        other => Ok(Some(other)),
    }
}

fn read_one<R: Read>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

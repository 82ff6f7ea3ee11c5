//! Per-instruction trace events for `--debug` runs.
//!
//! The engine reports one [`TraceEvent`] after every executed instruction;
//! [`print_event`] renders it as an indented line on stdout, one indent level
//! per open loop, ending with the instruction's index in the program text.
//!
//! When the text ends inside a loop body whose cell is still non-zero, the
//! loop repeats as if a `]` stood right after the last byte; that repeat is
//! reported as a `]` event whose `ip` is the length of the text.

use std::io::{self, Write};

/// Snapshot taken right after an instruction was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEvent {
    /// Instruction byte (`>`, `<`, `+`, `-`, `.`, `,`, `[` or `]`).
    pub op: u8,
    /// Index of the instruction inside the program text (the text length for
    /// an implicit repeat at end of text).
    pub ip: usize,
    /// Cursor position after the instruction.
    pub cursor: usize,
    /// Value of the cell under the cursor after the instruction.
    pub cell: u8,
    /// Number of loops open when the event fired.
    pub depth: usize,
}

impl TraceEvent {
    /// Human-readable summary of what the instruction did.
    pub fn describe(&self) -> String {
        let (op, cursor, cell) = (self.op as char, self.cursor, self.cell);
        match self.op {
            b'>' => format!("{op} move cursor right: {cursor} [{cell}]"),
            b'<' => format!("{op} move cursor left: {cursor} [{cell}]"),
            b'+' => format!("{op} increment cell: {cursor} [{cell}]"),
            b'-' => format!("{op} decrement cell: {cursor} [{cell}]"),
            b'.' => format!("{op} output cell: {cursor} [{cell}]"),
            b',' => format!("{op} read input into: {cursor} [{cell}]"),
            b'[' if cell != 0 => format!("{op} while cell {cursor} not 0 [{cell}]:"),
            b'[' => format!("{op} cell {cursor} is 0, skip loop [{cell}]"),
            b']' if cell != 0 => format!("{op} repeat, cell {cursor} not 0 [{cell}]"),
            b']' => format!("{op} leave loop, cell {cursor} is 0 [{cell}]"),
            _ => format!("{op} cell: {cursor} [{cell}]"),
        }
    }

    /// Indented trace line without a trailing newline.
    pub fn render(&self) -> String {
        let indent = "  ".repeat(self.depth + 1);
        format!("{indent}{}  @{}", self.describe(), self.ip)
    }
}

/// Default observer: write the event to stdout.
pub fn print_event(event: &TraceEvent) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{}", event.render());
    let _ = out.flush();
}

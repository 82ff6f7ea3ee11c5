//! Interactive introspection commands.
//!
//! These are recognized on a line of their own inside the REPL and operate on
//! the session's tape between program runs:
//!
//! | Command     | Effect                                                        |
//! |-------------|---------------------------------------------------------------|
//! | `exit`      | end the session                                               |
//! | `clear`     | zero every cell (cursor unchanged)                            |
//! | `len`       | report the tape size                                          |
//! | `show[N]`   | report cell `N` (default 0, clamped to the tape)              |
//! | `print[N]`  | report the first `N` cells (default 16), cursor cell bracketed |

use crate::tape::Tape;

/// Number of cells listed by a bare `print`.
pub const DEFAULT_PRINT_COUNT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Exit,
    Clear,
    Len,
    Show(usize),
    Print(usize),
}

/// What the REPL should do after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Keep reading; print the message if any.
    Continue(Option<String>),
    /// End the session.
    Exit,
}

impl SessionCommand {
    /// Recognize a command line. Anything else is program text.
    ///
    /// `exit`, `clear` and `len` must stand alone. `show` and `print` are
    /// matched as prefixes and take the number that follows them, so `show 5`
    /// and `show5` are the same; a missing number falls back to the default.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line {
            "exit" => return Some(SessionCommand::Exit),
            "clear" => return Some(SessionCommand::Clear),
            "len" => return Some(SessionCommand::Len),
            _ => {}
        }
        if let Some(rest) = line.strip_prefix("show") {
            return Some(SessionCommand::Show(leading_number(rest).unwrap_or(0)));
        }
        if let Some(rest) = line.strip_prefix("print") {
            return Some(SessionCommand::Print(
                leading_number(rest).unwrap_or(DEFAULT_PRINT_COUNT),
            ));
        }
        None
    }

    /// Apply the command to `tape`.
    pub fn apply(self, tape: &mut Tape) -> Outcome {
        match self {
            SessionCommand::Exit => Outcome::Exit,
            SessionCommand::Clear => {
                tape.reset();
                Outcome::Continue(Some("Tape cleared".to_string()))
            }
            SessionCommand::Len => Outcome::Continue(Some(format!("Tape length: {}", tape.size()))),
            SessionCommand::Show(index) => Outcome::Continue(Some(show_cell(tape, index))),
            SessionCommand::Print(count) => Outcome::Continue(Some(print_cells(tape, count))),
        }
    }
}

/// `#N element: VVV [c]` for one cell; `N` is clamped to the tape.
pub fn show_cell(tape: &Tape, index: usize) -> String {
    let index = tape.clamp_index(index);
    match tape.read_at(index) {
        Ok(value) => format!("#{index} element: {value:>3} [{}]", printable(value)),
        Err(e) => e.to_string(),
    }
}

/// The first `count` cells (clamped to the tape), with the cursor's cell in brackets.
pub fn print_cells(tape: &Tape, count: usize) -> String {
    let count = count.min(tape.size());
    let cells = tape.cells()[..count]
        .iter()
        .enumerate()
        .map(|(i, value)| {
            if i == tape.cursor() {
                format!("[{value:>3}]")
            } else {
                format!("{value:>3}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("First {count} cells of the tape:\n{cells}")
}

/// Digits at the start of `text`, after any blanks; trailing text is ignored.
fn leading_number(text: &str) -> Option<usize> {
    let text = text.trim_start();
    let end = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    text[..end].parse().ok()
}

fn printable(value: u8) -> char {
    if value.is_ascii_graphic() || value == b' ' {
        value as char
    } else {
        '.'
    }
}

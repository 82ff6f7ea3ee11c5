use std::io::{self, Write};

use crate::engine::EngineError;

/// Pretty-print an [`EngineError`] with caret positioning.
/// If `program` is `Some("sbfi")`, prefix messages with "sbfi: ..." for batch runs.
pub fn print_engine_error(program: Option<&str>, code: &str, err: &EngineError) {
    let msg = match program {
        Some(p) => format!("{p}: {}", headline(err)),
        None => headline(err),
    };

    match err.ip() {
        Some(ip) => print_error_with_context(&msg, code, ip),
        None => {
            eprintln!("{msg}");
            let _ = io::stderr().flush();
        }
    }
}

/// First line of an error report, without the instruction index.
fn headline(err: &EngineError) -> String {
    match err {
        EngineError::Boundary { source, .. } => format!("Runtime error: {source}"),
        EngineError::UnmatchedBracket { kind, .. } => {
            format!("Parsing error: unmatched bracket '{}': {kind}", kind.symbol())
        }
        EngineError::Io { source, .. } => format!("I/O error: {source}"),
        EngineError::StepLimitExceeded { .. } | EngineError::Canceled => err.to_string(),
    }
}

/// Print a concise error with instruction index and a caret context window.
pub fn print_error_with_context(prefix: &str, code: &str, pos: usize) {
    eprintln!("{prefix} at instruction {pos}");
    let (window, caret) = context_window(code, pos);
    eprintln!("  {window}");
    eprintln!("  {caret}");
    let _ = io::stderr().flush();
}

/// A short slice of `code` around byte `pos` and a caret line pointing at it.
///
/// Line breaks in the slice are shown as spaces so the caret stays aligned.
fn context_window(code: &str, pos: usize) -> (String, String) {
    // Show a short window around the position for context
    const WINDOW: usize = 32;

    let bytes = code.as_bytes();
    let start = pos.saturating_sub(WINDOW);
    let end = (pos + WINDOW + 1).min(bytes.len());
    let slice: String = bytes[start.min(end)..end]
        .iter()
        .map(|&b| if b.is_ascii_graphic() { b as char } else { ' ' })
        .collect();

    // Caret under the exact position
    let caret = format!("{}^", " ".repeat(pos.saturating_sub(start)));
    (slice, caret)
}

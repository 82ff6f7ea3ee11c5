//! Loading program text from a file.
//!
//! Lines are joined without separators, so a program may be wrapped freely.
//! The joined text is capped at [`MAX_SOURCE_LEN`] bytes.

use std::fs;
use std::io;
use std::path::Path;

/// Largest program accepted from a file, in bytes.
pub const MAX_SOURCE_LEN: usize = 65_536;

/// Read `path` and join its lines into one program string.
pub fn load_source(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let program = join_lines(&bytes);
    log::debug!("read {} bytes of program text from '{}'", program.len(), path.display());
    Ok(program)
}

/// Drop line terminators and cap the result at [`MAX_SOURCE_LEN`] bytes.
pub fn join_lines(bytes: &[u8]) -> String {
    let mut joined: Vec<u8> = bytes
        .split(|&b| b == b'\n')
        .flat_map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .copied()
        .collect();

    if joined.len() > MAX_SOURCE_LEN {
        log::warn!(
            "program text is {} bytes; only the first {MAX_SOURCE_LEN} are used",
            joined.len()
        );
        joined.truncate(MAX_SOURCE_LEN);
    }

    // Non-instruction bytes are ignored by the engine, so lossy decoding is harmless.
    String::from_utf8_lossy(&joined).into_owned()
}

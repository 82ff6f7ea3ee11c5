//! A simple Brainfuck interpreter that executes straight from source text.
//!
//! The machine is a fixed-size byte tape (65,536 cells by default) with a
//! single cursor. Programs are not compiled: the engine walks the text byte by
//! byte, and loop bodies are re-read from the text on every iteration.
//!
//! Features and behaviors:
//! - Tape cells start at 0 and wrap at 8 bits.
//! - Strict cursor bounds: moving left from cell 0 or right past the last
//!   cell is an error.
//! - `,` reads one raw keystroke; on end-of-input the cell keeps its value.
//! - `.` writes the cell as a raw byte and flushes immediately.
//! - Unmatched brackets are reported when execution reaches them.
//! - Any other character is ignored.
//!
//! Quick start:
//!
//! ```no_run
//! use sbfi::Engine;
//!
//! // Classic "Hello World!" in Brainfuck
//! let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
//! let mut engine = Engine::with_tape_size(sbfi::DEFAULT_TAPE_SIZE).expect("tape allocation");
//! engine.execute(code).expect("program should run");
//! ```

pub mod cli_util;
pub mod commands;
pub mod config;
pub mod engine;
pub mod highlight;
pub mod input;
pub mod repl;
pub mod session;
pub mod source;
pub mod tape;
pub mod trace;

pub use engine::{Engine, EngineError, StepControl, UnmatchedBracketKind};
pub use tape::{DEFAULT_TAPE_SIZE, Tape, TapeError};
pub use trace::TraceEvent;

//! Host entry points called from `main.rs`. Each returns the process exit code.

pub mod repl;
pub mod run;

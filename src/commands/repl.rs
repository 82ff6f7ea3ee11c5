use std::io::{self, IsTerminal, Write};

use crate::engine::Engine;
use crate::repl::{ModeFlagOverride, ReplMode, Session, select_mode};

// Public entry point for the REPL from main.rs
pub fn run(program: &str, engine: Engine, max_steps: Option<usize>, mode_flag: ModeFlagOverride) -> i32 {
    // Determine mode: flags -> env -> auto-detect via is_terminal()
    let mode = match select_mode(mode_flag) {
        Ok(m) => m,
        Err(msg) => {
            eprintln!("{program}: {msg}");
            let _ = io::stderr().flush();
            return 1;
        }
    };
    log::debug!("starting REPL in {mode:?} mode");

    let mut session = Session::new(engine, max_steps);

    // Ctrl+C cancels a running program; at the prompt it ends the session.
    if let Err(e) = ctrlc::set_handler(session.interrupt_handler()) {
        eprintln!("{program}: failed to set ctrl+c handler: {e}");
        let _ = io::stderr().flush();
        return 1;
    }

    // Print banners only if stderr is a TTY
    if io::stderr().is_terminal() {
        eprintln!("sbfi - simple brainfuck interpreter v{}", env!("CARGO_PKG_VERSION"));
        if mode == ReplMode::Editor {
            eprintln!("Commands: exit, clear, len, show [N], print [N]. Ctrl+c at the prompt exits");
        }
        let _ = io::stderr().flush();
    }

    let result = match mode {
        ReplMode::Editor => session.editor_loop(),
        ReplMode::Bare => session.bare_loop(),
    };

    if let Err(e) = result {
        eprintln!("{program}: REPL error: {e}");
        let _ = io::stderr().flush();
        return 1;
    }
    0
}

use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};

use crate::cli_util;
use crate::config;
use crate::engine::{Engine, StepControl};
use crate::highlight::TapeHighlighter;
use crate::session::{Outcome, SessionCommand};

/// Environment variable that forces the REPL mode (`bare` or `editor`).
pub const REPL_MODE_ENV: &str = "SBFI_REPL_MODE";

const HISTORY_FILE: &str = "sbfi_history.txt";
const HISTORY_CAPACITY: usize = 1_000;

/// One interactive session: a single engine (and tape) shared by every line.
pub struct Session {
    engine: Engine,
    step_control: StepControl,
    running: Arc<AtomicBool>,
}

impl Session {
    pub fn new(engine: Engine, max_steps: Option<usize>) -> Self {
        Self {
            engine,
            step_control: StepControl::new(max_steps, Arc::new(AtomicBool::new(false))),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// SIGINT handler: cancel the running program, or end the session at the prompt.
    pub fn interrupt_handler(&self) -> impl Fn() + Send + 'static {
        let running = Arc::clone(&self.running);
        let cancel = Arc::clone(&self.step_control.cancel_flag);
        move || {
            if running.load(Ordering::SeqCst) {
                cancel.store(true, Ordering::SeqCst);
            } else {
                let _ = io::stdout().flush();
                let _ = io::stderr().flush();
                std::process::exit(0);
            }
        }
    }

    /// Handle one submitted line: a session command or a program.
    pub fn handle_line(&mut self, line: &str) -> Outcome {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Outcome::Continue(None); // Ignore empty submissions
        }

        if let Some(command) = SessionCommand::parse(trimmed) {
            return command.apply(self.engine.tape_mut());
        }

        self.run_program(trimmed);
        Outcome::Continue(None)
    }

    /// Executes one program against the session tape.
    /// - Program output goes to stdout.
    /// - Errors are printed concisely to stderr; the session and its tape survive.
    /// - If the output stopped mid-line, a newline is added so the prompt begins at column 0.
    fn run_program(&mut self, code: &str) {
        self.step_control.cancel_flag.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        let result = self.engine.execute_with_control(code, &self.step_control);
        self.running.store(false, Ordering::SeqCst);

        if self.engine.output_ends_mid_line() {
            println!();
            let _ = io::stdout().flush();
        }
        if let Err(err) = result {
            cli_util::print_engine_error(None, code, &err);
        }
    }

    /// Returns false when the session should end.
    fn submit(&mut self, line: &str) -> io::Result<bool> {
        match self.handle_line(line) {
            Outcome::Exit => {
                if io::stderr().is_terminal() {
                    eprintln!("Exiting...");
                }
                Ok(false)
            }
            Outcome::Continue(Some(message)) => {
                let mut out = io::stdout().lock();
                writeln!(out, "{message}")?;
                out.flush()?;
                Ok(true)
            }
            Outcome::Continue(None) => Ok(true),
        }
    }

    /// Interactive line editor loop. Enter submits the line.
    pub fn editor_loop(&mut self) -> io::Result<()> {
        let mut editor = init_line_editor();
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("sbfi".to_string()),
            DefaultPromptSegment::Empty,
        );

        loop {
            match editor.read_line(&prompt) {
                Ok(Signal::Success(buffer)) => {
                    if !self.submit(&buffer)? {
                        return Ok(());
                    }
                }
                Ok(Signal::CtrlC) | Ok(Signal::CtrlD) => {
                    // End the session cleanly
                    println!();
                    io::stdout().flush()?;
                    return Ok(());
                }
                Err(e) => {
                    eprintln!("repl: editor error: {e}");
                    let _ = io::stderr().flush();
                    return Ok(());
                }
            }
        }
    }

    /// Non-interactive loop: one line of stdin at a time until EOF or `exit`.
    ///
    /// `,` reads from the same stdin, continuing right after the current line.
    pub fn bare_loop(&mut self) -> io::Result<()> {
        loop {
            let line = read_line_from(&mut io::stdin().lock())?;
            let Some(line) = line else {
                return Ok(());
            };
            if !self.submit(&line)? {
                return Ok(());
            }
        }
    }
}

/// Read one line; `None` at EOF.
pub fn read_line_from<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    match reader.read_line(&mut line)? {
        0 => Ok(None),
        _ => Ok(Some(line)),
    }
}

fn init_line_editor() -> Reedline {
    use reedline::{Emacs, KeyCode, KeyModifiers, ReedlineEvent, default_emacs_keybindings};

    // Alt+Up/Alt+Down or Ctrl+Up/Ctrl+Down also walk the history.
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Down, ReedlineEvent::NextHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Down, ReedlineEvent::NextHistory);

    let editor = Reedline::create()
        .with_highlighter(Box::new(TapeHighlighter::default()))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    let Some(path) = config::config_home().map(|dir| dir.join(HISTORY_FILE)) else {
        return editor;
    };
    match FileBackedHistory::with_file(HISTORY_CAPACITY, path) {
        Ok(history) => editor.with_history(Box::new(history)),
        Err(e) => {
            log::warn!("history file unavailable, keeping history in memory: {e}");
            editor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplMode {
    Bare,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlagOverride {
    None,
    Bare,
    Editor,
}

pub fn select_mode(flag: ModeFlagOverride) -> Result<ReplMode, String> {
    // Flag override
    match flag {
        ModeFlagOverride::Bare => return Ok(ReplMode::Bare),
        ModeFlagOverride::Editor => {
            if !io::stdin().is_terminal() {
                return Err("cannot start editor: stdin is not a TTY (use --bare or SBFI_REPL_MODE=bare)".to_string());
            }
            return Ok(ReplMode::Editor);
        }
        ModeFlagOverride::None => {}
    }

    // Environment override
    if let Ok(val) = env::var(REPL_MODE_ENV) {
        let v = val.trim().to_ascii_lowercase();
        return match v.as_str() {
            "bare" => Ok(ReplMode::Bare),
            "editor" => {
                if !io::stdin().is_terminal() {
                    return Err("cannot start editor: stdin is not a TTY (use SBFI_REPL_MODE=bare)".to_string());
                }
                Ok(ReplMode::Editor)
            }
            _ => Err(format!("invalid {REPL_MODE_ENV} value: {val}, must be 'bare' or 'editor'")),
        };
    }

    // Auto-detect
    if io::stdin().is_terminal() {
        Ok(ReplMode::Editor)
    } else {
        Ok(ReplMode::Bare)
    }
}

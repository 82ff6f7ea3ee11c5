//! The execution engine: runs program text against a [`Tape`].
//!
//! Program text is interpreted straight from source, one byte at a time.
//! There is no compiled form and no jump table: a loop's end is found by
//! scanning forward from its `[` at the moment the loop is skipped, and the
//! body is re-read from the text on every iteration.
//!
//! Behavior:
//! - `>` / `<` move the cursor; moving past either end of the tape is an error.
//! - `+` / `-` wrap at 8 bits.
//! - `.` writes the current cell as a raw byte and flushes immediately.
//! - `,` reads a single raw keystroke and echoes it; on end-of-input the cell
//!   keeps its value and nothing is echoed.
//! - `[` / `]` loop while the current cell is non-zero. A `]` with no open loop
//!   and a `[` with no closing partner are reported when execution reaches them.
//! - Every other byte is ignored.

use std::fmt;
use std::io::{self, Write};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::input::TerminalInput;
use crate::tape::{Tape, TapeError};
use crate::trace::TraceEvent;

/// Errors that stop a program run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The cursor was moved past either end of the tape.
    #[error("{source} at instruction {ip}")]
    Boundary {
        ip: usize,
        #[source]
        source: TapeError,
    },

    /// A loop bracket had no partner.
    #[error("{kind} at instruction {ip}")]
    UnmatchedBracket { ip: usize, kind: UnmatchedBracketKind },

    /// Reading input or writing output failed.
    #[error("I/O error at instruction {ip}: {source}")]
    Io {
        ip: usize,
        #[source]
        source: io::Error,
    },

    /// Execution aborted due to step limit.
    #[error("Execution aborted: step limit exceeded ({limit})")]
    StepLimitExceeded { limit: usize },

    /// Execution aborted due to cooperative cancellation (e.g. Ctrl-C).
    #[error("Execution aborted: cancelled")]
    Canceled,
}

impl EngineError {
    /// Instruction index the error points at, when there is one.
    pub fn ip(&self) -> Option<usize> {
        match self {
            EngineError::Boundary { ip, .. }
            | EngineError::UnmatchedBracket { ip, .. }
            | EngineError::Io { ip, .. } => Some(*ip),
            EngineError::StepLimitExceeded { .. } | EngineError::Canceled => None,
        }
    }
}

/// Which side of the loop was unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedBracketKind {
    /// A `[` whose closing `]` is missing.
    Open,
    /// A `]` reached with no loop open.
    Close,
}

impl UnmatchedBracketKind {
    /// The bracket character that was left unmatched.
    pub fn symbol(&self) -> char {
        match self {
            UnmatchedBracketKind::Open => '[',
            UnmatchedBracketKind::Close => ']',
        }
    }
}

impl fmt::Display for UnmatchedBracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedBracketKind::Open => write!(f, "can't find closing brace"),
            UnmatchedBracketKind::Close => write!(f, "found unmatched brace"),
        }
    }
}

/// Controls for cooperative cancellation and step limiting.
#[derive(Clone, Debug)]
pub struct StepControl {
    pub max_steps: Option<usize>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl StepControl {
    pub fn new(max_steps: Option<usize>, cancel_flag: Arc<AtomicBool>) -> Self {
        Self { max_steps, cancel_flag }
    }

    fn check(&self, steps: usize) -> Result<(), EngineError> {
        if self.cancel_flag.load(Ordering::Relaxed) {
            return Err(EngineError::Canceled);
        }
        if let Some(max) = self.max_steps {
            if steps >= max {
                return Err(EngineError::StepLimitExceeded { limit: max });
            }
        }
        Ok(())
    }
}

/// True for the eight instruction bytes.
pub fn is_instruction(byte: u8) -> bool {
    matches!(byte, b'>' | b'<' | b'+' | b'-' | b'.' | b',' | b'[' | b']')
}

/// Index of the `]` closing the `[` at `open`, counting nested pairs.
///
/// `None` when there is no partner, or when `open` is not a `[`.
pub fn find_matching_close(code: &[u8], open: usize) -> Option<usize> {
    if code.get(open) != Some(&b'[') {
        return None;
    }
    let mut depth = 0usize;
    for (j, &byte) in code.iter().enumerate().skip(open) {
        match byte {
            b'[' => depth += 1,
            b']' => depth -= 1,
            _ => continue,
        }
        if depth == 0 {
            return Some(j);
        }
    }
    None
}

type OutputSink = Box<dyn Fn(&[u8]) + Send + Sync>;
type InputProvider = Box<dyn Fn() -> Option<u8> + Send + Sync>;
type TraceObserver = Box<dyn Fn(&TraceEvent) + Send + Sync>;

/// Interpreter bound to one tape for its whole lifetime.
///
/// Successive calls to [`Engine::execute`] share the tape, so state carries
/// over between programs the way it does in an interactive session.
pub struct Engine {
    tape: Tape,
    terminal: TerminalInput,
    // Optional hooks:
    output_sink: Option<OutputSink>,
    input_provider: Option<InputProvider>,
    trace_observer: Option<TraceObserver>,
    last_output: Option<u8>,
}

impl Engine {
    pub fn new(tape: Tape) -> Self {
        Self {
            tape,
            terminal: TerminalInput::new(),
            output_sink: None,
            input_provider: None,
            trace_observer: None,
            last_output: None,
        }
    }

    /// Allocate a fresh tape of `size` cells and wrap it in an engine.
    pub fn with_tape_size(size: usize) -> Result<Self, TapeError> {
        Ok(Self::new(Tape::new(size)?))
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn tape_mut(&mut self) -> &mut Tape {
        &mut self.tape
    }

    /// Provide an output sink. When set, '.' sends bytes to this sink instead of stdout.
    pub fn set_output_sink<F>(&mut self, sink: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.output_sink = Some(Box::new(sink));
    }

    /// Provide an input provider. When set, ',' reads from this provider instead of the terminal.
    /// Returning None indicates end-of-input (the cell is left unchanged).
    /// Bytes it returns are echoed like keystrokes.
    pub fn set_input_provider<F>(&mut self, provider: F)
    where
        F: Fn() -> Option<u8> + Send + Sync + 'static,
    {
        self.input_provider = Some(Box::new(provider));
    }

    /// Observe every executed instruction.
    pub fn set_trace_observer<F>(&mut self, observer: F)
    where
        F: Fn(&TraceEvent) + Send + Sync + 'static,
    {
        self.trace_observer = Some(Box::new(observer));
    }

    /// True when the last program wrote output that did not end with a newline.
    pub fn output_ends_mid_line(&self) -> bool {
        matches!(self.last_output, Some(b) if b != b'\n')
    }

    /// Run `program` from the top level (no loop open).
    pub fn execute(&mut self, program: &str) -> Result<(), EngineError> {
        self.last_output = None;
        self.run(program.as_bytes(), 0, None)
    }

    /// Run `program` as the body of `depth` loops that are already open.
    ///
    /// With `depth > 0`, the first `]` that has no opener inside `program`
    /// closes the enclosing scope: the call returns `Ok` without executing
    /// anything after it. With `depth == 0` such a `]` is an error.
    pub fn execute_at_depth(&mut self, program: &str, depth: usize) -> Result<(), EngineError> {
        self.run(program.as_bytes(), depth, None)
    }

    /// Run `program` with cooperative cancellation and an optional step limit.
    pub fn execute_with_control(
        &mut self,
        program: &str,
        step_control: &StepControl,
    ) -> Result<(), EngineError> {
        self.last_output = None;
        self.run(program.as_bytes(), 0, Some(step_control))
    }

    fn run(
        &mut self,
        code: &[u8],
        base_depth: usize,
        step_control: Option<&StepControl>,
    ) -> Result<(), EngineError> {
        // Positions of the `[` whose bodies are currently executing.
        let mut open: Vec<usize> = Vec::new();
        let mut code_ptr = 0usize;
        let mut step = 0usize;

        loop {
            if code_ptr >= code.len() {
                // The text ended inside a loop body. The body is over, so the
                // loop test runs again; once it fails the `]` must be found.
                let Some(&start) = open.last() else {
                    return Ok(());
                };
                if let Some(ctrl) = step_control {
                    ctrl.check(step)?;
                }
                step += 1;

                if self.tape.get() == 0 {
                    return Err(EngineError::UnmatchedBracket {
                        ip: start,
                        kind: UnmatchedBracketKind::Open,
                    });
                }
                self.trace(b']', code.len(), base_depth + open.len());
                code_ptr = start + 1;
                continue;
            }

            let instr = code[code_ptr];
            if !is_instruction(instr) {
                code_ptr += 1;
                continue;
            }

            if let Some(ctrl) = step_control {
                ctrl.check(step)?;
            }
            step += 1;

            match instr {
                b'>' => self
                    .tape
                    .move_right()
                    .map_err(|source| EngineError::Boundary { ip: code_ptr, source })?,
                b'<' => self
                    .tape
                    .move_left()
                    .map_err(|source| EngineError::Boundary { ip: code_ptr, source })?,
                b'+' => self.tape.increment(),
                b'-' => self.tape.decrement(),
                b'.' => self
                    .emit(self.tape.get())
                    .map_err(|source| EngineError::Io { ip: code_ptr, source })?,
                b',' => self
                    .read_into_cell()
                    .map_err(|source| EngineError::Io { ip: code_ptr, source })?,
                b'[' => {
                    if self.tape.get() == 0 {
                        self.trace(instr, code_ptr, base_depth + open.len());
                        let close = find_matching_close(code, code_ptr).ok_or(
                            EngineError::UnmatchedBracket {
                                ip: code_ptr,
                                kind: UnmatchedBracketKind::Open,
                            },
                        )?;
                        code_ptr = close + 1;
                        continue;
                    }
                    open.push(code_ptr);
                }
                b']' => match open.last().copied() {
                    None if base_depth == 0 => {
                        return Err(EngineError::UnmatchedBracket {
                            ip: code_ptr,
                            kind: UnmatchedBracketKind::Close,
                        });
                    }
                    // Closes a loop opened by the caller.
                    None => return Ok(()),
                    Some(start) => {
                        if self.tape.get() != 0 {
                            self.trace(instr, code_ptr, base_depth + open.len());
                            code_ptr = start + 1;
                            continue;
                        }
                        open.pop();
                    }
                },
                _ => unreachable!("filtered by is_instruction"),
            }

            self.trace(instr, code_ptr, base_depth + open.len());
            code_ptr += 1;
        }
    }

    fn trace(&self, op: u8, ip: usize, depth: usize) {
        if let Some(observer) = self.trace_observer.as_ref() {
            let event = TraceEvent {
                op,
                ip,
                cursor: self.tape.cursor(),
                cell: self.tape.get(),
                depth,
            };
            (observer)(&event);
        }
    }

    fn emit(&mut self, byte: u8) -> io::Result<()> {
        self.last_output = Some(byte);
        // Use output sink when provided; fall back to stdout.
        if let Some(sink) = self.output_sink.as_ref() {
            (sink)(&[byte]);
            return Ok(());
        }
        let mut out = io::stdout().lock();
        out.write_all(&[byte])?;
        out.flush()
    }

    fn read_into_cell(&mut self) -> io::Result<()> {
        let byte = match self.input_provider.as_ref() {
            Some(provider) => (provider)(),
            None => self.terminal.read_byte()?,
        };
        let Some(byte) = byte else {
            return Ok(());
        };
        // The device never echoes; every byte read is shown by the engine.
        self.emit(byte)?;
        self.tape.set(byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn engine(size: usize) -> Engine {
        Engine::with_tape_size(size).unwrap()
    }

    fn capture(engine: &mut Engine) -> Arc<Mutex<Vec<u8>>> {
        let out = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&out);
        engine.set_output_sink(move |bytes| sink.lock().unwrap().extend_from_slice(bytes));
        out
    }

    fn feed(engine: &mut Engine, input: &[u8]) {
        let queue = Mutex::new(input.iter().copied().collect::<VecDeque<u8>>());
        engine.set_input_provider(move || queue.lock().unwrap().pop_front());
    }

    fn limited(max_steps: usize) -> StepControl {
        StepControl::new(Some(max_steps), Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn increments_then_outputs_three() {
        let mut bf = engine(16);
        let out = capture(&mut bf);
        bf.execute("+++.").unwrap();
        assert_eq!(*out.lock().unwrap(), vec![3]);
    }

    #[test]
    fn loop_moves_value_to_next_cell() {
        let mut bf = engine(3);
        let out = capture(&mut bf);
        bf.execute("++[>+<-]>.").unwrap();
        assert_eq!(*out.lock().unwrap(), vec![2]);
        assert_eq!(bf.tape().cells(), &[0, 2, 0]);
        assert_eq!(bf.tape().cursor(), 1);
    }

    #[test]
    fn lone_close_bracket_is_unmatched() {
        let mut bf = engine(4);
        let err = bf.execute("]").unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnmatchedBracket { ip: 0, kind: UnmatchedBracketKind::Close }
        ));
        assert_eq!(err.to_string(), "found unmatched brace at instruction 0");
    }

    #[test]
    fn lone_open_bracket_cannot_find_closing_brace() {
        let mut bf = engine(4);
        let err = bf.execute("[").unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnmatchedBracket { ip: 0, kind: UnmatchedBracketKind::Open }
        ));
        assert!(err.to_string().contains("can't find closing brace"));
    }

    #[test]
    fn moving_left_of_first_cell_is_a_boundary_error() {
        let mut bf = engine(4);
        let err = bf.execute("<").unwrap_err();
        assert!(matches!(err, EngineError::Boundary { ip: 0, .. }));
        assert_eq!(bf.tape().cursor(), 0);
    }

    #[test]
    fn moving_right_of_last_cell_is_a_boundary_error() {
        let mut bf = engine(3);
        bf.tape_mut().set(5);
        let err = bf.execute(">>>").unwrap_err();
        assert!(matches!(err, EngineError::Boundary { ip: 2, .. }));
        assert_eq!(bf.tape().cursor(), 2);
        assert_eq!(bf.tape().read_at(0), Ok(5));
    }

    #[test]
    fn output_before_an_unmatched_close_is_kept() {
        let mut bf = engine(4);
        let out = capture(&mut bf);
        let err = bf.execute(".+.]+.").unwrap_err();
        assert!(matches!(err, EngineError::UnmatchedBracket { ip: 3, .. }));
        assert_eq!(*out.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn extra_close_after_a_finished_loop_is_unmatched() {
        let mut bf = engine(4);
        let err = bf.execute("+[-]]").unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnmatchedBracket { ip: 4, kind: UnmatchedBracketKind::Close }
        ));
    }

    #[test]
    fn loop_on_zero_cell_resumes_after_matching_close() {
        let mut bf = engine(4);
        let out = capture(&mut bf);
        bf.execute("[[+]+.]+.").unwrap();
        assert_eq!(*out.lock().unwrap(), vec![1]);
    }

    #[test]
    fn body_runs_before_missing_close_is_reported() {
        let mut bf = engine(4);
        let out = capture(&mut bf);
        let err = bf.execute("+[-.").unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnmatchedBracket { ip: 1, kind: UnmatchedBracketKind::Open }
        ));
        assert_eq!(*out.lock().unwrap(), vec![0]);
    }

    #[test]
    fn unterminated_body_repeats_while_cell_is_non_zero() {
        let mut bf = engine(4);
        let out = capture(&mut bf);
        let err = bf.execute("+++[-.").unwrap_err();
        assert!(matches!(err, EngineError::UnmatchedBracket { ip: 3, .. }));
        assert_eq!(*out.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn nested_loops_multiply() {
        let mut bf = engine(8);
        let out = capture(&mut bf);
        bf.execute("+++[>++[>+<-]<-]>>.").unwrap();
        assert_eq!(*out.lock().unwrap(), vec![6]);
    }

    #[test]
    fn hello_world() {
        let mut bf = engine(64);
        let out = capture(&mut bf);
        let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
        bf.execute(code).unwrap();
        assert_eq!(*out.lock().unwrap(), b"Hello World!\n".to_vec());
    }

    #[test]
    fn non_instruction_bytes_are_ignored() {
        let mut bf = engine(4);
        let out = capture(&mut bf);
        bf.execute("add + and + again + then print .\n").unwrap();
        assert_eq!(*out.lock().unwrap(), vec![3]);
    }

    #[test]
    fn tape_persists_between_programs() {
        let mut bf = engine(4);
        let out = capture(&mut bf);
        bf.execute("+++>").unwrap();
        bf.execute("<.").unwrap();
        assert_eq!(*out.lock().unwrap(), vec![3]);
    }

    #[test]
    fn cells_wrap_both_ways() {
        let mut bf = engine(1);
        bf.execute("-").unwrap();
        assert_eq!(bf.tape().get(), 255);
        bf.execute(&"+".repeat(257)).unwrap();
        assert_eq!(bf.tape().get(), 0);
    }

    #[test]
    fn nested_entry_returns_at_enclosing_close() {
        let mut bf = engine(4);
        bf.execute_at_depth("++]+++", 1).unwrap();
        assert_eq!(bf.tape().get(), 2);

        bf.execute_at_depth("[-]+]+", 2).unwrap();
        assert_eq!(bf.tape().get(), 1);

        assert!(bf.execute_at_depth("+]", 0).is_err());
    }

    #[test]
    fn input_stores_byte_and_eof_keeps_cell() {
        let mut bf = engine(4);
        let out = capture(&mut bf);
        feed(&mut bf, b"A");
        bf.execute(",.,.").unwrap();
        // Echo of the read, then two prints; the second read echoes nothing.
        assert_eq!(*out.lock().unwrap(), vec![b'A', b'A', b'A']);
    }

    #[test]
    fn eof_on_first_read_leaves_existing_value() {
        let mut bf = engine(4);
        feed(&mut bf, b"");
        bf.tape_mut().set(9);
        bf.execute(",").unwrap();
        assert_eq!(bf.tape().get(), 9);
    }

    #[test]
    fn step_limit_stops_infinite_loop() {
        let mut bf = engine(4);
        let err = bf.execute_with_control("+[]", &limited(50)).unwrap_err();
        assert!(matches!(err, EngineError::StepLimitExceeded { limit: 50 }));
    }

    #[test]
    fn unterminated_loop_on_non_zero_cell_never_finishes() {
        let mut bf = engine(4);
        let err = bf.execute_with_control("+[", &limited(1_000)).unwrap_err();
        assert!(matches!(err, EngineError::StepLimitExceeded { limit: 1_000 }));
    }

    #[test]
    fn cancel_flag_aborts_run() {
        let mut bf = engine(4);
        let ctrl = StepControl::new(None, Arc::new(AtomicBool::new(true)));
        let err = bf.execute_with_control("+", &ctrl).unwrap_err();
        assert!(matches!(err, EngineError::Canceled));
        assert_eq!(bf.tape().get(), 0);
    }

    #[test]
    fn trace_reports_each_instruction_with_depth() {
        let mut bf = engine(4);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        bf.set_trace_observer(move |e| sink.lock().unwrap().push((e.op, e.depth, e.cell)));
        bf.execute("+[-]x>").unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec![(b'+', 0, 1), (b'[', 1, 1), (b'-', 1, 0), (b']', 0, 0), (b'>', 0, 0)]
        );
    }

    #[test]
    fn trace_reports_implicit_repeat_at_end_of_text() {
        let mut bf = engine(4);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        bf.set_trace_observer(move |e| sink.lock().unwrap().push((e.op, e.ip, e.depth, e.cell)));
        let err = bf.execute("++[-").unwrap_err();
        assert!(matches!(err, EngineError::UnmatchedBracket { ip: 2, .. }));
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                (b'+', 0, 0, 1),
                (b'+', 1, 0, 2),
                (b'[', 2, 1, 2),
                (b'-', 3, 1, 1),
                (b']', 4, 1, 1),
                (b'-', 3, 1, 0),
            ]
        );
    }

    #[test]
    fn output_line_tracking() {
        let mut bf = engine(16);
        let _out = capture(&mut bf);
        bf.execute("+.").unwrap();
        assert!(bf.output_ends_mid_line());
        bf.execute("[-]++++++++++.").unwrap();
        assert!(!bf.output_ends_mid_line());
        bf.execute("+").unwrap();
        assert!(!bf.output_ends_mid_line());
    }

    #[test]
    fn matching_close_counts_nesting() {
        assert_eq!(find_matching_close(b"[[]]", 0), Some(3));
        assert_eq!(find_matching_close(b"[[]]", 1), Some(2));
        assert_eq!(find_matching_close(b"+[[]", 1), None);
        assert_eq!(find_matching_close(b"[a]", 0), Some(2));
    }

    #[test]
    fn matching_close_needs_an_open_bracket_at_start() {
        assert_eq!(find_matching_close(b"]", 0), None);
        assert_eq!(find_matching_close(b"+[]", 0), None);
        assert_eq!(find_matching_close(b"[]", 5), None);
    }
}

use std::io::{self, Write};
use std::path::Path;

use crate::cli_util::print_engine_error;
use crate::engine::{Engine, StepControl};
use crate::source::load_source;

/// Run the program stored at `path` once against `engine`'s tape.
///
/// Any engine error is fatal for a batch run: it is reported on stderr and
/// the exit code is 1.
pub fn run(program: &str, engine: &mut Engine, path: &Path, step_control: &StepControl) -> i32 {
    log::debug!("reading file '{}'", path.display());
    let code = match load_source(path) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{program}: Can't open file '{}': {e}", path.display());
            let _ = io::stderr().flush();
            return 1;
        }
    };

    let result = engine.execute_with_control(&code, step_control);
    let _ = io::stdout().flush();

    match result {
        Ok(()) => 0,
        Err(err) => {
            print_engine_error(Some(program), &code, &err);
            1
        }
    }
}

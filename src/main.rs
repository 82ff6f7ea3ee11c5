use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, atomic::AtomicBool};

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use sbfi::commands;
use sbfi::config::Settings;
use sbfi::repl::ModeFlagOverride;
use sbfi::{Engine, StepControl, TapeError, trace};

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} [--size|-c N] [--debug|-d]                # Start an interactive session
  {0} [--size|-c N] [--debug|-d] --file <PATH>  # Run the program stored in PATH

Options:
  --size,  -c <N>     Number of tape cells (default 65536, must be > 0)
  --file,  -f <PATH>  Run the program in PATH instead of starting a session
  --debug, -d         Trace every executed instruction on stdout
  --max-steps <N>     Abort a program after N instructions (fallback SBFI_MAX_STEPS)
  --bare              Force the plain line-by-line session
  --editor            Force the line-editor session (errors if stdin is not a TTY)
  --version, -V       Print version
  --help,  -h         Show this help

Session commands:
  exit               End the session
  clear              Set every cell to 0 (cursor unchanged)
  len                Print the tape length
  show [N]           Print cell N (default 0)
  print [N]          Print the first N cells (default 16), cursor cell in brackets
  Any other line is executed as a program against the same tape.

Notes:
- Input (`,`) reads a single keystroke; Ctrl+d is end-of-input and leaves the cell unchanged.
- Characters outside of ><+-.,[] are ignored.
- Settings may also be given in the [interpreter] section of sbfi.toml in your config home.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "sbfi", version, disable_help_flag = true)]
struct Cli {
    /// Number of tape cells
    #[arg(short = 'c', long = "size", value_name = "N")]
    size: Option<usize>,

    /// Run the program in PATH instead of starting a session
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    file: Option<PathBuf>,

    /// Trace every executed instruction
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Abort a program after N instructions
    #[arg(long = "max-steps", value_name = "N")]
    max_steps: Option<usize>,

    /// Force non-interactive bare mode
    #[arg(long = "bare", conflicts_with = "editor")]
    bare: bool,

    /// Force interactive mode (errors if stdin is not a TTY)
    #[arg(long = "editor", conflicts_with = "bare")]
    editor: bool,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,
}

/// Route `log` records to stderr; `RUST_LOG` takes precedence over `--debug`.
fn init_logging(debug: bool) {
    let _ = SimpleLogger::new().with_level(LevelFilter::Trace).env().init();
    set_verbosity(debug);
}

fn set_verbosity(debug: bool) {
    if env::var_os("RUST_LOG").is_some() {
        return;
    }
    log::set_max_level(if debug { LevelFilter::Debug } else { LevelFilter::Warn });
}

fn main() {
    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("sbfi"));

    let cli = Cli::parse();
    if cli.help {
        usage_and_exit(&program, 0);
    }

    init_logging(cli.debug);

    // Resolve settings: flags -> env -> settings file -> defaults
    let settings = Settings::load();
    let debug = cli.debug || settings.debug;
    if debug {
        set_verbosity(true);
    }
    let tape_size = cli.size.unwrap_or(settings.tape_size);
    let max_steps = cli.max_steps.or(settings.max_steps);

    log::debug!("debug mode enabled");
    log::debug!("generating tape with {tape_size} cells");
    let mut engine = match Engine::with_tape_size(tape_size) {
        Ok(engine) => engine,
        Err(e @ TapeError::ZeroSize) => {
            eprintln!("{program}: OptionsError: {e}");
            let _ = io::stderr().flush();
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{program}: {e}");
            let _ = io::stderr().flush();
            std::process::exit(1);
        }
    };

    if debug {
        engine.set_trace_observer(trace::print_event);
    }

    let mode_flag = if cli.bare {
        ModeFlagOverride::Bare
    } else if cli.editor {
        ModeFlagOverride::Editor
    } else {
        ModeFlagOverride::None
    };

    let code = match cli.file {
        Some(path) => {
            let step_control = StepControl::new(max_steps, Arc::new(AtomicBool::new(false)));
            commands::run::run(&program, &mut engine, &path, &step_control)
        }
        None => commands::repl::run(&program, engine, max_steps, mode_flag),
    };

    std::process::exit(code);
}

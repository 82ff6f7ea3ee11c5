//! Startup settings.
//!
//! Values are resolved in this order: command-line flags, environment
//! variables, the `[interpreter]` section of `sbfi.toml` in the user's config
//! home, then built-in defaults. Command-line flags are applied by the binary;
//! this module covers everything below them.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use cross_xdg::BaseDirs;

use crate::tape::DEFAULT_TAPE_SIZE;

/// Settings file name inside the config home.
pub const SETTINGS_FILE: &str = "sbfi.toml";

/// Environment variable holding a step limit for each program run.
pub const MAX_STEPS_ENV: &str = "SBFI_MAX_STEPS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tape_size: usize,
    pub debug: bool,
    pub max_steps: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tape_size: DEFAULT_TAPE_SIZE,
            debug: false,
            max_steps: None,
        }
    }
}

impl Settings {
    /// Defaults, overlaid with the settings file and then the environment.
    pub fn load() -> Self {
        let mut settings = settings_path()
            .and_then(|path| {
                let content = fs::read_to_string(&path).ok()?;
                log::debug!("using settings from {}", path.display());
                Some(parse_settings(&content))
            })
            .unwrap_or_default();

        if let Ok(raw) = env::var(MAX_STEPS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(n) => settings.max_steps = Some(n),
                Err(_) => log::warn!("ignoring {MAX_STEPS_ENV}={raw:?}: not a number"),
            }
        }

        settings
    }
}

/// The user's config home, if a home directory can be found.
pub fn config_home() -> Option<PathBuf> {
    let base_dirs = BaseDirs::new().ok()?;

    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    Some(PathBuf::from(base_dirs.config_home()))
}

/// `<config home>/sbfi.toml`.
pub fn settings_path() -> Option<PathBuf> {
    config_home().map(|dir| dir.join(SETTINGS_FILE))
}

/// Parse the `[interpreter]` section of a settings file.
///
/// Very small hand-rolled parser: `key = value` pairs, `#` comments, optional
/// quotes around values. Unknown keys are ignored; bad values keep the default.
pub fn parse_settings(content: &str) -> Settings {
    let mut in_section = false;
    let mut map: HashMap<String, String> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_section = line[1..line.len() - 1].trim() == "interpreter";
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            map.insert(key.trim().to_string(), value.to_string());
        }
    }

    let mut settings = Settings::default();

    if let Some(raw) = map.get("tape_size") {
        match raw.replace('_', "").parse::<usize>() {
            Ok(n) => settings.tape_size = n,
            Err(_) => log::warn!("{SETTINGS_FILE}: ignoring tape_size = {raw:?}"),
        }
    }
    if let Some(raw) = map.get("debug") {
        match raw.as_str() {
            "true" => settings.debug = true,
            "false" => settings.debug = false,
            _ => log::warn!("{SETTINGS_FILE}: ignoring debug = {raw:?}"),
        }
    }
    if let Some(raw) = map.get("max_steps") {
        match raw.replace('_', "").parse::<usize>() {
            Ok(n) => settings.max_steps = Some(n),
            Err(_) => log::warn!("{SETTINGS_FILE}: ignoring max_steps = {raw:?}"),
        }
    }

    settings
}

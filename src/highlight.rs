//! Syntax highlighting for the REPL's line editor.
//!
//! Instructions are colored by role, session command lines (`show 3`,
//! `clear`, ...) are shown as one keyword run, and everything else is dimmed.

use nu_ansi_term::{Color, Style};
use reedline::{Highlighter, StyledText};

use crate::session::SessionCommand;

/// Catppuccin Mocha accents.
mod mocha {
    use nu_ansi_term::Color;

    pub const SURFACE2: Color = Color::Rgb(108, 112, 134);
    pub const RED: Color = Color::Rgb(243, 139, 168);
    pub const GREEN: Color = Color::Rgb(166, 227, 161);
    pub const YELLOW: Color = Color::Rgb(249, 226, 175);
    pub const BLUE: Color = Color::Rgb(137, 180, 250);
    pub const MAUVE: Color = Color::Rgb(203, 166, 247);
    pub const PEACH: Color = Color::Rgb(250, 179, 135);
    pub const TEAL: Color = Color::Rgb(148, 226, 213);
    pub const SKY: Color = Color::Rgb(137, 220, 235);
}

pub struct TapeHighlighter {
    command: Style,
    comment: Style,
}

impl Default for TapeHighlighter {
    fn default() -> Self {
        Self {
            command: Style::new().fg(mocha::BLUE).italic(),
            comment: Style::new().fg(mocha::SURFACE2),
        }
    }
}

impl TapeHighlighter {
    fn style_for(&self, ch: char) -> Style {
        let bold = |c: Color| Style::new().fg(c).bold();
        // > <   => SKY/TEAL (movement)
        // + -   => GREEN/RED (data modification)
        // . ,   => YELLOW/PEACH (I/O)
        // [ ]   => MAUVE (flow control)
        match ch {
            '>' => bold(mocha::SKY),
            '<' => bold(mocha::TEAL),
            '+' => bold(mocha::GREEN),
            '-' => bold(mocha::RED),
            '.' => bold(mocha::YELLOW),
            ',' => bold(mocha::PEACH),
            '[' | ']' => bold(mocha::MAUVE),
            _ => self.comment,
        }
    }
}

impl Highlighter for TapeHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut out = StyledText::new();

        if SessionCommand::parse(line).is_some() {
            out.push((self.command, line.to_string()));
            return out;
        }

        let mut current_style: Option<Style> = None;
        let mut buffer = String::new();

        for ch in line.chars() {
            let style = self.style_for(ch);
            match current_style {
                Some(s) if s == style => buffer.push(ch),
                Some(s) => {
                    out.push((s, std::mem::take(&mut buffer)));
                    current_style = Some(style);
                    buffer.push(ch);
                }
                None => {
                    current_style = Some(style);
                    buffer.push(ch);
                }
            }
        }

        if let Some(s) = current_style {
            if !buffer.is_empty() {
                out.push((s, buffer));
            }
        }
        out
    }
}

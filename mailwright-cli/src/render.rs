//! Terminal output: bordered panels and light markdown styling.
//!
//! Agent replies are markdown; headings, bullets, `**bold**` and inline
//! code get ANSI styling when stdout is a terminal. Widths are measured on
//! visible text, so styled lines still pad correctly.

use mailwright_core::ClassifiedError;
use mailwright_core::classify::ErrorCategory;
use mailwright_core::composition::Composition;
use std::io::IsTerminal;
use unicode_width::UnicodeWidthChar;

mod ansi {
    pub const BOLD_ON: &str = "\x1b[1m";
    pub const BOLD_OFF: &str = "\x1b[22m";
    pub const DIM_ON: &str = "\x1b[2m";
    pub const UNDERLINE_ON: &str = "\x1b[4m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const RESET: &str = "\x1b[0m";
}

const MAX_WIDTH: usize = 100;
const MIN_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

impl Tone {
    fn color(self) -> &'static str {
        match self {
            Tone::Info => ansi::CYAN,
            Tone::Success => ansi::GREEN,
            Tone::Warning => ansi::YELLOW,
            Tone::Error => ansi::RED,
        }
    }
}

pub struct Renderer {
    color: bool,
    width: usize,
}

impl Renderer {
    pub fn new(color: bool, width: usize) -> Self {
        Self {
            color,
            width: width.clamp(MIN_WIDTH, MAX_WIDTH),
        }
    }

    /// Color when stdout is a terminal; width from the terminal size.
    pub fn detect() -> Self {
        let color = std::io::stdout().is_terminal();
        let width = crossterm::terminal::size()
            .map(|(w, _)| w as usize)
            .unwrap_or(80);
        Self::new(color, width)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{}", ansi::RESET)
        } else {
            text.to_string()
        }
    }

    /// Draw `body` inside a rounded box titled `title`.
    pub fn panel(&self, title: &str, body: &str, tone: Tone) -> String {
        let inner = self.width - 4;
        let border = |s: &str| self.paint(tone.color(), s);

        let title_text = format!(" {title} ");
        let fill = (self.width - 3).saturating_sub(visible_width(&title_text));
        let mut out = format!(
            "{}{}{}\n",
            border("╭─"),
            self.paint(ansi::BOLD_ON, &title_text),
            border(&format!("{}╮", "─".repeat(fill)))
        );

        for line in self.body_lines(body, inner) {
            let pad = inner.saturating_sub(visible_width(&line));
            out.push_str(&format!(
                "{} {line}{} {}\n",
                border("│"),
                " ".repeat(pad),
                border("│")
            ));
        }
        out.push_str(&border(&format!("╰{}╯", "─".repeat(self.width - 2))));
        out
    }

    fn body_lines(&self, body: &str, inner: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut in_code = false;
        // Break on spaces only so commands, addresses and URLs stay whole.
        let options = textwrap::Options::new(inner)
            .word_separator(textwrap::WordSeparator::AsciiSpace)
            .word_splitter(textwrap::WordSplitter::NoHyphenation);
        for raw in body.trim_end().lines() {
            if raw.trim_start().starts_with("```") {
                in_code = !in_code;
                continue;
            }
            if raw.trim().is_empty() {
                lines.push(String::new());
                continue;
            }
            for piece in textwrap::wrap(raw, &options) {
                lines.push(if in_code {
                    self.paint(ansi::DIM_ON, &piece)
                } else {
                    self.style_line(&piece)
                });
            }
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
    }

    /// Markdown styling for one wrapped line.
    pub fn style_line(&self, line: &str) -> String {
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];
        if let Some(heading) = trimmed
            .strip_prefix("### ")
            .or_else(|| trimmed.strip_prefix("## "))
            .or_else(|| trimmed.strip_prefix("# "))
        {
            if self.color {
                return format!("{indent}{}{}{heading}{}", ansi::BOLD_ON, ansi::UNDERLINE_ON, ansi::RESET);
            }
            return format!("{indent}{heading}");
        }
        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            return format!("{indent}• {}", self.inline(item));
        }
        self.inline(line)
    }

    /// `**bold**` and `` `code` `` spans. Unclosed markers stay literal.
    fn inline(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 16);
        let mut rest = text;
        loop {
            let bold = rest.find("**");
            let code = rest.find('`');
            let (at, marker) = match (bold, code) {
                (Some(b), Some(c)) if c < b => (c, "`"),
                (Some(b), _) => (b, "**"),
                (None, Some(c)) => (c, "`"),
                (None, None) => break,
            };
            let after = &rest[at + marker.len()..];
            let Some(end) = after.find(marker) else {
                break;
            };
            out.push_str(&rest[..at]);
            let span = &after[..end];
            match (marker, self.color) {
                ("**", true) => out.push_str(&format!("{}{span}{}", ansi::BOLD_ON, ansi::BOLD_OFF)),
                ("`", true) => out.push_str(&format!("{}{span}{}", ansi::CYAN, ansi::RESET)),
                _ => out.push_str(span),
            }
            rest = &after[end + marker.len()..];
        }
        out.push_str(rest);
        out
    }

    pub fn error_panel(&self, error: &ClassifiedError) -> String {
        let body = format!("{}\n\n{}", error.message, error.remediation());
        let tone = match error.category {
            ErrorCategory::Generic => Tone::Error,
            ErrorCategory::Authentication | ErrorCategory::Network => Tone::Warning,
        };
        self.panel(error.category.title(), &body, tone)
    }

    pub fn welcome(&self, composition: &Composition) -> String {
        let status = match composition.active {
            Some(kind) => format!("Connected: {kind}"),
            None => "Not connected".to_string(),
        };
        let mut body = format!(
            "{status}\n\nType / for commands, @ for contacts, or ask anything.\n/help lists commands, /quit exits."
        );
        if let Some(warning) = &composition.warning {
            body.push_str(&format!("\n\n{warning}"));
        }
        let tone = if composition.active.is_some() {
            Tone::Info
        } else {
            Tone::Warning
        };
        self.panel("mailwright", &body, tone)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint(ansi::DIM_ON, text)
    }
}

/// Display width ignoring ANSI CSI sequences.
pub fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip to the final byte of the CSI sequence.
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        width += c.width().unwrap_or(0);
    }
    width
}

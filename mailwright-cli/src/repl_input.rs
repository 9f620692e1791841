//! Interactive REPL input with history and trigger-based autocomplete.
//!
//! A crossterm raw-mode line editor:
//! - `/` at the start of the line ranks slash commands in a dropdown
//! - `@` at the start of a word ranks contacts from the contacts file
//! - Up/Down navigate the dropdown or history (draft preserved)
//! - Tab/Enter/Right accept the selected candidate, Esc dismisses
//! - Ctrl-C clears a non-empty line or exits on an empty one, Ctrl-D exits
//! - Persistent history file at `.mailwright/repl_history`
//!
//! When stdin is not a terminal, [`LineReader::Plain`] reads plain lines
//! on a background thread so that [`Interrupts`] can cut a read short.

use mailwright_core::{CandidateSource, ContactProvider, RankedCandidate, StaticProvider};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

const MAX_VISIBLE_COMPLETIONS: usize = 8;
const PROMPT: &str = "> ";

pub const CONTACT_TRIGGER: char = '@';

/// Result of reading one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C. `had_text` is true when the line was not empty.
    Interrupted { had_text: bool },
    Eof,
}

/// Persistent command history.
pub struct InputHistory {
    entries: Vec<String>,
    index: Option<usize>,
    draft: Option<String>,
    file_path: PathBuf,
    max_entries: usize,
}

impl InputHistory {
    pub fn new(workspace: &Path) -> Self {
        let file_path = workspace.join(".mailwright").join("repl_history");
        let entries = Self::load_from_file(&file_path);
        Self {
            entries,
            index: None,
            draft: None,
            file_path,
            max_entries: 500,
        }
    }

    fn load_from_file(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect()
    }

    fn save_to_file(&self) {
        if let Some(parent) = self.file_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let content: String = self.entries.iter().map(|e| format!("{e}\n")).collect();
        if let Err(e) = std::fs::write(&self.file_path, content) {
            tracing::debug!(error = %e, "could not save REPL history");
        }
    }

    /// Add an entry, skipping blanks and consecutive duplicates.
    pub fn push(&mut self, entry: &str) {
        let trimmed = entry.trim().to_string();
        if trimmed.is_empty() {
            return;
        }
        if self.entries.last().map(|s| s.as_str()) == Some(&trimmed) {
            self.reset_navigation();
            return;
        }
        self.entries.push(trimmed);
        while self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
        self.save_to_file();
        self.reset_navigation();
    }

    fn navigate_up(&mut self, current_buffer: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        match self.index {
            None => {
                self.draft = Some(current_buffer.to_string());
                self.index = Some(self.entries.len() - 1);
            }
            Some(0) => {}
            Some(ref mut idx) => *idx -= 1,
        }
        self.index.map(|i| self.entries[i].as_str())
    }

    fn navigate_down(&mut self) -> Option<String> {
        let idx = self.index?;
        if idx + 1 >= self.entries.len() {
            self.index = None;
            Some(self.draft.take().unwrap_or_default())
        } else {
            self.index = Some(idx + 1);
            Some(self.entries[idx + 1].clone())
        }
    }

    fn reset_navigation(&mut self) {
        self.index = None;
        self.draft = None;
    }
}

/// The trigger token under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpan {
    pub trigger: char,
    /// Byte offset where the token starts.
    pub start: usize,
    pub query: String,
}

/// Find an active trigger at the end of `buffer`. `/` only counts as the
/// first character of a line without spaces; `@` starts any word.
pub fn active_trigger(buffer: &str) -> Option<TriggerSpan> {
    if buffer.is_empty() || buffer.ends_with(char::is_whitespace) {
        return None;
    }
    if buffer.starts_with('/') {
        if buffer.contains(char::is_whitespace) {
            return None;
        }
        return Some(TriggerSpan {
            trigger: '/',
            start: 0,
            query: buffer.to_string(),
        });
    }
    let start = buffer
        .rfind(char::is_whitespace)
        .map(|i| i + buffer[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let word = &buffer[start..];
    word.strip_prefix(CONTACT_TRIGGER).map(|query| TriggerSpan {
        trigger: CONTACT_TRIGGER,
        start,
        query: query.to_string(),
    })
}

/// Replace the trigger token with `value` followed by a space.
pub fn apply_completion(buffer: &str, span: &TriggerSpan, value: &str) -> String {
    format!("{}{value} ", &buffer[..span.start])
}

/// Wrap the chars at `positions` in `on`/`off`.
pub fn highlight(display: &str, positions: &[usize], on: &str, off: &str) -> String {
    let mut out = String::with_capacity(display.len() + positions.len() * 8);
    for (i, c) in display.chars().enumerate() {
        if positions.binary_search(&i).is_ok() {
            out.push_str(on);
            out.push(c);
            out.push_str(off);
        } else {
            out.push(c);
        }
    }
    out
}

/// The two candidate sources keyed by trigger character.
pub struct Triggers {
    pub commands: StaticProvider,
    pub contacts: ContactProvider,
}

impl Triggers {
    pub fn search(&mut self, span: &TriggerSpan) -> Vec<RankedCandidate> {
        match span.trigger {
            '/' => self.commands.search(&span.query),
            CONTACT_TRIGGER => self.contacts.search(&span.query),
            _ => Vec::new(),
        }
    }
}

struct CompletionState {
    span: TriggerSpan,
    entries: Vec<RankedCandidate>,
    selected: usize,
    scroll: usize,
}

impl CompletionState {
    fn selected_value(&self) -> &str {
        &self.entries[self.selected].value
    }

    fn visible_range(&self) -> (usize, usize) {
        let total = self.entries.len();
        let max_vis = MAX_VISIBLE_COMPLETIONS.min(total);
        let start = if self.selected < self.scroll {
            self.selected
        } else if self.selected >= self.scroll + max_vis {
            self.selected + 1 - max_vis
        } else {
            self.scroll
        };
        (start, (start + max_vis).min(total))
    }
}

/// Raw-mode line editor.
pub struct ReplInput {
    history: InputHistory,
    /// Number of dropdown lines currently drawn below the input.
    rendered_lines: usize,
}

impl ReplInput {
    pub fn new(workspace: &Path) -> Self {
        Self {
            history: InputHistory::new(workspace),
            rendered_lines: 0,
        }
    }

    /// Read one line. Raw mode is enabled only while reading.
    pub fn read_line(&mut self, triggers: &mut Triggers) -> io::Result<ReadOutcome> {
        print!("\x1b[1;34m{PROMPT}\x1b[0m");
        io::stdout().flush()?;

        terminal::enable_raw_mode()?;
        let raw_mode = OnDrop(|| {
            let _ = terminal::disable_raw_mode();
        });
        let result = self.read_line_raw(triggers);
        self.clear_completion_lines()?;
        drop(raw_mode);

        print!("\r\n");
        io::stdout().flush()?;
        result
    }

    fn read_line_raw(&mut self, triggers: &mut Triggers) -> io::Result<ReadOutcome> {
        let mut buffer = String::new();
        let mut cursor_pos: usize = 0;
        let mut completion: Option<CompletionState> = None;

        loop {
            if !event::poll(std::time::Duration::from_millis(100))? {
                continue;
            }
            let Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) = event::read()?
            else {
                continue;
            };

            match (code, modifiers) {
                (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                    return Ok(ReadOutcome::Interrupted {
                        had_text: !buffer.is_empty(),
                    });
                }
                (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
                    if buffer.is_empty() {
                        return Ok(ReadOutcome::Eof);
                    }
                }
                (KeyCode::Tab | KeyCode::Right, _) if completion.is_some() => {
                    if let Some(comp) = completion.take() {
                        buffer = apply_completion(&buffer, &comp.span, comp.selected_value());
                        cursor_pos = buffer.len();
                    }
                    self.render(&buffer, cursor_pos, &completion)?;
                }
                (KeyCode::Enter, _) => {
                    if let Some(comp) = completion.take() {
                        buffer = apply_completion(&buffer, &comp.span, comp.selected_value());
                        cursor_pos = buffer.len();
                        self.render(&buffer, cursor_pos, &completion)?;
                    } else {
                        let line = buffer.trim().to_string();
                        self.history.push(&line);
                        return Ok(ReadOutcome::Line(line));
                    }
                }
                (KeyCode::Esc, _) => {
                    completion = None;
                    self.render(&buffer, cursor_pos, &completion)?;
                }
                (KeyCode::Up, _) => {
                    if let Some(comp) = completion.as_mut() {
                        comp.selected = comp.selected.saturating_sub(1);
                        comp.scroll = comp.visible_range().0;
                    } else if let Some(entry) = self.history.navigate_up(&buffer) {
                        buffer = entry.to_string();
                        cursor_pos = buffer.len();
                    }
                    self.render(&buffer, cursor_pos, &completion)?;
                }
                (KeyCode::Down, _) => {
                    if let Some(comp) = completion.as_mut() {
                        if comp.selected + 1 < comp.entries.len() {
                            comp.selected += 1;
                        }
                        comp.scroll = comp.visible_range().0;
                    } else if let Some(entry) = self.history.navigate_down() {
                        buffer = entry;
                        cursor_pos = buffer.len();
                    }
                    self.render(&buffer, cursor_pos, &completion)?;
                }
                (KeyCode::Left, _) => {
                    completion = None;
                    cursor_pos = prev_boundary(&buffer, cursor_pos);
                    self.render(&buffer, cursor_pos, &completion)?;
                }
                (KeyCode::Right, _) => {
                    cursor_pos = next_boundary(&buffer, cursor_pos);
                    self.render(&buffer, cursor_pos, &completion)?;
                }
                (KeyCode::Home, _) => {
                    completion = None;
                    cursor_pos = 0;
                    self.render(&buffer, cursor_pos, &completion)?;
                }
                (KeyCode::End, _) => {
                    cursor_pos = buffer.len();
                    self.render(&buffer, cursor_pos, &completion)?;
                }
                (KeyCode::Backspace, _) => {
                    if cursor_pos > 0 {
                        let prev = prev_boundary(&buffer, cursor_pos);
                        buffer.replace_range(prev..cursor_pos, "");
                        cursor_pos = prev;
                    }
                    completion = update_completion(&buffer, cursor_pos, triggers);
                    self.render(&buffer, cursor_pos, &completion)?;
                }
                (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                    buffer.insert(cursor_pos, c);
                    cursor_pos += c.len_utf8();
                    self.history.reset_navigation();
                    completion = update_completion(&buffer, cursor_pos, triggers);
                    self.render(&buffer, cursor_pos, &completion)?;
                }
                _ => {}
            }
        }
    }

    fn render(
        &mut self,
        buffer: &str,
        cursor_pos: usize,
        completion: &Option<CompletionState>,
    ) -> io::Result<()> {
        self.clear_completion_lines()?;
        self.redraw_input(buffer, cursor_pos)?;
        if let Some(comp) = completion {
            self.render_dropdown(comp)?;
            if self.rendered_lines > 0 {
                let mut stdout = io::stdout();
                let col = PROMPT.len() + buffer[..cursor_pos].width();
                write!(stdout, "\x1b[{}A\r", self.rendered_lines)?;
                if col > 0 {
                    write!(stdout, "\x1b[{col}C")?;
                }
                stdout.flush()?;
            }
        }
        Ok(())
    }

    fn render_dropdown(&mut self, comp: &CompletionState) -> io::Result<()> {
        let mut stdout = io::stdout();
        let (start, end) = comp.visible_range();
        let visible_count = end - start;
        let term_width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80);

        for (i, entry) in comp.entries.iter().enumerate().take(end).skip(start) {
            let label = if i == comp.selected {
                format!("\x1b[7m {} {} \x1b[27m", entry.icon, entry.display)
            } else {
                format!(
                    " {} {} ",
                    entry.icon,
                    highlight(&entry.display, &entry.positions, "\x1b[1;33m", "\x1b[0m")
                )
            };
            let mut detail: Vec<&str> = Vec::new();
            if !entry.description.is_empty() {
                detail.push(&entry.description);
            }
            if !entry.subtitle.is_empty() {
                detail.push(&entry.subtitle);
            }
            let detail = detail.join(" · ");
            let used = entry.display.width() + entry.icon.width() + 6;
            let detail: String = truncate_to_width(&detail, term_width.saturating_sub(used));
            write!(stdout, "\r\n\x1b[2K {label} \x1b[90m{detail}\x1b[0m")?;
        }

        let total = comp.entries.len();
        if total > visible_count {
            write!(stdout, "\r\n\x1b[2K  \x1b[90m({visible_count}/{total})\x1b[0m")?;
            self.rendered_lines = visible_count + 1;
        } else {
            self.rendered_lines = visible_count;
        }
        stdout.flush()
    }

    fn clear_completion_lines(&mut self) -> io::Result<()> {
        if self.rendered_lines > 0 {
            let mut stdout = io::stdout();
            for _ in 0..self.rendered_lines {
                write!(stdout, "\r\n\x1b[2K")?;
            }
            write!(stdout, "\x1b[{}A", self.rendered_lines)?;
            stdout.flush()?;
            self.rendered_lines = 0;
        }
        Ok(())
    }

    fn redraw_input(&self, buffer: &str, cursor_pos: usize) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "\r\x1b[2K\x1b[1;34m{PROMPT}\x1b[0m{buffer}")?;
        let after = buffer[cursor_pos..].width();
        if after > 0 {
            write!(stdout, "{}", cursor::MoveLeft(after as u16))?;
        }
        stdout.flush()
    }
}

fn update_completion(buffer: &str, cursor_pos: usize, triggers: &mut Triggers) -> Option<CompletionState> {
    if cursor_pos != buffer.len() {
        return None;
    }
    let span = active_trigger(buffer)?;
    let entries = triggers.search(&span);
    if entries.is_empty() || (entries.len() == 1 && entries[0].value == buffer[span.start..]) {
        return None;
    }
    Some(CompletionState {
        span,
        entries,
        selected: 0,
        scroll: 0,
    })
}

fn prev_boundary(s: &str, pos: usize) -> usize {
    s[..pos].char_indices().next_back().map_or(0, |(i, _)| i)
}

fn next_boundary(s: &str, pos: usize) -> usize {
    s[pos..].chars().next().map_or(pos, |c| pos + c.len_utf8())
}

fn truncate_to_width(text: &str, max: usize) -> String {
    let mut out = String::new();
    let mut width = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if width + w > max {
            break;
        }
        width += w;
        out.push(c);
    }
    out
}

/// Terminal editor, or plain line reads when stdin is piped.
/// Runs its closure when dropped, including on early `?` returns.
struct OnDrop<F: FnMut()>(F);

impl<F: FnMut()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        (self.0)()
    }
}

/// Ctrl-C deliveries for the whole session. Installing the handler replaces
/// the default terminate action, so one instance is created before the first
/// prompt and shared by input and dispatch.
pub struct Interrupts {
    rx: mpsc::UnboundedReceiver<()>,
}

impl Interrupts {
    pub fn install() -> io::Result<Self> {
        #[cfg(unix)]
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
        #[cfg(windows)]
        let mut signal = tokio::signal::windows::ctrl_c()?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while signal.recv().await.is_some() {
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        Ok(Self { rx })
    }

    /// Wait for the next Ctrl-C. Never resolves once the listener is gone.
    pub async fn recv(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }

    #[cfg(test)]
    fn channel() -> (mpsc::UnboundedSender<()>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Drop presses that arrived while nothing was waiting.
    pub fn clear(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

/// Line source for the REPL.
pub enum LineReader {
    Terminal(ReplInput),
    /// Lines from a reader thread. `None` from the channel means end of input.
    Plain(mpsc::Receiver<io::Result<String>>),
}

impl LineReader {
    pub fn new(workspace: &Path) -> Self {
        if io::stdin().is_terminal() {
            LineReader::Terminal(ReplInput::new(workspace))
        } else {
            LineReader::plain(io::BufReader::new(io::stdin()))
        }
    }

    /// Read lines from `source` on a dedicated thread. A pending read that
    /// gets interrupted stays queued for the next call instead of being lost.
    pub fn plain<R: BufRead + Send + 'static>(mut source: R) -> Self {
        let (tx, rx) = mpsc::channel(1);
        std::thread::spawn(move || {
            loop {
                let mut line = String::new();
                match source.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.blocking_send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.blocking_send(Err(e));
                        break;
                    }
                }
            }
        });
        LineReader::Plain(rx)
    }

    pub async fn read_line(
        &mut self,
        triggers: &mut Triggers,
        interrupts: &mut Interrupts,
    ) -> io::Result<ReadOutcome> {
        match self {
            // Raw mode turns Ctrl-C into a key event, handled by the editor.
            LineReader::Terminal(input) => input.read_line(triggers),
            LineReader::Plain(lines) => {
                interrupts.clear();
                tokio::select! {
                    next = lines.recv() => match next {
                        Some(line) => Ok(ReadOutcome::Line(line?.trim().to_string())),
                        None => Ok(ReadOutcome::Eof),
                    },
                    _ = interrupts.recv() => Ok(ReadOutcome::Interrupted { had_text: false }),
                }
            }
        }
    }
}

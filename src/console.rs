//! Text-mode display and input surfaces
//!
//! `Terminal` is where chat lines end up; `LineSource` is where operator or
//! user input comes from. Both binaries use the stdout/rustyline versions;
//! `MemoryTerminal` records lines instead of printing them.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use chrono::Local;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Output surface: appends one line per call
pub trait Terminal: Send + Sync {
    fn render_line(&self, text: &str);
}

/// Input surface: blocks until one line is available, `None` when input ends
pub trait LineSource {
    fn read_line(&mut self) -> Option<String>;
}

/// Prints lines to stdout
#[derive(Debug, Default)]
pub struct StdoutTerminal;

impl StdoutTerminal {
    pub fn new() -> Self {
        Self
    }
}

impl Terminal for StdoutTerminal {
    fn render_line(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }
}

/// Keeps every rendered line in memory
#[derive(Debug, Default)]
pub struct MemoryTerminal {
    lines: Mutex<Vec<String>>,
}

impl MemoryTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all lines rendered so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of rendered lines containing `needle`
    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl Terminal for MemoryTerminal {
    fn render_line(&self, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
    }
}

/// Interactive line editor on the controlling terminal
pub struct LineInput {
    editor: DefaultEditor,
}

impl LineInput {
    pub fn new() -> Result<Self, ReadlineError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for LineInput {
    fn read_line(&mut self) -> Option<String> {
        match self.editor.readline("") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str()).ok();
                }
                Some(line)
            }
            Err(ReadlineError::Interrupted) => {
                debug!("Input interrupted");
                None
            }
            Err(ReadlineError::Eof) => {
                debug!("Input EOF");
                None
            }
            Err(err) => {
                error!("Readline error: {}", err);
                None
            }
        }
    }
}

/// Pre-recorded input, handed out one line at a time
impl LineSource for VecDeque<String> {
    fn read_line(&mut self) -> Option<String> {
        self.pop_front()
    }
}

/// Read stdin on a dedicated OS thread and forward each line
///
/// The returned channel closes when input ends (EOF, Ctrl+C) or the editor
/// cannot be created.
pub fn spawn_line_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let input = match LineInput::new() {
            Ok(input) => input,
            Err(e) => {
                error!("Failed to initialize readline: {}", e);
                return;
            }
        };
        forward_lines(input, &tx);
    });
    rx
}

/// Pump lines from `source` into `tx` until either side ends
pub fn forward_lines<S: LineSource>(mut source: S, tx: &mpsc::UnboundedSender<String>) {
    while let Some(line) = source.read_line() {
        if tx.send(line).is_err() {
            break;
        }
    }
}

/// Prefix `text` with the local time, `D/M/YYYY H:M:S `
pub fn timestamped(text: &str) -> String {
    format!("{} {}", Local::now().format("%-d/%-m/%Y %-H:%-M:%-S"), text)
}

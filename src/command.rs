//! Operator console commands
//!
//! Parsed from one input line on the server's console thread and executed
//! against the shared registry. Only an explicit exit command stops the
//! server; losing the console input just ends the console thread.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{error, info};

use crate::console::{LineSource, Terminal};
use crate::registry::Registry;

/// Every recognized command word, in the order `/commands` prints them
pub const COMMAND_WORDS: [&str; 4] = ["/commands", "/exit", "/list", "/quit"];

/// Operator commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Terminate the server (`/exit`, `/quit`)
    Exit,
    /// Print connected nicknames (`/list`)
    List,
    /// Print the recognized commands (`/commands`)
    Commands,
}

impl Command {
    /// Parse one input line; anything unrecognized is `None`
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "/exit" | "/quit" => Some(Command::Exit),
            "/list" => Some(Command::List),
            "/commands" => Some(Command::Commands),
            _ => None,
        }
    }
}

/// Run one command; `Break` means the operator asked to shut down
pub fn execute<T: Terminal + ?Sized>(
    command: Command,
    registry: &Registry,
    terminal: &T,
) -> ControlFlow<()> {
    match command {
        Command::Exit => {
            info!("Exit requested from console");
            return ControlFlow::Break(());
        }
        Command::List => {
            let nicknames = registry.list();
            if nicknames.is_empty() {
                terminal.render_line("No users connected");
            } else {
                terminal.render_line("Connected users:");
                for nickname in nicknames {
                    terminal.render_line(&format!("\t{}", nickname));
                }
            }
        }
        Command::Commands => {
            terminal.render_line("Available commands:");
            for word in COMMAND_WORDS {
                terminal.render_line(&format!("\t{}", word));
            }
        }
    }
    ControlFlow::Continue(())
}

/// Read and execute commands until `Exit` or end of input
///
/// `Break` means `Exit` was read; `Continue` means the input ran out.
pub fn run_console<S, T>(mut input: S, registry: &Registry, terminal: &T) -> ControlFlow<()>
where
    S: LineSource,
    T: Terminal + ?Sized,
{
    while let Some(line) = input.read_line() {
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        if execute(command, registry, terminal).is_break() {
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

/// Run the console on its own OS thread
///
/// The returned receiver gets a value only when the operator asks to exit.
/// If the input cannot be opened or reaches its end, the thread finishes and
/// the sender is dropped without sending.
pub fn spawn_console<F, S, E, T>(
    open: F,
    registry: Arc<Registry>,
    terminal: Arc<T>,
) -> oneshot::Receiver<()>
where
    F: FnOnce() -> Result<S, E> + Send + 'static,
    S: LineSource,
    E: fmt::Display,
    T: Terminal + ?Sized + 'static,
{
    let (exit_tx, exit_rx) = oneshot::channel();
    std::thread::spawn(move || {
        let input = match open() {
            Ok(input) => input,
            Err(e) => {
                error!("Failed to initialize console: {}", e);
                return;
            }
        };
        if run_console(input, &registry, &*terminal).is_break() {
            let _ = exit_tx.send(());
        } else {
            info!("Console input closed, server keeps running");
        }
    });
    exit_rx
}

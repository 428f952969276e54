//! Chat Server - Entry Point
//!
//! Binds the listener, starts the event loop and runs the operator console
//! on its own thread.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roomcast-server
//! cargo run --bin roomcast-server -- --host 127.0.0.1 --port 9000
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use roomcast::command::spawn_console;
use roomcast::config::{DEFAULT_BIND_HOST, DEFAULT_PORT};
use roomcast::console::LineInput;
use roomcast::logger::setup_logger;
use roomcast::{ChatServer, ServerConfig, StdoutTerminal, Terminal};

#[derive(Parser, Debug)]
#[command(name = "roomcast-server")]
#[command(about = "Multi-client TCP chat server with broadcast", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = DEFAULT_BIND_HOST)]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Use RUST_LOG env var to control log level
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = ServerConfig::new(&args.host, args.port);

    let server = match ChatServer::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server on {}: {}", config.bind_addr, e);
            return ExitCode::FAILURE;
        }
    };

    let terminal = Arc::new(StdoutTerminal::new());
    terminal.render_line("Server started");

    // Operator console blocks on stdin, so it gets an OS thread.
    // Without console input the server keeps running until Ctrl+C.
    let exit = spawn_console(LineInput::new, server.registry(), Arc::clone(&terminal));

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Event loop stopped: {}", e);
                return ExitCode::FAILURE;
            }
        }
        Ok(()) = exit => {
            info!("Shutting down on operator request");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    ExitCode::SUCCESS
}

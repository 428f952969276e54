//! Chat Client - Entry Point
//!
//! Connects to the server, registers the nickname and exchanges messages.
//! Reconnects every 2 seconds, forever, whenever the server goes away.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roomcast-client -- 127.0.0.1 alice
//! cargo run --bin roomcast-client -- chat.local:9000 bob
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use roomcast::console::spawn_line_reader;
use roomcast::logger::setup_logger;
use roomcast::{
    run_receive_duty, run_send_duty, ClientConfig, ClientSession, StdoutTerminal, Terminal,
};

#[derive(Parser, Debug)]
#[command(name = "roomcast-client")]
#[command(about = "Chat client with automatic reconnection", long_about = None)]
struct Args {
    /// Server address: host, IP, or host:port (port defaults to 9090)
    address: String,

    /// Nickname shown to other users (at most 14 bytes are sent)
    nickname: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    // Missing arguments print usage and exit non-zero before any socket exists
    let args = Args::parse();
    let config = ClientConfig::new(&args.address, &args.nickname);

    let terminal = Arc::new(StdoutTerminal::new());
    let session = Arc::new(ClientSession::new(&config));

    let reader = session.connect().await;
    if reader.is_some() {
        terminal.render_line("Connected to server");
    }

    let receive = {
        let session = Arc::clone(&session);
        let terminal = Arc::clone(&terminal);
        tokio::spawn(async move { run_receive_duty(&*session, &*terminal, reader).await })
    };

    let lines = spawn_line_reader();
    run_send_duty(&*session, &*terminal, lines).await;

    receive.abort();
    terminal.render_line("Client finished. Bye!");
    ExitCode::SUCCESS
}

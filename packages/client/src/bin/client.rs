//! LiveReload protocol client.
//!
//! Connects to a LiveReload server, completes the handshake and prints every
//! reload and alert it receives. Reconnects when the connection drops
//! (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin lrserver-client
//! cargo run --bin lrserver-client -- -u ws://127.0.0.1:35729/livereload --page-url http://localhost:8000/
//! ```

use clap::Parser;

use lrserver_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "lrserver-client")]
#[command(about = "LiveReload protocol client that prints received commands", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:35729/livereload")]
    url: String,

    /// Page URL announced to the server with an `info` command
    #[arg(long)]
    page_url: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Run the client
    if let Err(e) = lrserver_client::run_client(args.url, args.page_url).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

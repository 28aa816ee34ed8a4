//! LiveReload server with an operator console.
//!
//! Serves the LiveReload protocol on `/livereload` and reads `reload <path>`
//! / `alert <message>` commands from stdin.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin lrserver
//! cargo run --bin lrserver -- --host 0.0.0.0 --port 35729 --script livereload.js
//! ```

use std::{fs::OpenOptions, path::PathBuf, sync::Arc};

use clap::Parser;

use lrserver::{
    DEFAULT_NAME, DEFAULT_PORT, Server,
    infrastructure::{LogSink, WriterSink},
    ui::{
        console::{ConsoleExit, run_console},
        signal::shutdown_signal,
    },
};
use lrserver_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "lrserver")]
#[command(about = "LiveReload protocol server", long_about = None)]
struct Args {
    /// Host address to bind the server to (empty binds every interface)
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Server name announced in the handshake
    #[arg(short = 'n', long, default_value = DEFAULT_NAME)]
    name: String,

    /// Ask browsers to reload the whole page for stylesheet changes
    #[arg(long)]
    no_live_css: bool,

    /// Client script served at /livereload.js
    #[arg(long)]
    script: Option<PathBuf>,

    /// Append status and error messages to this file instead of the tracing output
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Do not read commands from stdin
    #[arg(short = 'q', long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let server = Server::new(args.name, args.host, args.port);
    server.set_live_css(!args.no_live_css);

    if let Some(path) = args.script {
        match tokio::fs::read_to_string(&path).await {
            Ok(script) => server.set_client_script(Some(script)),
            Err(e) => {
                tracing::error!("Failed to read client script {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    if let Some(path) = args.log_file {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                let sink: Arc<dyn LogSink> = Arc::new(WriterSink::new(&server.name(), file));
                server.set_status_log(Some(sink.clone()));
                server.set_error_log(Some(sink));
            }
            Err(e) => {
                tracing::error!("Failed to open log file {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    let listener = match server.listen().await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Connect to: ws://{}/livereload", server.addr());

    let console_server = server.clone();
    let quiet = args.quiet;
    let shutdown = async move {
        if quiet {
            shutdown_signal().await;
            return;
        }
        tokio::select! {
            _ = shutdown_signal() => {}
            exit = run_console(console_server) => match exit {
                ConsoleExit::Quit => tracing::info!("Quit requested, shutting down"),
                // Without a console the server keeps running until a signal.
                ConsoleExit::Eof => shutdown_signal().await,
            },
        }
    };

    if let Err(e) = server.serve(listener, shutdown).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

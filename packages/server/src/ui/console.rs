//! Operator console: trigger reloads and alerts from stdin.

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use super::{error::ConsoleError, server::Server};

const PROMPT: &str = "lrserver> ";

const HELP: &str = "\
commands:
  reload <path>    ask every browser to reload <path>
  alert <message>  show <message> in every browser
  status           show the number of connections
  help             show this help
  quit             stop the server";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Reload(String),
    Alert(String),
    Status,
    Help,
    Quit,
}

/// Why the console stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator asked to stop the server.
    Quit,
    /// Stdin was closed or could not be read.
    Eof,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    };

    let command = match keyword {
        "reload" | "r" if rest.is_empty() => return Err(ConsoleError::MissingArgument("reload")),
        "reload" | "r" => ConsoleCommand::Reload(rest.to_string()),
        "alert" | "a" if rest.is_empty() => return Err(ConsoleError::MissingArgument("alert")),
        "alert" | "a" => ConsoleCommand::Alert(rest.to_string()),
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(ConsoleError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

/// Read commands from stdin and apply them to `server` until quit or EOF.
pub async fn run_console(server: Server) -> ConsoleExit {
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.trim()).ok();
                    }
                    if input_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    input_tx.send("quit".to_string()).ok();
                    break;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    while let Some(line) = input_rx.recv().await {
        match parse_line(&line) {
            Ok(Some(ConsoleCommand::Quit)) => return ConsoleExit::Quit,
            Ok(Some(command)) => execute(&server, command).await,
            Ok(None) => {}
            Err(e) => println!("{}", e),
        }
    }

    ConsoleExit::Eof
}

async fn execute(server: &Server, command: ConsoleCommand) {
    match command {
        ConsoleCommand::Reload(path) => server.reload(&path).await,
        ConsoleCommand::Alert(message) => server.alert(&message).await,
        ConsoleCommand::Status => {
            println!(
                "{} on {}: {} connection(s), liveCSS {}",
                server.name(),
                server.addr(),
                server.connection_count().await,
                if server.live_css() { "on" } else { "off" }
            );
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => {}
    }
}

//! Commands exchanged with LiveReload clients.

/// The only protocol version this server speaks.
pub const PROTOCOL_OFFICIAL_7: &str = "http://livereload.com/protocols/official-7";

/// Protocols announced in the server `hello`.
pub const SUPPORTED_PROTOCOLS: &[&str] = &[PROTOCOL_OFFICIAL_7];

/// A command sent by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Handshake request listing the protocol URIs the client understands.
    Hello { protocols: Vec<String> },
    /// Informational message about the page the client is attached to.
    Info { url: Option<String> },
    /// The client navigated to another URL.
    Url { url: String },
}

impl Command {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Hello { .. } => "hello",
            Command::Info { .. } => "info",
            Command::Url { .. } => "url",
        }
    }
}

/// A command pushed from the server to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushCommand {
    /// Reload the page (or only the stylesheet) that depends on `path`.
    Reload { path: String },
    /// Show `message` to the end user.
    Alert { message: String },
}

impl PushCommand {
    pub fn reload(path: impl Into<String>) -> Self {
        PushCommand::Reload { path: path.into() }
    }

    pub fn alert(message: impl Into<String>) -> Self {
        PushCommand::Alert {
            message: message.into(),
        }
    }
}

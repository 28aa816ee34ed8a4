//! WebSocket message DTOs.
//!
//! Field names follow the LiveReload protocol (`serverName`, `liveCSS`), not
//! Rust conventions.

use serde::{Deserialize, Serialize};

/// Value of the `command` field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Hello,
    Info,
    Url,
    Reload,
    Alert,
}

/// Just enough of a frame to dispatch on its `command`.
#[derive(Debug, Deserialize)]
pub struct CommandEnvelope {
    pub command: String,
}

/// `hello`, in both directions. Only the server fills in `serverName`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelloMessage {
    pub command: CommandType,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(
        rename = "serverName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub server_name: Option<String>,
}

/// Client `info`. Plugin details are accepted but not interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfoMessage {
    pub command: CommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<serde_json::Value>,
}

/// Client `url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrlMessage {
    pub command: CommandType,
    pub url: String,
}

/// Server `reload`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReloadMessage {
    pub command: CommandType,
    pub path: String,
    #[serde(rename = "liveCSS")]
    pub live_css: bool,
}

/// Server `alert`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertMessage {
    pub command: CommandType,
    pub message: String,
}

//! Message formatting utilities for client display.

use chrono::{DateTime, FixedOffset, SecondsFormat};

/// Message formatter for client display
pub struct MessageFormatter;

fn timestamp(at: DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, false)
}

impl MessageFormatter {
    /// Format the server `hello` that completed the handshake
    ///
    /// # Arguments
    ///
    /// * `server_name` - Name announced by the server, if any
    /// * `protocols` - Protocol URIs the server speaks
    pub fn format_hello(server_name: Option<&str>, protocols: &[String]) -> String {
        let mut output = String::new();
        output.push_str("\n============================================================\n");
        output.push_str(&format!(
            "Connected to {}\n",
            server_name.unwrap_or("(unnamed server)")
        ));
        for protocol in protocols {
            output.push_str(&format!("  protocol: {}\n", protocol));
        }
        output.push_str("============================================================\n");
        output
    }

    /// Format a reload request
    ///
    /// # Arguments
    ///
    /// * `path` - Path the server asked to reload
    /// * `live_css` - Whether stylesheets may be swapped in place
    /// * `received_at` - When the frame arrived
    pub fn format_reload(path: &str, live_css: bool, received_at: DateTime<FixedOffset>) -> String {
        let mode = if live_css { "live CSS" } else { "full page" };
        format!(
            "↻ reload {} ({}) at {}\n",
            path,
            mode,
            timestamp(received_at)
        )
    }

    /// Format an alert
    pub fn format_alert(message: &str, received_at: DateTime<FixedOffset>) -> String {
        format!(
            "\n------------------------------------------------------------\n\
             ! {}\n\
             received at {}\n\
             ------------------------------------------------------------\n",
            message,
            timestamp(received_at)
        )
    }

    /// Format the close frame sent by the server
    pub fn format_close(code: u16, reason: &str) -> String {
        if reason.is_empty() {
            format!("Server closed the connection ({})\n", code)
        } else {
            format!("Server closed the connection ({}: {})\n", code, reason)
        }
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("← Received: {}\n", text)
    }
}

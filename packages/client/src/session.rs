//! One LiveReload client session: connect, handshake, print commands.

use std::time::Duration;

use chrono::Local;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, protocol::Message},
};

use lrserver::{
    domain::{PROTOCOL_OFFICIAL_7, SUPPORTED_PROTOCOLS},
    infrastructure::{
        codec::{ServerMessage, decode_server_message, encode_client_hello, encode_info},
        dto::websocket::HelloMessage,
    },
};

use crate::{error::ClientError, formatter::MessageFormatter};

/// How long the server may take to answer our `hello`.
const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// Close code the server uses for protocol violations.
const CLOSE_PROTOCOL_ERROR: u16 = 1002;

/// Run one session until the user presses Ctrl+C or the connection ends.
///
/// When `page_url` is set it is announced with an `info` command after the
/// handshake, as a browser extension would.
pub async fn run_client_session(url: &str, page_url: Option<&str>) -> Result<(), ClientError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    tracing::info!("Connected to {}", url);

    let (mut write, mut read) = ws_stream.split();

    let hello = encode_client_hello(SUPPORTED_PROTOCOLS);
    write
        .send(Message::Text(hello.into()))
        .await
        .map_err(|e| ClientError::ConnectionLost(e.to_string()))?;

    let server_hello = tokio::time::timeout(HELLO_TIMEOUT, wait_for_hello(&mut read))
        .await
        .map_err(|_| ClientError::HandshakeFailed("no hello from server".to_string()))??;
    validate_hello(&server_hello)?;
    print!(
        "{}",
        MessageFormatter::format_hello(server_hello.server_name.as_deref(), &server_hello.protocols)
    );

    if let Some(page_url) = page_url {
        write
            .send(Message::Text(encode_info(page_url).into()))
            .await
            .map_err(|e| ClientError::ConnectionLost(e.to_string()))?;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => print_server_message(text.as_str()),
                Some(Ok(Message::Binary(data))) => {
                    print!("{}", MessageFormatter::format_binary_message(data.len()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|frame| (u16::from(frame.code), frame.reason.as_str().to_string()))
                        .unwrap_or((1005, String::new()));
                    print!("{}", MessageFormatter::format_close(code, &reason));
                    if code == CLOSE_PROTOCOL_ERROR {
                        return Err(ClientError::HandshakeFailed(reason));
                    }
                    return Err(ClientError::ConnectionLost("server closed the connection".to_string()));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return Err(ClientError::ConnectionLost(e.to_string()));
                }
                None => return Err(ClientError::ConnectionLost("stream ended".to_string())),
            },
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, closing connection");
                write.send(Message::Close(None)).await.ok();
                return Ok(());
            }
        }
    }
}

/// Read frames until the server `hello` arrives.
async fn wait_for_hello<S>(read: &mut S) -> Result<HelloMessage, ClientError>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => {
                return match decode_server_message(text.as_str()) {
                    Ok(ServerMessage::Hello(hello)) => Ok(hello),
                    Ok(other) => Err(ClientError::HandshakeFailed(format!(
                        "expected hello, got {:?}",
                        other
                    ))),
                    Err(e) => Err(ClientError::HandshakeFailed(e.to_string())),
                };
            }
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|frame| frame.reason.as_str().to_string())
                    .unwrap_or_default();
                return Err(ClientError::HandshakeFailed(format!(
                    "server closed the connection: {}",
                    reason
                )));
            }
            Ok(_) => {}
            Err(e) => return Err(ClientError::ConnectionLost(e.to_string())),
        }
    }

    Err(ClientError::ConnectionLost(
        "stream ended before hello".to_string(),
    ))
}

/// The server must agree on the protocol we offered.
fn validate_hello(hello: &HelloMessage) -> Result<(), ClientError> {
    if hello.protocols.iter().any(|p| p == PROTOCOL_OFFICIAL_7) {
        Ok(())
    } else {
        Err(ClientError::HandshakeFailed(format!(
            "server does not speak {} (offered {:?})",
            PROTOCOL_OFFICIAL_7, hello.protocols
        )))
    }
}

fn print_server_message(text: &str) {
    let received_at = Local::now().fixed_offset();
    match decode_server_message(text) {
        Ok(ServerMessage::Reload(reload)) => print!(
            "{}",
            MessageFormatter::format_reload(&reload.path, reload.live_css, received_at)
        ),
        Ok(ServerMessage::Alert(alert)) => print!(
            "{}",
            MessageFormatter::format_alert(&alert.message, received_at)
        ),
        Ok(ServerMessage::Hello(_)) => tracing::debug!("Ignoring repeated hello"),
        Err(_) => print!("{}", MessageFormatter::format_raw_message(text)),
    }
}

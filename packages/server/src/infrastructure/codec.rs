//! Message codec: JSON text frames <-> protocol values.
//!
//! Every function here is pure.

use serde::{Serialize, de::DeserializeOwned};

use crate::domain::{Command, DecodeError, SUPPORTED_PROTOCOLS};

use super::dto::websocket::{
    AlertMessage, CommandEnvelope, CommandType, HelloMessage, InfoMessage, ReloadMessage,
    UrlMessage,
};

/// A frame sent by the server, as seen by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Hello(HelloMessage),
    Reload(ReloadMessage),
    Alert(AlertMessage),
}

fn parse<T: DeserializeOwned>(text: &str) -> Result<T, DecodeError> {
    serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))
}

fn to_frame<T: Serialize>(message: &T) -> String {
    // Serializing these DTOs cannot fail: they hold only strings, bools and lists.
    serde_json::to_string(message).expect("protocol DTOs serialize to JSON")
}

/// Decode a frame sent by a client.
///
/// Malformed JSON and known commands with malformed fields are
/// [`DecodeError::Malformed`]; anything else with a `command` this server
/// does not handle is [`DecodeError::UnknownCommand`].
pub fn decode_incoming(text: &str) -> Result<Command, DecodeError> {
    let envelope: CommandEnvelope = parse(text)?;

    match envelope.command.as_str() {
        "hello" => {
            let hello: HelloMessage = parse(text)?;
            Ok(Command::Hello {
                protocols: hello.protocols,
            })
        }
        "info" => {
            let info: InfoMessage = parse(text)?;
            Ok(Command::Info { url: info.url })
        }
        "url" => {
            let url: UrlMessage = parse(text)?;
            Ok(Command::Url { url: url.url })
        }
        other => Err(DecodeError::UnknownCommand(other.to_string())),
    }
}

/// Server handshake response.
pub fn encode_hello(server_name: &str) -> String {
    to_frame(&HelloMessage {
        command: CommandType::Hello,
        protocols: SUPPORTED_PROTOCOLS.iter().map(|p| p.to_string()).collect(),
        server_name: Some(server_name.to_string()),
    })
}

pub fn encode_reload(path: &str, live_css: bool) -> String {
    to_frame(&ReloadMessage {
        command: CommandType::Reload,
        path: path.to_string(),
        live_css,
    })
}

pub fn encode_alert(message: &str) -> String {
    to_frame(&AlertMessage {
        command: CommandType::Alert,
        message: message.to_string(),
    })
}

/// Client handshake request.
pub fn encode_client_hello<S: AsRef<str>>(protocols: &[S]) -> String {
    to_frame(&HelloMessage {
        command: CommandType::Hello,
        protocols: protocols.iter().map(|p| p.as_ref().to_string()).collect(),
        server_name: None,
    })
}

/// Client `info` announcing the page it is attached to.
pub fn encode_info(url: &str) -> String {
    to_frame(&InfoMessage {
        command: CommandType::Info,
        url: Some(url.to_string()),
        plugins: None,
    })
}

/// Decode a frame sent by the server (client side of the protocol).
pub fn decode_server_message(text: &str) -> Result<ServerMessage, DecodeError> {
    let envelope: CommandEnvelope = parse(text)?;

    match envelope.command.as_str() {
        "hello" => parse(text).map(ServerMessage::Hello),
        "reload" => parse(text).map(ServerMessage::Reload),
        "alert" => parse(text).map(ServerMessage::Alert),
        other => Err(DecodeError::UnknownCommand(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PROTOCOL_OFFICIAL_7;
    use serde_json::{Value, json};

    fn as_json(frame: &str) -> Value {
        serde_json::from_str(frame).unwrap()
    }

    #[test]
    fn test_decode_hello() {
        // テスト項目: クライアントの hello がプロトコル一覧付きでデコードされる
        // given (前提条件):
        let frame = r#"{"command":"hello","protocols":["http://livereload.com/protocols/official-7","http://livereload.com/protocols/official-6"]}"#;

        // when (操作):
        let result = decode_incoming(frame);

        // then (期待する結果):
        assert_eq!(
            result,
            Ok(Command::Hello {
                protocols: vec![
                    PROTOCOL_OFFICIAL_7.to_string(),
                    "http://livereload.com/protocols/official-6".to_string(),
                ]
            })
        );
    }

    #[test]
    fn test_decode_hello_without_protocols() {
        // テスト項目: protocols が無い hello は空リストとしてデコードされる
        // given (前提条件):
        let frame = r#"{"command":"hello"}"#;

        // when (操作):
        let result = decode_incoming(frame);

        // then (期待する結果):
        assert_eq!(result, Ok(Command::Hello { protocols: vec![] }));
    }

    #[test]
    fn test_decode_info_ignores_plugins() {
        // テスト項目: info コマンドはプラグイン情報を含んでいてもデコードできる
        // given (前提条件):
        let frame = r#"{"command":"info","url":"http://localhost:8000/","plugins":{"less":{"version":"1.0"}}}"#;

        // when (操作):
        let result = decode_incoming(frame);

        // then (期待する結果):
        assert_eq!(
            result,
            Ok(Command::Info {
                url: Some("http://localhost:8000/".to_string())
            })
        );
    }

    #[test]
    fn test_decode_url() {
        // テスト項目: url コマンドがデコードされる
        // given (前提条件):
        let frame = r#"{"command":"url","url":"http://localhost:8000/about.html"}"#;

        // when (操作):
        let result = decode_incoming(frame);

        // then (期待する結果):
        assert_eq!(
            result,
            Ok(Command::Url {
                url: "http://localhost:8000/about.html".to_string()
            })
        );
    }

    #[test]
    fn test_decode_unknown_command() {
        // テスト項目: 未知のコマンドは UnknownCommand になる
        // given (前提条件):
        let frame = r#"{"command":"reload","path":"index.html"}"#;

        // when (操作):
        let result = decode_incoming(frame);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(DecodeError::UnknownCommand("reload".to_string()))
        );
    }

    #[test]
    fn test_decode_malformed_frames() {
        // テスト項目: JSON として不正、または command が無いフレームは Malformed になる
        // given (前提条件):
        let frames = [
            "not json",
            "[1, 2, 3]",
            r#"{"protocols":[]}"#,
            r#"{"command":"hello","protocols":"official-7"}"#,
            r#"{"command":"url"}"#,
        ];

        // when (操作) / then (期待する結果):
        for frame in frames {
            assert!(
                matches!(decode_incoming(frame), Err(DecodeError::Malformed(_))),
                "{} should be malformed",
                frame
            );
        }
    }

    #[test]
    fn test_encode_hello() {
        // テスト項目: サーバーの hello にプロトコルとサーバー名が含まれる
        // given (前提条件) / when (操作):
        let frame = encode_hello("LiveReload");

        // then (期待する結果):
        assert_eq!(
            as_json(&frame),
            json!({
                "command": "hello",
                "protocols": [PROTOCOL_OFFICIAL_7],
                "serverName": "LiveReload",
            })
        );
    }

    #[test]
    fn test_encode_reload() {
        // テスト項目: reload に path と liveCSS が含まれる
        // given (前提条件) / when (操作):
        let frame = encode_reload("index.html", true);

        // then (期待する結果):
        assert_eq!(
            frame,
            r#"{"command":"reload","path":"index.html","liveCSS":true}"#
        );
        assert_eq!(
            as_json(&encode_reload("css/site.css", false))["liveCSS"],
            json!(false)
        );
    }

    #[test]
    fn test_encode_alert_escapes_message() {
        // テスト項目: alert のメッセージは JSON として正しくエスケープされる
        // given (前提条件):
        let message = "build failed:\n\"main.scss\" line 3";

        // when (操作):
        let frame = encode_alert(message);

        // then (期待する結果):
        assert_eq!(
            as_json(&frame),
            json!({"command": "alert", "message": message})
        );
    }

    #[test]
    fn test_client_hello_is_accepted_by_decoder() {
        // テスト項目: クライアント用 hello はサーバーのデコーダで解釈できる
        // given (前提条件):
        let frame = encode_client_hello(&[PROTOCOL_OFFICIAL_7]);

        // when (操作):
        let result = decode_incoming(&frame);

        // then (期待する結果):
        assert!(!frame.contains("serverName"));
        assert_eq!(
            result,
            Ok(Command::Hello {
                protocols: vec![PROTOCOL_OFFICIAL_7.to_string()]
            })
        );
    }

    #[test]
    fn test_decode_server_messages() {
        // テスト項目: サーバー発のフレームをクライアント側で解釈できる
        // given (前提条件):
        let hello = encode_hello("Docs");
        let reload = encode_reload("a.css", true);
        let alert = encode_alert("oops");

        // when (操作) / then (期待する結果):
        assert!(matches!(
            decode_server_message(&hello),
            Ok(ServerMessage::Hello(HelloMessage { server_name: Some(name), .. })) if name == "Docs"
        ));
        assert!(matches!(
            decode_server_message(&reload),
            Ok(ServerMessage::Reload(ReloadMessage { path, live_css: true, .. })) if path == "a.css"
        ));
        assert!(matches!(
            decode_server_message(&alert),
            Ok(ServerMessage::Alert(AlertMessage { message, .. })) if message == "oops"
        ));
        assert_eq!(
            decode_server_message(r#"{"command":"url","url":"x"}"#),
            Err(DecodeError::UnknownCommand("url".to_string()))
        );
    }
}

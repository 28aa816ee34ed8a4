//! Integration tests for the LiveReload server, driven by real WebSocket clients.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use lrserver::{Server, domain::PROTOCOL_OFFICIAL_7};
use serde_json::{Value, json};
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::protocol::{CloseFrame, Message},
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// Helper struct to manage an in-process server
struct TestServer {
    server: Server,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server on an OS-assigned port
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start a server, adjusting its configuration before it binds
    async fn start_with(configure: impl FnOnce(&Server)) -> Self {
        let server = Server::new("test-server", "127.0.0.1", 0);
        server.set_status_log(None);
        server.set_error_log(None);
        configure(&server);

        let listener = server.listen().await.expect("Failed to bind server");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let serving = server.clone();
        let task = tokio::spawn(async move {
            serving
                .serve(listener, async move {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        TestServer {
            server,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Get the WebSocket URL for this server
    fn url(&self) -> String {
        format!("ws://{}/livereload", self.server.addr())
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.server.addr(), path)
    }

    /// Trigger graceful shutdown and wait for `serve` to return
    async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        if let Some(task) = self.task.take() {
            tokio::time::timeout(RECV_TIMEOUT, task)
                .await
                .expect("Server did not shut down in time")
                .expect("Server task panicked");
        }
    }

    /// Wait until the registry holds exactly `expected` connections
    async fn wait_for_connections(&self, expected: usize) {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        while self.server.connection_count().await != expected {
            assert!(
                tokio::time::Instant::now() < deadline,
                "Expected {} connections, found {}",
                expected,
                self.server.connection_count().await
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}

/// Helper struct wrapping one WebSocket client
struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    async fn connect(url: &str) -> Self {
        let (stream, _) = connect_async(url).await.expect("Failed to connect");
        TestClient { stream }
    }

    /// Connect and complete the handshake
    async fn connect_live(url: &str) -> Self {
        let mut client = Self::connect(url).await;
        client.send_hello(&[PROTOCOL_OFFICIAL_7]).await;
        let hello = client.recv_json().await;
        assert_eq!(hello["command"], "hello");
        client
    }

    async fn send_json(&mut self, value: Value) {
        self.send_text(&value.to_string()).await;
    }

    async fn send_text(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("Failed to send");
    }

    async fn send_hello(&mut self, protocols: &[&str]) {
        self.send_json(json!({"command": "hello", "protocols": protocols}))
            .await;
    }

    async fn next_message(&mut self) -> Option<Message> {
        loop {
            let message = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .expect("Timed out waiting for a message")?;
            match message {
                Ok(Message::Ping(_) | Message::Pong(_)) => continue,
                Ok(message) => return Some(message),
                Err(_) => return None,
            }
        }
    }

    async fn recv_json(&mut self) -> Value {
        match self.next_message().await {
            Some(Message::Text(text)) => serde_json::from_str(&text).expect("Invalid JSON"),
            other => panic!("Expected a text frame, got {:?}", other),
        }
    }

    /// Expect the server to close the connection with `code`
    async fn expect_close(&mut self, code: u16) {
        match self.next_message().await {
            Some(Message::Close(Some(CloseFrame { code: actual, .. }))) => {
                assert_eq!(u16::from(actual), code);
            }
            other => panic!("Expected close frame {}, got {:?}", code, other),
        }
    }

    /// Assert nothing arrives for a short while
    async fn expect_silence(&mut self) {
        let result = tokio::time::timeout(QUIET_PERIOD, self.stream.next()).await;
        assert!(result.is_err(), "Unexpected message: {:?}", result);
    }

    async fn close(mut self) {
        self.stream.close(None).await.ok();
    }
}

#[tokio::test]
async fn test_handshake_and_reload() {
    // テスト項目: hello に hello で応答し、その後の reload が届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.url()).await;

    // when (操作):
    client.send_hello(&[PROTOCOL_OFFICIAL_7]).await;
    let hello = client.recv_json().await;
    server.server.reload("index.html").await;

    // then (期待する結果):
    assert_eq!(
        hello,
        json!({
            "command": "hello",
            "protocols": [PROTOCOL_OFFICIAL_7],
            "serverName": "test-server"
        })
    );
    assert_eq!(
        client.recv_json().await,
        json!({"command": "reload", "path": "index.html", "liveCSS": true})
    );
}

#[tokio::test]
async fn test_reload_fans_out_to_every_client() {
    // テスト項目: 3 クライアントすべてに reload が届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(TestClient::connect_live(&server.url()).await);
    }

    // when (操作):
    server.server.reload("css/site.css").await;

    // then (期待する結果):
    for client in &mut clients {
        let reload = client.recv_json().await;
        assert_eq!(reload["command"], "reload");
        assert_eq!(reload["path"], "css/site.css");
    }
}

#[tokio::test]
async fn test_commands_arrive_in_order() {
    // テスト項目: reload → alert の順に要求すると、その順に届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut client = TestClient::connect_live(&server.url()).await;

    // when (操作):
    server.server.reload("a.css").await;
    server.server.alert("build failed").await;
    server.server.reload("b.css").await;

    // then (期待する結果):
    assert_eq!(client.recv_json().await["path"], "a.css");
    assert_eq!(
        client.recv_json().await,
        json!({"command": "alert", "message": "build failed"})
    );
    assert_eq!(client.recv_json().await["path"], "b.css");
}

#[tokio::test]
async fn test_first_command_must_be_hello() {
    // テスト項目: hello 以外で始めたクライアントはプロトコル違反で切断される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.url()).await;

    // when (操作):
    client
        .send_json(json!({"command": "info", "url": "http://localhost/"}))
        .await;

    // then (期待する結果): hello は返らず、1002 で閉じられる
    client.expect_close(1002).await;
    server.wait_for_connections(0).await;
}

#[tokio::test]
async fn test_unsupported_protocol_is_rejected() {
    // テスト項目: official-7 を含まない hello は拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.url()).await;

    // when (操作):
    client
        .send_hello(&["http://livereload.com/protocols/official-6"])
        .await;

    // then (期待する結果):
    client.expect_close(1002).await;
}

#[tokio::test]
async fn test_closed_client_leaves_registry() {
    // テスト項目: クライアントが切断するとレジストリから消え、以降の reload はブロックしない
    // given (前提条件):
    let server = TestServer::start().await;
    let client = TestClient::connect_live(&server.url()).await;
    server.wait_for_connections(1).await;

    // when (操作):
    client.close().await;
    server.wait_for_connections(0).await;
    let result =
        tokio::time::timeout(Duration::from_millis(500), server.server.reload("x.js")).await;

    // then (期待する結果):
    assert!(result.is_ok(), "reload blocked after the client left");
}

#[tokio::test]
async fn test_live_css_flag_is_sent_with_reload() {
    // テスト項目: live-CSS を無効にすると reload の liveCSS が false になる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut client = TestClient::connect_live(&server.url()).await;
    server.server.set_live_css(false);

    // when (操作):
    server.server.reload("css/site.css").await;

    // then (期待する結果):
    assert_eq!(
        client.recv_json().await,
        json!({"command": "reload", "path": "css/site.css", "liveCSS": false})
    );
}

#[tokio::test]
async fn test_unknown_and_informational_commands_are_ignored() {
    // テスト項目: ハンドシェイク後の info / url / 未知のコマンドは無視され接続は維持される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut client = TestClient::connect_live(&server.url()).await;

    // when (操作):
    client
        .send_json(json!({"command": "info", "url": "http://localhost/", "plugins": {}}))
        .await;
    client
        .send_json(json!({"command": "url", "url": "http://localhost/about"}))
        .await;
    client.send_json(json!({"command": "ping"})).await;
    client.expect_silence().await;
    server.server.alert("still here").await;

    // then (期待する結果):
    assert_eq!(client.recv_json().await["message"], "still here");
}

#[tokio::test]
async fn test_malformed_frame_closes_live_connection() {
    // テスト項目: ハンドシェイク後に不正な JSON を送ると切断される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut client = TestClient::connect_live(&server.url()).await;

    // when (操作):
    client.send_text("{not json").await;

    // then (期待する結果):
    client.expect_close(1002).await;
    server.wait_for_connections(0).await;
}

#[tokio::test]
async fn test_reload_before_handshake_is_not_delivered() {
    // テスト項目: ハンドシェイク前のクライアントには reload が送られない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.url()).await;
    server.wait_for_connections(1).await;

    // when (操作):
    server.server.reload("early.css").await;
    client.send_hello(&[PROTOCOL_OFFICIAL_7]).await;
    let hello = client.recv_json().await;

    // then (期待する結果): hello の後に early.css は届かない
    assert_eq!(hello["command"], "hello");
    client.expect_silence().await;

    server.server.reload("late.css").await;
    assert_eq!(client.recv_json().await["path"], "late.css");
}

#[tokio::test]
async fn test_shutdown_closes_connections() {
    // テスト項目: サーバー停止時に接続中のクライアントへ 1001 のクローズフレームが送られる
    // given (前提条件):
    let mut server = TestServer::start().await;
    let mut client = TestClient::connect_live(&server.url()).await;

    // when (操作):
    server.shutdown().await;

    // then (期待する結果):
    client.expect_close(1001).await;
    assert_eq!(server.server.connection_count().await, 0);
}

#[tokio::test]
async fn test_handshake_timeout_closes_with_protocol_error() {
    // テスト項目: 期限内に hello を送らないクライアントは 1002 で閉じられ、レジストリから外れる
    // given (前提条件):
    let server = TestServer::start_with(|server| {
        server.set_handshake_timeout(Duration::from_millis(100));
    })
    .await;

    // when (操作):
    let mut client = TestClient::connect(&server.url()).await;

    // then (期待する結果):
    client.expect_close(1002).await;
    server.wait_for_connections(0).await;
}

#[tokio::test]
async fn test_shutdown_during_handshake_closes_connection() {
    // テスト項目: ハンドシェイク待ちのクライアントもサーバー停止時に 1001 で閉じられる
    // given (前提条件):
    let mut server = TestServer::start().await;
    let mut client = TestClient::connect(&server.url()).await;
    server.wait_for_connections(1).await;

    // when (操作):
    server.shutdown().await;

    // then (期待する結果):
    client.expect_close(1001).await;
    assert_eq!(server.server.connection_count().await, 0);
}

#[tokio::test]
async fn test_health_check_reports_connections() {
    // テスト項目: /api/health は接続数を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let _client = TestClient::connect_live(&server.url()).await;
    server.wait_for_connections(1).await;

    // when (操作):
    let response = reqwest::get(server.http_url("/api/health")).await.unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok", "connections": 1}));
}

#[tokio::test]
async fn test_client_script_route() {
    // テスト項目: /livereload.js は設定がなければ 404、設定すればスクリプトを返す
    // given (前提条件):
    let server = TestServer::start().await;
    let url = server.http_url("/livereload.js");

    // when (操作):
    let missing = reqwest::get(&url).await.unwrap();
    server
        .server
        .set_client_script(Some("console.log('livereload');".to_string()));
    let served = reqwest::get(&url).await.unwrap();

    // then (期待する結果):
    assert_eq!(missing.status(), 404);
    assert_eq!(served.status(), 200);
    assert_eq!(
        served.headers()["content-type"],
        "application/javascript"
    );
    assert_eq!(served.text().await.unwrap(), "console.log('livereload');");
}

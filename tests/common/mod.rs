#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::time;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use chat_gateway::auth::TokenRegistry;
use chat_gateway::config::Config;
use chat_gateway::gateway::fanout::BroadcastFabric;
use chat_gateway::gateway::server;
use chat_gateway::models::User;
use chat_gateway::store::MemStore;
use chat_gateway::AppState;

pub type Ws = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct TestApp {
    pub addr: SocketAddr,
    pub state: AppState,
}

/// Start a real server on an ephemeral port with the given users seeded.
/// Each user's token is `tok-{username}`.
pub async fn spawn_app(users: &[(i64, &str)]) -> TestApp {
    let store = Arc::new(MemStore::new());
    let auth = Arc::new(TokenRegistry::new());
    for (id, username) in users {
        let user = User {
            id: *id,
            username: username.to_string(),
        };
        auth.issue(&format!("tok-{username}"), user.clone());
        store.insert_user(user);
    }

    let state = AppState {
        store,
        auth,
        fabric: Arc::new(BroadcastFabric::new()),
        config: Arc::new(Config {
            port: 0,
            users_file: None,
        }),
    };

    let app = server::router().with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { addr, state }
}

/// Open a WebSocket to the given path, optionally with a bearer token.
pub async fn connect(addr: SocketAddr, path: &str, token: Option<&str>) -> Ws {
    let url = format!("ws://{addr}/{path}");
    let mut request = url.into_client_request().expect("client request");
    if let Some(token) = token {
        request.headers_mut().insert(
            "authorization",
            format!("Token {token}").parse().expect("header value"),
        );
    }
    let (ws, _) = tokio_tungstenite::connect_async(request)
        .await
        .expect("ws connect");
    ws
}

/// Connect a personal session and wait until its event loop is live (the
/// `event.list` reply proves the personal group has been joined).
pub async fn connect_personal_ready(addr: SocketAddr, token: &str) -> Ws {
    let mut ws = connect(addr, "", Some(token)).await;
    send_event(&mut ws, "event.list", serde_json::json!({})).await;
    let reply = recv_json(&mut ws).await;
    assert_eq!(reply["status"], "ok", "personal connect failed: {reply}");
    ws
}

/// Connect a room session and wait until its event loop is live.
pub async fn connect_room_ready(addr: SocketAddr, token: &str, room_uuid: &str) -> Ws {
    let mut ws = connect(addr, &format!("chat/{room_uuid}"), Some(token)).await;
    send_event(&mut ws, "event.list", serde_json::json!({})).await;
    let reply = recv_json(&mut ws).await;
    assert_eq!(reply["status"], "ok", "room connect failed: {reply}");
    ws
}

pub async fn send_event(ws: &mut Ws, event: &str, data: serde_json::Value) {
    let frame = serde_json::json!({ "event": event, "data": data });
    ws.send(tungstenite::Message::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

pub async fn send_raw(ws: &mut Ws, text: &str) {
    ws.send(tungstenite::Message::Text(text.to_string().into()))
        .await
        .expect("send raw");
}

/// Read the next text frame as JSON, skipping ping/pong.
pub async fn recv_json(ws: &mut Ws) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for frame")
            .expect("stream ended")
            .expect("ws read error");
        match msg {
            tungstenite::Message::Text(text) => {
                return serde_json::from_str(&text).expect("parse frame")
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

/// Expect a close frame with the uniform server close code (1000).
pub async fn expect_close(ws: &mut Ws) {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for close")
            .expect("stream ended")
            .expect("ws read error");
        match msg {
            tungstenite::Message::Close(frame) => {
                if let Some(frame) = frame {
                    assert_eq!(
                        frame.code,
                        tungstenite::protocol::frame::coding::CloseCode::Normal
                    );
                }
                return;
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}

/// Assert nothing arrives on this connection within the window.
pub async fn expect_silence(ws: &mut Ws, millis: u64) {
    let result = time::timeout(Duration::from_millis(millis), ws.next()).await;
    assert!(result.is_err(), "expected no frame, got {result:?}");
}

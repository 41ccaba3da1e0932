//! Shared helpers for the end-to-end suites: a relay on a free port backed
//! by the in-memory store.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use notepad_sync::app::build_router;
use notepad_sync::config::Config;
use notepad_sync::db::{DocumentStore, MemStore};
use notepad_sync::models::{Document, NewDocument, SendMessage};
use notepad_sync::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<MemStore>,
}

impl TestServer {
    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn seed(&self, filename: &str, content: &str) -> Document {
        self.store
            .create(NewDocument {
                filename: filename.into(),
                content: content.into(),
                last_modified: "2024-01-01T00:00:00Z".into(),
            })
            .await
            .unwrap()
    }
}

pub async fn start_server(config: Config) -> TestServer {
    let store = Arc::new(MemStore::new());
    let app = build_router(AppState::new(store.clone(), config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer { addr, store }
}

pub async fn ws_connect(server: &TestServer) -> Ws {
    let (ws, _) = connect_async(server.ws_url()).await.unwrap();
    ws
}

pub async fn send_json(ws: &mut Ws, value: serde_json::Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// Next relay frame, failing the test after two seconds
pub async fn recv_frame(ws: &mut Ws) -> SendMessage {
    loop {
        let next = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = next {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Assert nothing arrives within a short window
pub async fn expect_silence(ws: &mut Ws) {
    if let Ok(Some(Ok(Message::Text(text)))) = timeout(Duration::from_millis(200), ws.next()).await {
        panic!("unexpected frame: {}", text.as_str());
    }
}

/// Poll until `check` holds or two seconds pass
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met in time");
}

//! In-process HTTP receiver for outbound webhook tests.
//!
//! `MockReceiver` binds an axum server to an ephemeral localhost port, records
//! every request it receives, and answers with a scripted status, body and
//! delay. The server is aborted when the receiver is dropped.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request captured by [`MockReceiver`].
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ReceivedRequest {
    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
struct Script {
    status: StatusCode,
    body: String,
    delay: Duration,
}

#[derive(Debug)]
struct Shared {
    requests: Mutex<Vec<ReceivedRequest>>,
    script: Mutex<Script>,
}

pub struct MockReceiver {
    addr: SocketAddr,
    shared: Arc<Shared>,
    server: JoinHandle<()>,
}

impl MockReceiver {
    /// Start a receiver answering `200 OK` with body `ok`.
    pub async fn start() -> Self {
        Self::respond_with(200, "ok").await
    }

    /// Start a receiver answering every request with `status` and `body`.
    pub async fn respond_with(status: u16, body: impl Into<String>) -> Self {
        let shared = Arc::new(Shared {
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(Script {
                status: StatusCode::from_u16(status).unwrap(),
                body: body.into(),
                delay: Duration::ZERO,
            }),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new()
            .fallback(receive)
            .with_state(Arc::clone(&shared));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            addr,
            shared,
            server,
        }
    }

    /// URL of the receiver's hook path.
    pub fn url(&self) -> String {
        format!("http://{}/hook", self.addr)
    }

    /// Change the scripted status and body for subsequent requests.
    pub fn set_response(&self, status: u16, body: impl Into<String>) {
        let mut script = self.shared.script.lock().unwrap();
        script.status = StatusCode::from_u16(status).unwrap();
        script.body = body.into();
    }

    /// Delay every subsequent response by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.shared.script.lock().unwrap().delay = delay;
    }

    /// Snapshot of requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.shared.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.shared.requests.lock().unwrap().len()
    }
}

impl Drop for MockReceiver {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn receive(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    shared.requests.lock().unwrap().push(ReceivedRequest {
        method,
        uri,
        headers,
        body,
    });
    let script = shared.script.lock().unwrap().clone();
    if !script.delay.is_zero() {
        tokio::time::sleep(script.delay).await;
    }
    (script.status, script.body).into_response()
}

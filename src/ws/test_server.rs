//! In-process stand-in for the backend hub's `/ws` endpoint.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing_subscriber::fmt::MakeWriter;

/// What the server does with each accepted connection.
#[derive(Debug, Clone, Default)]
pub(crate) struct FeedScript {
    frames: Vec<String>,
    tick_every: Option<Duration>,
    close_after: bool,
    drop_after: bool,
}

impl FeedScript {
    /// Sends `frames` as text frames right after the upgrade.
    pub(crate) fn frames<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            frames: frames.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sends `{"type":"tick","seq":n}` every `period` until the client leaves.
    pub(crate) fn ticking(period: Duration) -> Self {
        Self {
            tick_every: Some(period),
            ..Self::default()
        }
    }

    /// Closes the socket from the server side once the frames are sent.
    pub(crate) fn then_close(mut self) -> Self {
        self.close_after = true;
        self
    }

    /// Drops the TCP connection without a close frame once the frames are
    /// sent.
    pub(crate) fn then_drop(mut self) -> Self {
        self.drop_after = true;
        self
    }
}

#[derive(Debug, Default)]
struct Sessions {
    disconnected: AtomicUsize,
    notify: Notify,
}

/// Handle to a running feed server.
#[derive(Debug)]
pub(crate) struct FeedServer {
    sessions: Arc<Sessions>,
    task: JoinHandle<()>,
}

impl FeedServer {
    /// Waits until at least one session has ended and returns the count.
    pub(crate) async fn disconnected(&self) -> usize {
        loop {
            let n = self.sessions.disconnected.load(Ordering::SeqCst);
            if n > 0 {
                return n;
            }
            self.sessions.notify.notified().await;
        }
    }
}

impl Drop for FeedServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn feed_handler(
    ws: WebSocketUpgrade,
    State((script, sessions)): State<(Arc<FeedScript>, Arc<Sessions>)>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        serve(socket, &script).await;
        sessions.disconnected.fetch_add(1, Ordering::SeqCst);
        sessions.notify.notify_one();
    })
}

async fn serve(mut socket: WebSocket, script: &FeedScript) {
    for frame in &script.frames {
        if socket.send(Message::text(frame.clone())).await.is_err() {
            return;
        }
    }

    if script.close_after {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    if script.drop_after {
        drop(socket);
        return;
    }

    if let Some(period) = script.tick_every {
        let mut seq: u64 = 0;
        loop {
            tokio::time::sleep(period).await;
            seq += 1;
            let tick = format!(r#"{{"type":"tick","seq":{seq}}}"#);
            if socket.send(Message::text(tick)).await.is_err() {
                return;
            }
        }
    }

    while let Some(Ok(msg)) = socket.recv().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
    }
}

/// Starts a feed server on an ephemeral port and returns its `ws://` URL.
pub(crate) async fn spawn_feed_server(script: FeedScript) -> (String, FeedServer) {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener has no local address");
    };
    let sessions = Arc::new(Sessions::default());
    let app = Router::new()
        .route("/ws", get(feed_handler))
        .with_state((Arc::new(script), Arc::clone(&sessions)));
    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("ws://{addr}/ws"), FeedServer { sessions, task })
}

/// Starts a TCP server that accepts connections but never answers the
/// WebSocket handshake.
pub(crate) async fn spawn_silent_server() -> (String, JoinHandle<()>) {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener has no local address");
    };
    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    (format!("ws://{addr}/ws"), task)
}

/// Returns a `ws://` URL on a port nothing listens on.
pub(crate) async fn unreachable_endpoint() -> String {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener has no local address");
    };
    drop(listener);
    format!("ws://{addr}/ws")
}

/// Routes `tracing` output through the test harness.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("floorplan_feed=debug"))
        .with_test_writer()
        .try_init();
}

/// In-memory log sink shared with a scoped subscriber.
#[derive(Debug, Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` with a thread-local subscriber and returns what it logged.
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("floorplan_feed=trace"))
        .with_writer(buffer.clone())
        .with_ansi(false)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap_or_else(PoisonError::into_inner))
        .into_owned();
    (out, logs)
}

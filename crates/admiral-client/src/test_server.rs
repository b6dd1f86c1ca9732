//! Scripted HTTP server for exercising the clients over a real socket.
//!
//! Each route answers with its replies in order and keeps repeating the
//! last one. Every request is recorded so tests can inspect what was sent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::track::{PollPolicy, Tracking};

/// A canned response.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    status: u16,
    body: String,
    location: Option<String>,
}

impl Reply {
    pub(crate) fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            location: None,
        }
    }

    pub(crate) fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }
}

/// A request as seen by the server.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    pub body: String,
}

type Routes = HashMap<(String, String), Vec<Reply>>;

pub(crate) struct ScriptedServer {
    url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl ScriptedServer {
    /// Bind to an ephemeral port and serve `(method, path, replies)` routes.
    pub(crate) async fn start(routes: Vec<(&str, &str, Vec<Reply>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let routes: Routes = routes
            .into_iter()
            .map(|(method, path, replies)| ((method.to_string(), path.to_string()), replies))
            .collect();
        let routes = Arc::new(Mutex::new(routes));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, routes, recorded).await;
                });
            }
        });

        Self { url, requests }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received for a method and path, query ignored.
    pub(crate) fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && route_path(&r.target) == path)
            .count()
    }
}

/// Tracking with a short real-time interval and a silent notifier.
pub(crate) fn quiet_tracking() -> Tracking {
    Tracking::new(
        PollPolicy::default().with_interval(Duration::from_millis(10)),
        CancellationToken::new(),
    )
    .with_notifier(Arc::new(|_: &str| {}))
}

fn route_path(target: &str) -> &str {
    target.split('?').next().unwrap_or(target)
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

async fn serve(
    mut stream: TcpStream,
    routes: Arc<Mutex<Routes>>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).into_owned();

    let key = (method.clone(), route_path(&target).to_string());
    recorded.lock().unwrap().push(Recorded {
        method,
        target,
        body,
    });

    let reply = {
        let mut routes = routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(replies) if replies.len() > 1 => replies.remove(0),
            Some(replies) if !replies.is_empty() => replies[0].clone(),
            _ => Reply::json(404, r#"{"message":"not found"}"#),
        }
    };

    let mut response = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reply.body.len()
    );
    if let Some(location) = &reply.location {
        response.push_str(&format!("Location: {}\r\n", location));
    }
    response.push_str("\r\n");
    response.push_str(&reply.body);

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

//! Shared utilities for end-to-end gateway tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use routegate::config::parse_config;
use routegate::lifecycle::Shutdown;
use routegate::middleware::MiddlewareRegistry;
use routegate::store::InMemoryStore;
use routegate::upstream::ReqwestTransport;
use routegate::{GatewayPipeline, GatewayServer};

/// Mock upstream that answers every request with a JSON document echoing
/// the request path, and counts how many requests it served.
pub struct MockBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_mock_backend() -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let counter = counter.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let path = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();

                counter.fetch_add(1, Ordering::SeqCst);

                let body = format!(
                    r#"{{"path":"{}","name":"alice","secret":"s3cr3t"}}"#,
                    path
                );
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockBackend { addr, hits }
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub struct RunningGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Parse `toml`, build the full pipeline and serve it on an ephemeral port.
pub async fn start_gateway(toml: &str) -> RunningGateway {
    let config = parse_config(toml).unwrap();

    let pipeline = GatewayPipeline::new(
        config.routes,
        Arc::new(InMemoryStore::new()),
        Arc::new(ReqwestTransport::new().unwrap()),
        &MiddlewareRegistry::with_builtins(),
    )
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = GatewayServer::new(Arc::new(pipeline), &config.server);
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));

    RunningGateway {
        addr,
        shutdown,
        handle,
    }
}

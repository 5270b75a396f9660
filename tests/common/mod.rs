//! Shared utilities for relay integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode},
    routing::any,
    Json, Router,
};
use http_relay::lifecycle::ServerState;
use http_relay::{RelayConfig, RelayServer, RelayServerError, Shutdown};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Self-signed certificate and key written to a temporary directory.
pub struct TlsFiles {
    _dir: tempfile::TempDir,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TlsFiles {
    pub fn generate() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();

        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        std::fs::write(&cert_path, certified.cert.pem()).unwrap();
        std::fs::write(&key_path, certified.key_pair.serialize_pem()).unwrap();

        Self {
            _dir: dir,
            cert_path,
            key_path,
        }
    }
}

/// Start a plain-HTTP stub upstream on an ephemeral port.
///
/// - `/echo`: returns the request body verbatim
/// - `/method`: returns the request method
/// - `/headers`: returns every received header as JSON (`name → [values]`)
/// - `/teapot`: answers 418 with body `teapot`
/// - `/slow`: answers `slow done` after one second
/// - `/very-slow`: answers after ten seconds
pub async fn start_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/echo", any(|body: Bytes| async move { body }))
        .route("/method", any(|method: Method| async move { method.to_string() }))
        .route("/headers", any(echo_headers))
        .route("/teapot", any(|| async { (StatusCode::IM_A_TEAPOT, "teapot") }))
        .route(
            "/slow",
            any(|| async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                "slow done"
            }),
        )
        .route(
            "/very-slow",
            any(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                "very slow done"
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, Vec<String>>> {
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers.iter() {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(value.to_str().unwrap_or_default().to_string());
    }
    Json(seen)
}

/// A relay server running on an ephemeral port.
pub struct RelayHarness {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub state: watch::Receiver<ServerState>,
    pub task: JoinHandle<Result<(), RelayServerError>>,
    _tls: TlsFiles,
}

impl RelayHarness {
    /// Start a relay with default settings, after applying `adjust` to its config.
    pub async fn start(adjust: impl FnOnce(&mut RelayConfig)) -> Self {
        let tls = TlsFiles::generate();
        let mut config = RelayConfig::new("127.0.0.1", 0);
        config.tls.cert_path = tls.cert_path.display().to_string();
        config.tls.key_path = tls.key_path.display().to_string();
        adjust(&mut config);

        let server = RelayServer::configure(config);
        let handle = server.handle();
        let state = server.state();
        let shutdown = Shutdown::new();
        let server_shutdown = shutdown.subscribe();

        let task = tokio::spawn(server.run(server_shutdown));
        let addr = handle.listening().await.expect("relay failed to listen");
        state
            .clone()
            .wait_for(|s| *s >= ServerState::Listening)
            .await
            .unwrap();

        Self {
            addr,
            shutdown,
            state,
            task,
            _tls: tls,
        }
    }

    /// HTTPS client trusting the harness's self-signed certificate.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .resolve("localhost", self.addr)
            .no_proxy()
            .build()
            .unwrap()
    }

    pub fn url(&self, path: &str) -> String {
        format!("https://localhost:{}{}", self.addr.port(), path)
    }

    /// Post an envelope to `/` and return status and body text.
    pub async fn relay(
        &self,
        client: &reqwest::Client,
        url: &str,
        body: &str,
        content_type: &str,
    ) -> (u16, String) {
        let envelope = serde_json::json!({
            "url": url,
            "body": body,
            "content_type": content_type,
        });
        let response = client.post(self.url("/")).json(&envelope).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.text().await.unwrap())
    }

    /// Trigger shutdown and wait for `run` to return.
    pub async fn stop(self) -> Result<(), RelayServerError> {
        self.shutdown.trigger();
        self.task.await.unwrap()
    }
}

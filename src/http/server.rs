//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create the Axum Router with the single `POST /` route
//! - Wire up middleware (request ID, access log)
//! - Terminate TLS and apply connection deadlines
//! - Run until the caller's shutdown source fires or the listener fails
//! - Drain in-flight connections within the grace period, then force-close

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use axum_server::{tls_rustls::RustlsAcceptor, Handle};
use hyper_util::rt::TokioTimer;
use std::io;
use std::net::AddrParseError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinError, JoinHandle};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::RelayConfig;
use crate::http::request::{
    mark_caller_request_id, request_id, strip_generated_request_id, MakeRequestUuidV4,
    X_REQUEST_ID,
};
use crate::http::response;
use crate::lifecycle::{ServerState, StateTracker};
use crate::net::{load_tls_config, DeadlineAcceptor, TlsError};
use crate::observability::metrics;
use crate::relay::{RelayError, Translator};

/// Errors that end `RelayServer::run`.
#[derive(Debug, Error)]
pub enum RelayServerError {
    #[error("invalid listen address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("listener failed: {0}")]
    Listener(#[source] io::Error),

    #[error("server forced to shutdown after {0:?} grace period")]
    ShutdownTimeout(Duration),
}

/// Application state injected into the relay handler.
#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<Translator>,
    pub read_timeout: Duration,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(translator: Translator, read_timeout: Duration, max_body_bytes: usize) -> Self {
        Self {
            translator: Arc::new(translator),
            read_timeout,
            max_body_bytes,
        }
    }
}

/// Build the Axum router: `POST /` relays, everything else is 404.
pub fn build_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .map_request(mark_caller_request_id::<Body>)
        .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuidV4))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id(request),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()));

    Router::new()
        .route("/", post(relay_handler).fallback(response::not_found))
        .fallback(response::not_found)
        .with_state(state)
        .layer(middleware)
}

/// Relay one call: read the envelope, translate, answer with upstream bytes.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (mut parts, body) = request.into_parts();
    strip_generated_request_id(&mut parts.headers, &parts.extensions);

    let result = match read_body(body, state.read_timeout, state.max_body_bytes).await {
        Ok(bytes) => state.translator.translate(&parts.headers, bytes).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(bytes) => {
            metrics::record_relay(metrics::OUTCOME_SUCCESS, start_time);
            response::relayed(bytes)
        }
        Err(e) => {
            tracing::warn!(error = %e, outcome = e.outcome(), "Relay call failed");
            metrics::record_relay(e.outcome(), start_time);
            e.into_response()
        }
    }
}

async fn read_body(body: Body, read_timeout: Duration, limit: usize) -> Result<Bytes, RelayError> {
    match tokio::time::timeout(read_timeout, axum::body::to_bytes(body, limit)).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(RelayError::ReadBody(e.to_string())),
        Err(_) => Err(RelayError::ReadBody(format!(
            "no complete body within {:?}",
            read_timeout
        ))),
    }
}

/// TLS relay server.
///
/// Construction never fails; bad TLS material, an unusable address or a
/// failing listener surface from [`RelayServer::run`].
pub struct RelayServer {
    config: RelayConfig,
    handle: Handle,
    state: StateTracker,
}

impl RelayServer {
    /// Create a server for `config`. Nothing is bound until `run`.
    pub fn configure(config: RelayConfig) -> Self {
        Self {
            config,
            handle: Handle::new(),
            state: StateTracker::new(),
        }
    }

    /// Handle to the listener; `listening()` yields the bound address.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Observe lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Router with the relay route, backed by a fresh translator.
    pub fn router(&self) -> Result<Router, RelayServerError> {
        let timeouts = &self.config.timeouts;
        let translator = Translator::new(timeouts.upstream())?;
        Ok(build_router(AppState::new(
            translator,
            timeouts.read(),
            self.config.max_body_bytes,
        )))
    }

    /// Serve until `shutdown` fires (or its source is dropped) or the listener fails.
    ///
    /// Returns `ShutdownTimeout` if connections were still open when the grace
    /// period ran out; they are force-closed before returning.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), RelayServerError> {
        let result = self.serve(&mut shutdown).await;
        self.state.advance(ServerState::Stopped);

        match &result {
            Ok(()) => tracing::info!("Server exiting"),
            Err(e) => tracing::error!(error = %e, "Server exiting"),
        }
        result
    }

    async fn serve(&self, shutdown: &mut broadcast::Receiver<()>) -> Result<(), RelayServerError> {
        let timeouts = &self.config.timeouts;
        let addr = self
            .config
            .listen_addr()
            .map_err(|source| RelayServerError::Address {
                address: self.config.listen_ip.clone(),
                source,
            })?;

        tracing::info!(address = %addr, "Starting server...");

        let tls = load_tls_config(
            Path::new(&self.config.tls.cert_path),
            Path::new(&self.config.tls.key_path),
        )
        .await?;
        let app = self.router()?;

        let acceptor = RustlsAcceptor::new(tls)
            .handshake_timeout(timeouts.read())
            .acceptor(DeadlineAcceptor::new(timeouts.write(), timeouts.idle()));
        let mut server = axum_server::bind(addr)
            .acceptor(acceptor)
            .handle(self.handle.clone());
        server
            .http_builder()
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(timeouts.read());

        let mut listener = tokio::spawn(server.serve(app.into_make_service()));

        if let Some(bound) = self.handle.listening().await {
            self.state.advance(ServerState::Listening);
            tracing::info!(address = %bound, "Listening for connections");
        }

        let stopped_early = tokio::select! {
            _ = shutdown.recv() => None,
            result = &mut listener => Some(join_result(result)),
        };

        tracing::info!(in_flight = self.handle.connection_count(), "Shutting down server...");
        self.state.advance(ServerState::ShuttingDown);

        match stopped_early {
            // The listener already ended; there is nothing left to drain.
            Some(result) => result.map_err(RelayServerError::Listener),
            None => self.drain(listener, timeouts.shutdown_grace()).await,
        }
    }

    /// Stop accepting, give open connections `grace` to finish, then force-close.
    async fn drain(
        &self,
        mut listener: JoinHandle<io::Result<()>>,
        grace: Duration,
    ) -> Result<(), RelayServerError> {
        self.handle.graceful_shutdown(None);

        match tokio::time::timeout(grace, &mut listener).await {
            Ok(result) => join_result(result).map_err(RelayServerError::Listener),
            Err(_) => {
                tracing::warn!(
                    remaining = self.handle.connection_count(),
                    grace = ?grace,
                    "Grace period elapsed, closing remaining connections"
                );
                self.handle.shutdown();
                let _ = listener.await;
                Err(RelayServerError::ShutdownTimeout(grace))
            }
        }
    }
}

fn join_result(result: Result<io::Result<()>, JoinError>) -> io::Result<()> {
    result.unwrap_or_else(|e| Err(io::Error::other(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    fn app(max_body_bytes: usize) -> Router {
        let translator = Translator::new(Duration::from_secs(60)).unwrap();
        build_router(AppState::new(translator, Duration::from_secs(10), max_body_bytes))
    }

    async fn call(app: Router, method: Method, uri: &str, body: &'static str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn get_on_root_is_not_found() {
        let (status, body) = call(app(1024), Method::GET, "/", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn other_methods_on_root_are_not_found() {
        for method in [Method::PUT, Method::DELETE, Method::PATCH] {
            let (status, _) = call(app(1024), method.clone(), "/", "{}").await;
            assert_eq!(status, StatusCode::NOT_FOUND, "method {method}");
        }
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let (status, body) = call(app(1024), Method::POST, "/relay", r#"{"url":"http://a.test"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (status, body) = call(app(1024), Method::POST, "/", "not valid json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with("Error encountered while deserializing request to JSON: "));
    }

    #[tokio::test]
    async fn invalid_url_is_bad_request() {
        let (status, body) = call(
            app(1024),
            Method::POST,
            "/",
            r#"{"url":"not-a-url","body":"","content_type":"application/json"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with("Error from server: "), "body: {body}");
    }

    #[tokio::test]
    async fn oversized_body_is_bad_request() {
        let (status, body) = call(
            app(16),
            Method::POST,
            "/",
            r#"{"url":"http://upstream.test/echo","body":"hello","content_type":"text/plain"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with("Error encountered while reading request to proxy: "));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_body_hits_read_deadline() {
        let body = Body::from_stream(futures_util::stream::pending::<Result<Bytes, io::Error>>());

        let err = read_body(body, Duration::from_secs(10), 1024).await.unwrap_err();
        assert!(matches!(err, RelayError::ReadBody(_)));
        assert_eq!(
            err.to_string(),
            "Error encountered while reading request to proxy: no complete body within 10s"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_envelope_is_bad_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from_stream(
                futures_util::stream::pending::<Result<Bytes, io::Error>>(),
            ))
            .unwrap();

        let response = app(1024).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("no complete body within"));
    }

    #[tokio::test]
    async fn assigns_and_propagates_request_id() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app(1024).oneshot(request).await.unwrap();
        let id = response.headers().get(&X_REQUEST_ID).unwrap();
        assert!(uuid::Uuid::parse_str(id.to_str().unwrap()).is_ok());

        let request = Request::builder()
            .uri("/")
            .header("x-request-id", "caller-42")
            .body(Body::empty())
            .unwrap();
        let response = app(1024).oneshot(request).await.unwrap();
        assert_eq!(response.headers()[&X_REQUEST_ID], "caller-42");
    }

    #[test]
    fn configure_does_not_touch_the_network() {
        let server = RelayServer::configure(RelayConfig::new("not-an-ip", 443));
        assert_eq!(*server.state().borrow(), ServerState::Created);
    }

    #[tokio::test]
    async fn bad_listen_address_surfaces_from_run() {
        let server = RelayServer::configure(RelayConfig::new("not-an-ip", 443));
        let state = server.state();
        let (_tx, rx) = broadcast::channel(1);

        let err = server.run(rx).await.unwrap_err();
        assert!(matches!(err, RelayServerError::Address { .. }));
        assert_eq!(*state.borrow(), ServerState::Stopped);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_run_still_logs_server_exiting() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let (_tx, rx) = broadcast::channel(1);
        RelayServer::configure(RelayConfig::new("not-an-ip", 443))
            .run(rx)
            .await
            .unwrap_err();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let line = output
            .lines()
            .find(|line| line.contains("Server exiting"))
            .expect("no exit line logged");
        assert!(line.contains("ERROR"));
        assert!(line.contains("invalid listen address"));
        assert!(!line.contains("with error"));
    }

    #[tokio::test]
    async fn missing_tls_material_surfaces_from_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RelayConfig::new("127.0.0.1", 0);
        config.tls.cert_path = dir.path().join("cert.pem").display().to_string();
        config.tls.key_path = dir.path().join("key.pem").display().to_string();
        let (_tx, rx) = broadcast::channel(1);

        let err = RelayServer::configure(config).run(rx).await.unwrap_err();
        assert!(matches!(err, RelayServerError::Tls(_)));
    }
}

//! HTTP server exposing the storage root as a file resource plus the item store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use coffer_core::{Error, FileStore, ItemStore, Result, StoreConfig};

use crate::handlers;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub addr: SocketAddr,
    /// Enable CORS.
    pub cors: bool,
    /// Storage settings.
    pub store: StoreConfig,
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            cors: false,
            store: StoreConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Creates a new server config builder.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig.
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    addr: Option<SocketAddr>,
    cors: Option<bool>,
    store: Option<StoreConfig>,
}

impl ServerConfigBuilder {
    /// Sets the listen address.
    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Sets whether CORS is enabled.
    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors = Some(enabled);
        self
    }

    /// Sets the storage settings.
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the server config.
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            addr: self.addr.unwrap_or_else(default_addr),
            cors: self.cors.unwrap_or(false),
            store: self.store.unwrap_or_default(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Files under the storage root.
    pub files: FileStore,
    /// The item mapping.
    pub items: ItemStore,
    /// Server configuration.
    pub config: ServerConfig,
    /// Server start time.
    pub start_time: Instant,
}

impl AppState {
    /// Creates new app state with the given config.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            files: FileStore::from_config(&config.store),
            items: ItemStore::from_config(&config.store),
            config,
            start_time: Instant::now(),
        }
    }
}

/// The HTTP server.
pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl Server {
    /// Creates a new server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let state = Arc::new(AppState::new(config.clone()));
        Self { config, state }
    }

    /// Creates the router.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            // Health endpoints
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/api/status", get(server_status))
            // File resource
            .route("/file", get(handlers::list_files))
            .route(
                "/file/:filename",
                put(handlers::put_file)
                    .layer(DefaultBodyLimit::disable())
                    .get(handlers::get_file)
                    .delete(handlers::delete_file),
            )
            // Item store
            .route("/items/:id", get(handlers::get_item).put(handlers::put_item))
            .with_state(self.state.clone());

        router = router.layer(TraceLayer::new_for_http());

        if self.config.cors {
            router = router.layer(CorsLayer::permissive());
        }

        router
    }

    /// Runs the server until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage root is not a directory or the listener
    /// cannot be bound.
    pub async fn run(self) -> Result<()> {
        let root = &self.config.store.root;
        let metadata = tokio::fs::metadata(root).await.map_err(|e| {
            Error::invalid_config(format!("storage root {}: {e}", root.display()))
        })?;
        if !metadata.is_dir() {
            return Err(Error::invalid_config(format!(
                "storage root {} is not a directory",
                root.display()
            )));
        }

        let router = self.router();

        tracing::info!(
            addr = %self.config.addr,
            root = %root.display(),
            items = %self.config.store.items_file,
            policy = ?self.config.store.corrupt_items,
            "Starting Coffer server"
        );

        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down gracefully"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down gracefully"),
    }
}

// === Health Endpoints ===

async fn health() -> &'static str {
    "OK"
}

async fn ready(State(state): State<Arc<AppState>>) -> Response {
    match tokio::fs::metadata(state.files.root()).await {
        Ok(meta) if meta.is_dir() => (StatusCode::OK, "Ready").into_response(),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "Storage root unavailable").into_response(),
    }
}

#[derive(Debug, Serialize)]
struct ServerStatus {
    status: String,
    uptime_seconds: u64,
    storage_root: String,
    items_file: String,
}

async fn server_status(State(state): State<Arc<AppState>>) -> Json<ServerStatus> {
    Json(ServerStatus {
        status: "running".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        storage_root: state.files.root().display().to_string(),
        items_file: state.items.path().display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use coffer_core::CorruptItemPolicy;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    fn test_router(policy: CorruptItemPolicy) -> (TempDir, Router) {
        test_router_with_limit(policy, None)
    }

    fn test_router_with_limit(policy: CorruptItemPolicy, limit: Option<u64>) -> (TempDir, Router) {
        let dir = tempdir().unwrap();
        let store = StoreConfig::builder()
            .root(dir.path())
            .corrupt_items(policy)
            .max_upload_bytes(limit)
            .build()
            .unwrap();
        let server = Server::new(ServerConfig::builder().store(store).build());
        (dir, server.router())
    }

    async fn get(router: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        send(router, Method::GET, uri, None, Body::empty()).await
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: impl Into<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            request = request.header(header::CONTENT_TYPE, ct);
        }
        let response = router
            .clone()
            .oneshot(request.body(body.into()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, bytes.to_vec())
    }

    fn as_json(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_server_config_builder() {
        let store = StoreConfig::builder().root("/srv").build().unwrap();
        let config = ServerConfig::builder()
            .addr("127.0.0.1:3000".parse().unwrap())
            .cors(true)
            .store(store)
            .build();

        assert_eq!(config.addr, "127.0.0.1:3000".parse().unwrap());
        assert!(config.cors);
        assert_eq!(config.store.root, std::path::PathBuf::from("/srv"));
        assert_eq!(ServerConfig::default().addr.port(), 5000);
    }

    #[tokio::test]
    async fn test_put_then_get_file_round_trip() {
        let (_dir, router) = test_router(CorruptItemPolicy::default());
        let payload: Vec<u8> = vec![0, 159, 146, 150, 255, 0, 10];

        let (status, _, body) =
            send(&router, Method::PUT, "/file/blob.bin", None, payload.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), json!({"filename": "blob.bin"}));

        let (status, headers, body) = get(&router, "/file/blob.bin").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, payload);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"blob.bin\""
        );
        assert_eq!(headers[header::CONTENT_LENGTH], "7");
    }

    #[tokio::test]
    async fn test_put_empty_file_and_overwrite() {
        let (_dir, router) = test_router(CorruptItemPolicy::default());

        send(&router, Method::PUT, "/file/a.txt", Some("text/plain"), "first version").await;
        send(&router, Method::PUT, "/file/a.txt", Some("text/plain"), "").await;
        let (status, headers, body) = get(&router, "/file/a.txt").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn test_list_files() {
        let (_dir, router) = test_router(CorruptItemPolicy::default());

        send(&router, Method::PUT, "/file/b.txt", None, "b").await;
        send(&router, Method::PUT, "/file/a.txt", None, "a").await;
        let (status, _, body) = send(&router, Method::GET, "/file", None, Body::empty()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), json!({"file": ["a.txt", "b.txt"]}));
    }

    #[tokio::test]
    async fn test_delete_contract() {
        let (_dir, router) = test_router(CorruptItemPolicy::default());
        send(&router, Method::PUT, "/file/doomed.txt", None, "x").await;

        let (status, _, body) =
            send(&router, Method::DELETE, "/file/doomed.txt", None, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), json!({"removed": true}));

        let (status, _, _) = get(&router, "/file/doomed.txt").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, body) =
            send(&router, Method::DELETE, "/file/doomed.txt", None, Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body = as_json(&body);
        assert_eq!(body["removed"], json!(false));
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_traversal_names_are_rejected() {
        let (dir, router) = test_router(CorruptItemPolicy::default());

        for uri in ["/file/..", "/file/..%2Fescape.txt", "/file/a%5Cb"] {
            let (status, _, body) = send(&router, Method::PUT, uri, None, "x").await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(as_json(&body)["error"]["type"], "invalid_request_error");
        }
        assert!(!dir.path().parent().unwrap().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_form_urlencoded_upload_is_rejected() {
        let (dir, router) = test_router(CorruptItemPolicy::default());

        let (status, _, body) = send(
            &router,
            Method::PUT,
            "/file/form.txt",
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            "a=1&b=2",
        )
        .await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(as_json(&body)["error"]["type"], "unsupported_media_type");
        assert!(!dir.path().join("form.txt").exists());
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let (dir, router) = test_router_with_limit(CorruptItemPolicy::default(), Some(4));

        let (status, _, _) = send(&router, Method::PUT, "/file/fits.bin", None, "1234").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = send(&router, Method::PUT, "/file/big.bin", None, "12345").await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(as_json(&body)["error"]["type"], "payload_too_large");
        assert!(!dir.path().join("big.bin").exists());
    }

    #[tokio::test]
    async fn test_item_put_without_content_type() {
        let (_dir, router) = test_router(CorruptItemPolicy::default());

        let body = r#"{"name":"sword","level":5}"#;
        let (status, _, resp) = send(&router, Method::PUT, "/items/3", None, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&resp), json!({"id": 3, "name": "sword"}));

        let (status, _, resp) =
            send(&router, Method::PUT, "/items/4", Some("text/plain"), body).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(as_json(&resp)["error"]["type"], "unsupported_media_type");

        let (_, _, resp) = get(&router, "/items/3").await;
        assert_eq!(as_json(&resp)["data"]["name"], "sword");
    }

    #[tokio::test]
    async fn test_unreadable_item_store_policies() {
        let (dir, lenient) = test_router(CorruptItemPolicy::TreatAsEmpty);
        std::fs::create_dir(dir.path().join("items.json")).unwrap();
        let (status, _, body) = get(&lenient, "/items/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), json!({"code": 0, "data": {}}));

        let (dir, strict) = test_router(CorruptItemPolicy::Reject);
        std::fs::create_dir(dir.path().join("items.json")).unwrap();
        let (status, _, body) = get(&strict, "/items/1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(as_json(&body)["error"]["code"], "unreadable_item_store");
    }

    #[tokio::test]
    async fn test_item_round_trip() {
        let (_dir, router) = test_router(CorruptItemPolicy::default());

        let (status, _, body) = send(
            &router,
            Method::PUT,
            "/items/3",
            Some("application/json"),
            r#"{"name":"sword","level":5}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), json!({"id": 3, "name": "sword"}));

        let (status, _, body) = send(&router, Method::GET, "/items/3", None, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            as_json(&body),
            json!({"code": 0, "data": {"name": "sword", "level": 5, "desc": null}})
        );
    }

    #[tokio::test]
    async fn test_missing_item_is_empty_ok() {
        let (_dir, router) = test_router(CorruptItemPolicy::default());

        let (status, _, body) = send(&router, Method::GET, "/items/999", None, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), json!({"code": 0, "data": {}}));
    }

    #[tokio::test]
    async fn test_bad_item_requests() {
        let (_dir, router) = test_router(CorruptItemPolicy::default());

        let (status, _, body) = send(&router, Method::GET, "/items/abc", None, Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(as_json(&body)["error"]["type"], "invalid_request_error");

        let (status, _, _) = send(
            &router,
            Method::PUT,
            "/items/1",
            Some("application/json"),
            r#"{"name":"no level"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_corrupt_item_store_policies() {
        let (dir, lenient) = test_router(CorruptItemPolicy::TreatAsEmpty);
        std::fs::write(dir.path().join("items.json"), "{broken").unwrap();
        let (status, _, body) = send(&lenient, Method::GET, "/items/1", None, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), json!({"code": 0, "data": {}}));

        let (dir, strict) = test_router(CorruptItemPolicy::Reject);
        std::fs::write(dir.path().join("items.json"), "{broken").unwrap();
        let (status, _, body) = send(&strict, Method::GET, "/items/1", None, Body::empty()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(as_json(&body)["error"]["code"], "corrupt_item_store");
    }

    #[tokio::test]
    async fn test_concurrent_item_puts() {
        let (dir, router) = test_router(CorruptItemPolicy::Reject);

        let json = Some("application/json");
        let a = send(&router, Method::PUT, "/items/1", json, r#"{"name":"A","level":1}"#);
        let b = send(&router, Method::PUT, "/items/2", json, r#"{"name":"B","level":2}"#);
        let ((status_a, _, _), (status_b, _, _)) = tokio::join!(a, b);
        assert_eq!(status_a, StatusCode::OK);
        assert_eq!(status_b, StatusCode::OK);

        let raw = std::fs::read(dir.path().join("items.json")).unwrap();
        let doc = as_json(&raw);
        assert_eq!(doc["1"]["name"], "A");
        assert_eq!(doc["2"]["name"], "B");
    }

    #[tokio::test]
    async fn test_health_and_status() {
        let (_dir, router) = test_router(CorruptItemPolicy::default());

        let (status, _, body) = send(&router, Method::GET, "/health", None, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");

        let (status, _, _) = send(&router, Method::GET, "/ready", None, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = get(&router, "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body)["status"], "running");
    }

    #[tokio::test]
    async fn test_ready_without_storage_root() {
        let dir = tempdir().unwrap();
        let store = StoreConfig::builder().root(dir.path().join("missing")).build().unwrap();
        let router = Server::new(ServerConfig::builder().store(store).build()).router();

        let (status, _, _) = send(&router, Method::GET, "/ready", None, Body::empty()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

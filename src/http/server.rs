//! HTTP server setup.
//!
//! # Responsibilities
//! - Create Axum Router with a single fallback handler
//! - Turn each request into a `Bundle` for the mount table
//! - Wait for the pipeline to end the response, then hand it to hyper
//! - Graceful shutdown on Ctrl+C or a caller-supplied future

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, State},
    http::{HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use bytes::{Bytes, BytesMut};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

use crate::codec::Charset;
use crate::config::RelayConfig;
use crate::mount::{Bundle, MountTable};
use crate::transport::{ServerRequest, ServerResponse, TransportResponse};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("unknown charset: {0}")]
    Charset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Socket-backed sink: the flushed response is handed back to the handler.
pub struct ChannelSink {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    tx: oneshot::Sender<Response>,
}

impl ChannelSink {
    pub fn new(tx: oneshot::Sender<Response>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            tx,
        }
    }
}

impl TransportResponse for ChannelSink {
    fn write_head(&mut self, status: StatusCode, headers: HeaderMap) {
        self.status = status;
        self.headers = headers;
    }

    fn write(&mut self, chunk: Bytes) {
        self.body.extend_from_slice(&chunk);
    }

    fn end(self: Box<Self>) {
        let sink = *self;
        let mut response = Response::new(Body::from(sink.body.freeze()));
        *response.status_mut() = sink.status;
        *response.headers_mut() = sink.headers;
        if sink.tx.send(response).is_err() {
            tracing::debug!("Client went away before the response ended");
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
struct AppState {
    mounts: Arc<dyn MountTable>,
    charset: Charset,
    max_body_size: usize,
}

/// HTTP front end for a mount table.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    pub fn new(config: RelayConfig, mounts: Arc<dyn MountTable>) -> Result<Self, ServerError> {
        let charset = Charset::from_label(&config.charset)
            .ok_or_else(|| ServerError::Charset(config.charset.clone()))?;
        let state = AppState {
            mounts,
            charset,
            max_body_size: config.limits.max_body_size,
        };
        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(relay_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), ServerError> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

async fn relay_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();
    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let body = match to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %url, error = %e, "Request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
        }
    };

    let has_body = parts.method != Method::HEAD;
    let request = ServerRequest::builder()
        .remote_addr(addr.ip())
        .method(parts.method)
        .headers(parts.headers)
        .protocol("http")
        .url(url.clone())
        .body(body)
        .charset(state.charset)
        .build();

    let (tx, rx) = oneshot::channel();
    let response = ServerResponse::new(ChannelSink::new(tx), state.charset, has_body);
    state.mounts.dispatch(Bundle {
        charset: state.charset,
        request,
        response,
    });

    match rx.await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(path = %url, "Response dropped without end");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

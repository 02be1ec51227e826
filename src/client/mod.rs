//! Protocol-routing client.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor (or "scheme://..." shorthand)
//!     → descriptor.rs (parse target, encode text body)
//!     → switch on scheme
//!         file:   file.rs     (stat + read)
//!         loop:   loopback.rs (mount table dispatch, buffer sink)
//!         http:   remote.rs   (reqwest, gunzip/inflate)
//!         https:  remote.rs
//!         other:  500
//!     → Envelope { status, headers, body }
//! ```
//!
//! # Design Decisions
//! - Every path yields exactly one envelope; failures become 404/500 where detected
//! - No retries and no default timeout
//! - Bodies are fully buffered before the envelope is produced

pub mod descriptor;
pub mod envelope;
pub mod file;
pub mod loopback;
pub mod remote;

pub use descriptor::{RequestBody, RequestDescriptor, Scheme, Target};
pub use envelope::{Envelope, EnvelopeParts};

use axum::http::header::{ACCEPT_ENCODING, HOST, USER_AGENT};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use std::net::IpAddr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::codec::Charset;
use crate::config::RelayConfig;
use crate::mount::MountTable;
use crate::observability::metrics;
use crate::transport::ServerRequest;
use descriptor::merge_headers;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unknown charset: {0}")]
    Charset(String),

    #[error("invalid {0} header value")]
    Header(&'static str),

    #[error("invalid loopback address: {0}")]
    LoopbackAddress(String),

    #[error("http client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fetches resources over `file:`, `loop:`, `http:` and `https:`.
///
/// Cheap to clone; clones share the HTTP connection pool and mount table.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    charset: Charset,
    user_agent: HeaderValue,
    accept_encoding: HeaderValue,
    loopback_address: IpAddr,
    http: reqwest::Client,
    mount_table: OnceLock<Arc<dyn MountTable>>,
}

impl Client {
    pub fn new(config: &RelayConfig) -> Result<Self, ClientError> {
        let charset = Charset::from_label(&config.charset)
            .ok_or_else(|| ClientError::Charset(config.charset.clone()))?;
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| ClientError::Header("user-agent"))?;
        let accept_encoding = HeaderValue::from_str(&config.client.accept_encoding)
            .map_err(|_| ClientError::Header("accept-encoding"))?;
        let loopback_address = config
            .client
            .loopback_address
            .parse()
            .map_err(|_| ClientError::LoopbackAddress(config.client.loopback_address.clone()))?;

        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy();
        if let Some(secs) = config.client.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            inner: Arc::new(ClientInner {
                charset,
                user_agent,
                accept_encoding,
                loopback_address,
                http: builder.build()?,
                mount_table: OnceLock::new(),
            }),
        })
    }

    /// Attach the mount table used for `loop:` requests.
    ///
    /// Returns `false` if one was already attached. Steps registered in the
    /// table may hold this client, so the two usually live for the process.
    pub fn attach(&self, table: Arc<dyn MountTable>) -> bool {
        self.inner.mount_table.set(table).is_ok()
    }

    pub fn charset(&self) -> Charset {
        self.inner.charset
    }

    /// Fetch one resource. Always yields exactly one envelope.
    pub async fn request(&self, descriptor: impl Into<RequestDescriptor>) -> Envelope {
        let started = Instant::now();
        let descriptor = descriptor.into();

        let target = match Target::parse(&descriptor) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(href = ?descriptor.href, error = %e, "Unroutable request");
                metrics::record_client_request("invalid", 500, started);
                return Envelope::from(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let RequestDescriptor {
            method,
            headers,
            body,
            ..
        } = descriptor;
        let body = body.map(|b| b.into_bytes(self.inner.charset));

        let envelope = match &target.scheme {
            Scheme::File => file::fetch(target.url.path()).await,
            Scheme::Loop => {
                let headers = merge_headers(self.default_headers(&target, false), &headers);
                self.loopback(&target, method.unwrap_or(Method::GET), headers, body)
                    .await
            }
            Scheme::Http | Scheme::Https => {
                let headers = merge_headers(self.default_headers(&target, true), &headers);
                remote::fetch(
                    &self.inner.http,
                    &target,
                    method.unwrap_or(Method::GET),
                    headers,
                    body,
                )
                .await
            }
            Scheme::Other(scheme) => {
                tracing::warn!(scheme = %scheme, "Unsupported scheme");
                Envelope::from(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        tracing::debug!(
            scheme = %target.scheme,
            path = %target.path,
            status = envelope.status().as_u16(),
            "Request dispatched"
        );
        metrics::record_client_request(target.scheme.metric_label(), envelope.status().as_u16(), started);
        envelope
    }

    /// Fetch in a spawned task and hand the envelope to `callback` once.
    ///
    /// Must be called from within a Tokio runtime. A panic inside `callback`
    /// stays inside the spawned task.
    pub fn request_with<F>(&self, descriptor: impl Into<RequestDescriptor>, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Envelope) + Send + 'static,
    {
        let client = self.clone();
        let descriptor = descriptor.into();
        tokio::spawn(async move {
            let envelope = client.request(descriptor).await;
            callback(envelope);
        })
    }

    fn default_headers(&self, target: &Target, remote: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if remote {
            headers.insert(ACCEPT_ENCODING, self.inner.accept_encoding.clone());
        }
        if let Some(value) = target
            .host
            .as_deref()
            .and_then(|h| HeaderValue::from_str(h).ok())
        {
            headers.insert(HOST, value);
        }
        headers.insert(USER_AGENT, self.inner.user_agent.clone());
        headers
    }

    async fn loopback(
        &self,
        target: &Target,
        method: Method,
        headers: HeaderMap,
        body: Option<bytes::Bytes>,
    ) -> Envelope {
        let Some(table) = self.inner.mount_table.get() else {
            tracing::warn!(path = %target.path, "No mount table attached for loop: request");
            return Envelope::from(StatusCode::INTERNAL_SERVER_ERROR);
        };

        let request = ServerRequest::builder()
            .remote_addr(self.inner.loopback_address)
            .method(method)
            .headers(headers)
            .protocol("loop")
            .url(target.path.clone())
            .body(body.unwrap_or_default())
            .charset(self.inner.charset)
            .build();

        loopback::fetch(table.as_ref(), request, self.inner.charset).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("charset", &self.inner.charset)
            .field("mount_table", &self.inner.mount_table.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new(&RelayConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn unknown_scheme_is_500() {
        let envelope = client().request("ftp://files.test/a.txt").await;
        assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!envelope.has_body());
    }

    #[tokio::test]
    async fn unparsable_href_is_500() {
        let envelope = client().request("::: nope").await;
        assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn loop_without_mount_table_is_500() {
        let envelope = client().request("loop://app/").await;
        assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn callback_fires_once() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        client()
            .request_with("ftp://x/", move |envelope| {
                let _ = tx.send(envelope.status());
            })
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rejects_unknown_charset() {
        let mut config = RelayConfig::default();
        config.charset = "no-such-charset".into();
        assert!(matches!(Client::new(&config), Err(ClientError::Charset(_))));
    }
}

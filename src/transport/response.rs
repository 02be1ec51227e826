//! Outbound response handle and the sink trait it flushes into.

use axum::http::header::{AsHeaderName, IntoHeaderName};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::{Bytes, BytesMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::codec::Charset;

/// The write side of a transport.
///
/// `end` takes the sink by value: a transport can be finished only once.
pub trait TransportResponse: Send {
    fn write_head(&mut self, status: StatusCode, headers: HeaderMap);
    fn write(&mut self, chunk: Bytes);
    fn end(self: Box<Self>);
}

/// Response handle shared by every step of a pipeline run.
///
/// Writes accumulate in an internal buffer; [`ServerResponse::end`] flushes
/// status, headers and body into the sink once. Later mutations are ignored.
#[derive(Clone)]
pub struct ServerResponse {
    inner: Arc<Mutex<ResponseState>>,
    charset: Charset,
}

struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    has_body: bool,
    sink: Option<Box<dyn TransportResponse>>,
}

impl ServerResponse {
    /// Wrap a sink. `has_body` is false for HEAD requests.
    pub fn new<S>(sink: S, charset: Charset, has_body: bool) -> Self
    where
        S: TransportResponse + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(ResponseState {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: BytesMut::new(),
                has_body,
                sink: Some(Box::new(sink)),
            })),
            charset,
        }
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn status(&self, status: StatusCode) -> &Self {
        let mut state = self.state();
        if state.sink.is_some() {
            state.status = status;
        }
        self
    }

    /// Set a header, replacing any previous value.
    pub fn head<K, V>(&self, name: K, value: V) -> &Self
    where
        K: IntoHeaderName,
        V: TryInto<HeaderValue>,
    {
        let Ok(value): Result<HeaderValue, _> = value.try_into() else {
            tracing::warn!("Ignoring invalid response header value");
            return self;
        };
        let mut state = self.state();
        if state.sink.is_some() {
            state.headers.insert(name, value);
        }
        self
    }

    /// Add a header value without dropping existing ones.
    pub fn append_head<K, V>(&self, name: K, value: V) -> &Self
    where
        K: IntoHeaderName,
        V: TryInto<HeaderValue>,
    {
        let Ok(value): Result<HeaderValue, _> = value.try_into() else {
            tracing::warn!("Ignoring invalid response header value");
            return self;
        };
        let mut state = self.state();
        if state.sink.is_some() {
            state.headers.append(name, value);
        }
        self
    }

    pub fn remove_head<K: AsHeaderName>(&self, name: K) -> &Self {
        let mut state = self.state();
        if state.sink.is_some() {
            state.headers.remove(name);
        }
        self
    }

    /// Discard everything written so far.
    pub fn clear(&self) -> &Self {
        let mut state = self.state();
        if state.sink.is_some() {
            state.body.clear();
        }
        self
    }

    pub fn write(&self, data: impl AsRef<[u8]>) -> &Self {
        let mut state = self.state();
        if state.sink.is_some() {
            state.body.extend_from_slice(data.as_ref());
        } else {
            tracing::debug!("Write after end ignored");
        }
        self
    }

    /// Write text encoded with the response charset.
    pub fn write_text(&self, text: &str) -> &Self {
        let encoded = self.charset.encode(text);
        self.write(encoded)
    }

    /// Flush head and body into the sink. Only the first call has effect.
    pub fn end(&self) {
        let (sink, status, headers, body, has_body) = {
            let mut state = self.state();
            let Some(sink) = state.sink.take() else {
                tracing::debug!("Response already ended");
                return;
            };
            let body = std::mem::take(&mut state.body).freeze();
            (sink, state.status, state.headers.clone(), body, state.has_body)
        };

        // The sink runs outside the lock: it may wake tasks that read this response.
        let mut sink = sink;
        sink.write_head(status, headers);
        if has_body && !body.is_empty() {
            sink.write(body);
        }
        sink.end();
    }

    /// Write `text` and end.
    pub fn end_with(&self, text: &str) {
        self.write_text(text);
        self.end();
    }

    pub fn is_ended(&self) -> bool {
        self.state().sink.is_none()
    }

    pub fn status_code(&self) -> StatusCode {
        self.state().status
    }

    pub fn header(&self, name: &str) -> Option<HeaderValue> {
        self.state().headers.get(name).cloned()
    }

    /// Bytes buffered and not yet flushed.
    pub fn buffered(&self) -> Bytes {
        Bytes::copy_from_slice(&self.state().body)
    }
}

impl std::fmt::Debug for ServerResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ServerResponse")
            .field("status", &state.status)
            .field("headers", &state.headers)
            .field("buffered", &state.body.len())
            .field("ended", &state.sink.is_none())
            .finish()
    }
}

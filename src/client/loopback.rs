//! `loop:` backend: in-process dispatch through the mount table.
//!
//! The request never touches a socket. A synthetic request/response pair is
//! handed to the mount table, and whatever the dispatched handler writes into
//! the buffer-backed sink becomes the envelope.

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::{Bytes, BytesMut};
use tokio::sync::oneshot;

use crate::client::envelope::{Envelope, EnvelopeParts};
use crate::codec::Charset;
use crate::mount::{Bundle, MountTable};
use crate::transport::{ServerRequest, ServerResponse, TransportResponse};

/// Sink that records head and body and reports them on `end`.
pub struct BufferSink {
    status: Option<StatusCode>,
    headers: Option<HeaderMap>,
    body: Option<BytesMut>,
    done: oneshot::Sender<EnvelopeParts>,
}

impl BufferSink {
    pub fn new(done: oneshot::Sender<EnvelopeParts>) -> Self {
        Self {
            status: None,
            headers: None,
            body: None,
            done,
        }
    }
}

impl TransportResponse for BufferSink {
    fn write_head(&mut self, status: StatusCode, headers: HeaderMap) {
        self.status = Some(status);
        self.headers = Some(headers);
    }

    fn write(&mut self, chunk: Bytes) {
        self.body
            .get_or_insert_with(BytesMut::new)
            .extend_from_slice(&chunk);
    }

    fn end(self: Box<Self>) {
        let sink = *self;
        let parts = EnvelopeParts {
            status: sink.status.unwrap_or(StatusCode::OK),
            headers: sink.headers,
            body: sink.body.map(BytesMut::freeze),
        };
        if sink.done.send(parts).is_err() {
            tracing::debug!("Loopback caller went away before the response ended");
        }
    }
}

/// Dispatch `request` into `table` and wait for the response to end.
pub async fn fetch(table: &dyn MountTable, request: ServerRequest, charset: Charset) -> Envelope {
    let has_body = request.method() != Method::HEAD;
    let path = request.url().to_string();
    let (tx, rx) = oneshot::channel();
    let response = ServerResponse::new(BufferSink::new(tx), charset, has_body);

    table.dispatch(Bundle {
        charset,
        request,
        response,
    });

    match rx.await {
        Ok(parts) => Envelope::create(parts),
        Err(_) => {
            // Every handle to the response is gone and nobody ended it.
            tracing::warn!(path = %path, "Loopback response dropped without end");
            Envelope::from(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

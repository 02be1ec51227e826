//! Normalized response value returned by every backend.

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;

use crate::codec::Charset;

/// Fields accepted by [`Envelope::create`].
#[derive(Debug, Clone)]
pub struct EnvelopeParts {
    pub status: StatusCode,
    pub headers: Option<HeaderMap>,
    pub body: Option<Bytes>,
}

/// `{status, headers, body}`, immutable once built.
#[derive(Debug, Clone)]
pub struct Envelope {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Envelope {
    pub fn create(parts: EnvelopeParts) -> Self {
        Self {
            status: parts.status,
            headers: parts.headers.unwrap_or_default(),
            body: parts.body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body bytes; empty when the backend produced none.
    pub fn body(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn text(&self, charset: Charset) -> String {
        charset.decode(self.body())
    }

    pub fn into_parts(self) -> EnvelopeParts {
        EnvelopeParts {
            status: self.status,
            headers: Some(self.headers),
            body: self.body,
        }
    }
}

impl From<StatusCode> for Envelope {
    fn from(status: StatusCode) -> Self {
        Self::create(EnvelopeParts {
            status,
            headers: None,
            body: None,
        })
    }
}

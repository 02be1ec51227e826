//! Inbound request record.

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use std::net::IpAddr;
use std::sync::Arc;

use crate::codec::{urlencoded, Charset, FormData};

/// A request as seen by mount table handlers.
///
/// Immutable once built; clones share the same allocation.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    inner: Arc<RequestInner>,
}

#[derive(Debug)]
struct RequestInner {
    remote_addr: IpAddr,
    method: Method,
    headers: HeaderMap,
    protocol: String,
    url: String,
    body: Bytes,
    charset: Charset,
}

impl ServerRequest {
    pub fn builder() -> ServerRequestBuilder {
        ServerRequestBuilder::default()
    }

    pub fn remote_addr(&self) -> IpAddr {
        self.inner.remote_addr
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// First value of a header, if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Transport the request arrived on (`http`, `loop`).
    pub fn protocol(&self) -> &str {
        &self.inner.protocol
    }

    /// Request target as sent: path plus query.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn path(&self) -> &str {
        match self.inner.url.split_once('?') {
            Some((path, _)) => path,
            None => &self.inner.url,
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.inner.url.split_once('?').map(|(_, q)| q)
    }

    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    pub fn charset(&self) -> Charset {
        self.inner.charset
    }

    /// Body decoded with the request charset.
    pub fn text(&self) -> String {
        self.inner.charset.decode(&self.inner.body)
    }

    /// Body parsed as `application/x-www-form-urlencoded`.
    pub fn form(&self) -> FormData {
        urlencoded::parse(&self.inner.body, self.inner.charset)
    }
}

#[derive(Debug)]
pub struct ServerRequestBuilder {
    remote_addr: IpAddr,
    method: Method,
    headers: HeaderMap,
    protocol: String,
    url: String,
    body: Bytes,
    charset: Charset,
}

impl Default for ServerRequestBuilder {
    fn default() -> Self {
        Self {
            remote_addr: IpAddr::from([127, 0, 0, 1]),
            method: Method::GET,
            headers: HeaderMap::new(),
            protocol: "http".to_string(),
            url: "/".to_string(),
            body: Bytes::new(),
            charset: Charset::default(),
        }
    }
}

impl ServerRequestBuilder {
    pub fn remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = addr;
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn build(self) -> ServerRequest {
        ServerRequest {
            inner: Arc::new(RequestInner {
                remote_addr: self.remote_addr,
                method: self.method,
                headers: self.headers,
                protocol: self.protocol,
                url: self.url,
                body: self.body,
                charset: self.charset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_path_and_query() {
        let req = ServerRequest::builder().url("/a/b?x=1&y=2").build();
        assert_eq!(req.path(), "/a/b");
        assert_eq!(req.query(), Some("x=1&y=2"));

        let req = ServerRequest::builder().url("/plain").build();
        assert_eq!(req.path(), "/plain");
        assert_eq!(req.query(), None);
    }

    #[test]
    fn exposes_form_body() {
        let req = ServerRequest::builder()
            .method(Method::POST)
            .body(Bytes::from_static(b"a=1&b=two+words"))
            .build();
        let form = req.form();
        assert_eq!(form.get("a"), Some("1"));
        assert_eq!(form.get("b"), Some("two words"));
        assert_eq!(req.text(), "a=1&b=two+words");
    }
}

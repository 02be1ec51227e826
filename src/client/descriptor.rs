//! Request descriptors and target parsing.

use axum::http::header::IntoHeaderName;
use axum::http::{HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::codec::Charset;

/// Body of an outgoing request. Text is encoded with the client charset.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Bytes(Bytes),
    Text(String),
}

impl RequestBody {
    pub fn into_bytes(self, charset: Charset) -> Bytes {
        match self {
            RequestBody::Bytes(bytes) => bytes,
            RequestBody::Text(text) => charset.encode(&text),
        }
    }
}

/// What to fetch.
///
/// Either `href` or the `protocol`/`hostname`/`path` triple identifies the
/// target. An explicit `hostname` also overrides the host of `href` for
/// `http:` and `https:` connections.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    pub href: Option<String>,
    pub protocol: Option<String>,
    pub hostname: Option<String>,
    pub path: Option<String>,
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl RequestDescriptor {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: IntoHeaderName,
        V: TryInto<HeaderValue>,
    {
        match value.try_into() {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => tracing::warn!("Ignoring invalid request header value"),
        }
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Bytes(body.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(text.into()));
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }
}

impl From<&str> for RequestDescriptor {
    fn from(href: &str) -> Self {
        Self::new(href)
    }
}

impl From<String> for RequestDescriptor {
    fn from(href: String) -> Self {
        Self::new(href)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scheme {
    File,
    Loop,
    Http,
    Https,
    Other(String),
}

impl Scheme {
    fn parse(s: &str) -> Self {
        match s {
            "file" => Scheme::File,
            "loop" => Scheme::Loop,
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => Scheme::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Scheme::File => "file",
            Scheme::Loop => "loop",
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Other(s) => s,
        }
    }

    /// Bounded label for metrics; every unsupported scheme shares one value.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Scheme::File => "file",
            Scheme::Loop => "loop",
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Other(_) => "other",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("request has neither href nor protocol/hostname/path")]
    Missing,

    #[error("invalid href: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid hostname override: {0}")]
    Hostname(url::ParseError),
}

/// A parsed request target.
#[derive(Debug, Clone)]
pub struct Target {
    pub scheme: Scheme,
    /// `hostname[:port]` as written in the href; used for the `host` header.
    pub host: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    /// Path plus query.
    pub path: String,
    /// Connection URL, with any hostname override applied.
    pub url: Url,
}

impl Target {
    pub fn parse(descriptor: &RequestDescriptor) -> Result<Self, TargetError> {
        let href = match (&descriptor.href, &descriptor.protocol) {
            (Some(href), _) => href.clone(),
            (None, Some(protocol)) => format!(
                "{}://{}{}",
                protocol.trim_end_matches(':'),
                descriptor.hostname.as_deref().unwrap_or_default(),
                descriptor.path.as_deref().unwrap_or("/"),
            ),
            (None, None) => return Err(TargetError::Missing),
        };

        let mut url = Url::parse(&href)?;
        let scheme = Scheme::parse(url.scheme());
        let port = url.port();
        let host = url.host_str().map(|h| match port {
            Some(port) => format!("{h}:{port}"),
            None => h.to_string(),
        });

        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        if let Some(hostname) = &descriptor.hostname {
            if matches!(scheme, Scheme::Http | Scheme::Https) {
                url.set_host(Some(hostname)).map_err(TargetError::Hostname)?;
            }
        }
        let hostname = url.host_str().map(str::to_string);

        Ok(Self {
            scheme,
            host,
            hostname,
            port,
            path,
            url,
        })
    }
}

/// Overlay `overrides` on `defaults`; caller headers always win.
pub fn merge_headers(defaults: HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    let mut merged = defaults;
    for name in overrides.keys() {
        merged.remove(name);
    }
    for (name, value) in overrides {
        merged.append(name.clone(), value.clone());
    }
    merged
}

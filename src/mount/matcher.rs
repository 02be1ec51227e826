//! Request matching for mounts.

use crate::transport::ServerRequest;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &ServerRequest) -> bool;
}

/// Matches the Host header, with or without a port suffix.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &ServerRequest) -> bool {
        let Some(host) = req.header("host") else {
            return false;
        };
        let host = host.to_lowercase();
        if host == self.expected_host {
            return true;
        }
        match host.rsplit_once(':') {
            Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => {
                name == self.expected_host
            }
            _ => false,
        }
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &ServerRequest) -> bool {
        req.path().starts_with(&self.prefix)
    }
}

/// Combines multiple matchers with AND semantics. Empty matches everything.
#[derive(Debug, Default)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    pub fn push(&mut self, matcher: Box<dyn Matcher>) {
        self.matchers.push(matcher);
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &ServerRequest) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn with_host(host: &'static str) -> ServerRequest {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static(host));
        ServerRequest::builder().headers(headers).build()
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");
        assert!(matcher.matches(&with_host("example.com")));
        assert!(matcher.matches(&with_host("EXAMPLE.COM")));
        assert!(matcher.matches(&with_host("example.com:8080")));
        assert!(!matcher.matches(&with_host("other.com")));
        assert!(!matcher.matches(&ServerRequest::builder().build()));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");
        assert!(matcher.matches(&ServerRequest::builder().url("/api/v1?x=1").build()));
        assert!(!matcher.matches(&ServerRequest::builder().url("/images").build()));
        assert!(!matcher.matches(&ServerRequest::builder().url("/API").build()));
    }

    #[test]
    fn test_and_matcher() {
        let matcher = AndMatcher::new(vec![
            Box::new(HostMatcher::new("app")),
            Box::new(PathPrefixMatcher::new("/admin")),
        ]);
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("app"));
        let hit = ServerRequest::builder().headers(headers.clone()).url("/admin/x").build();
        let miss = ServerRequest::builder().headers(headers).url("/public").build();
        assert!(matcher.matches(&hit));
        assert!(!matcher.matches(&miss));
        assert!(AndMatcher::default().matches(&miss));
    }
}

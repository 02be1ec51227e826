//! Reusable steps.

use axum::http::header::{ACCEPT_ENCODING, CONTENT_LENGTH, HOST};
use axum::http::HeaderMap;

use crate::client::{Client, RequestDescriptor};
use crate::pipeline::{Context, Next, Step, StepResult};

/// Fetches `<upstream><request url>` and copies the envelope into the response.
///
/// The fetch runs in a spawned task; the step resumes the pipeline from the
/// client callback, so the next step sees the fetched status, headers and body.
#[derive(Debug, Clone)]
pub struct Fetch {
    client: Client,
    upstream: String,
}

impl Fetch {
    pub fn new(client: Client, upstream: impl Into<String>) -> Self {
        Self {
            client,
            upstream: upstream.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn href_for(&self, url: &str) -> String {
        format!("{}{}", self.upstream, url)
    }
}

impl Step for Fetch {
    fn call(&self, ctx: &Context, next: Next) -> StepResult {
        let request = ctx.request();
        let href = self.href_for(request.url());
        tracing::debug!(href = %href, "Fetching upstream");

        let descriptor = RequestDescriptor::new(href)
            .method(request.method().clone())
            .headers(forwarded_headers(request.headers()))
            .body(request.body().clone());

        let ctx = ctx.clone();
        self.client.request_with(descriptor, move |envelope| {
            let response = ctx.response();
            response.status(envelope.status());
            let copied = copied_headers(envelope.headers());
            for name in copied.keys() {
                response.remove_head(name);
            }
            for (name, value) in &copied {
                response.append_head(name.clone(), value.clone());
            }
            response.write(envelope.body());
            next.resume();
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "fetch"
    }
}

/// Connection-scoped headers, never carried across a hop.
const HOP_HEADERS: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn without_hop_headers(headers: &HeaderMap) -> HeaderMap {
    let mut stripped = headers.clone();
    for name in HOP_HEADERS {
        stripped.remove(name);
    }
    stripped.remove(CONTENT_LENGTH);
    stripped
}

// The client sets its own host/accept-encoding and decodes bodies itself.
fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = without_hop_headers(headers);
    forwarded.remove(HOST);
    forwarded.remove(ACCEPT_ENCODING);
    forwarded
}

// The envelope body is fully buffered and later steps may append to it,
// so framing is left to the sink.
fn copied_headers(headers: &HeaderMap) -> HeaderMap {
    without_hop_headers(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;

    #[test]
    fn joins_upstream_and_url() {
        let client = Client::new(&RelayConfig::default()).unwrap();
        let fetch = Fetch::new(client, "http://backend:9000/base/");
        assert_eq!(fetch.href_for("/x?y=1"), "http://backend:9000/base/x?y=1");
    }

    #[test]
    fn strips_hop_and_encoding_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, "front".parse().unwrap());
        headers.insert(ACCEPT_ENCODING, "br".parse().unwrap());
        headers.insert("x-keep", "1".parse().unwrap());
        let forwarded = forwarded_headers(&headers);
        assert!(forwarded.get(HOST).is_none());
        assert!(forwarded.get(ACCEPT_ENCODING).is_none());
        assert_eq!(forwarded.get("x-keep").unwrap(), "1");
    }

    #[test]
    fn copied_response_headers_drop_framing() {
        let mut headers = HeaderMap::new();
        headers.insert("transfer-encoding", "chunked".parse().unwrap());
        headers.insert("connection", "keep-alive".parse().unwrap());
        headers.insert("keep-alive", "timeout=5".parse().unwrap());
        headers.insert(CONTENT_LENGTH, "11".parse().unwrap());
        headers.append("set-cookie", "a=1".parse().unwrap());
        headers.append("set-cookie", "b=2".parse().unwrap());

        let copied = copied_headers(&headers);
        assert_eq!(copied.len(), 2);
        assert_eq!(copied.get_all("set-cookie").iter().count(), 2);
    }
}

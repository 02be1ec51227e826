//! `http:` / `https:` backend.

use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;

use crate::client::descriptor::Target;
use crate::client::envelope::{Envelope, EnvelopeParts};
use crate::codec::decompress;

/// Send one request, buffer the whole response and decode its body.
///
/// Any transport or decoding failure collapses to a bare 500.
pub async fn fetch(
    http: &reqwest::Client,
    target: &Target,
    method: Method,
    headers: HeaderMap,
    body: Option<Bytes>,
) -> Envelope {
    let mut request = http.request(method, target.url.clone()).headers(headers);
    if let Some(body) = body {
        request = request.body(body);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(url = %target.url, error = %e, "Upstream request failed");
            return Envelope::from(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let status = response.status();
    let mut headers = response.headers().clone();
    let raw = match response.bytes().await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(url = %target.url, error = %e, "Upstream body read failed");
            return Envelope::from(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let encoding = headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = match decompress(raw, encoding.as_deref()).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(url = %target.url, error = %e, "Upstream body decode failed");
            return Envelope::from(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    // Length and coding describe the wire body, not the decoded one.
    headers.remove(CONTENT_LENGTH);
    headers.remove(CONTENT_ENCODING);

    Envelope::create(EnvelopeParts {
        status,
        headers: Some(headers),
        body: Some(body),
    })
}

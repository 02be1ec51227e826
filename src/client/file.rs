//! `file:` backend.

use axum::http::header::{CONTENT_LENGTH, LAST_MODIFIED};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use std::time::SystemTime;
use tokio::fs;

use crate::client::envelope::{Envelope, EnvelopeParts};

/// Read a whole file into an envelope.
///
/// Missing path → 404, anything other than a regular file or a failed read → 500.
pub async fn fetch(url_path: &str) -> Envelope {
    let decoded = percent_decode_str(url_path).decode_utf8_lossy();
    let path = strip_drive_prefix(&decoded);

    let metadata = match fs::metadata(path).await {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(path = %path, error = %e, "File not found");
            return Envelope::from(StatusCode::NOT_FOUND);
        }
    };

    if !metadata.is_file() {
        tracing::warn!(path = %path, "Not a regular file");
        return Envelope::from(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let data = match fs::read(path).await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "File read failed");
            return Envelope::from(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    if let Some(value) = metadata.modified().ok().and_then(http_date) {
        headers.insert(LAST_MODIFIED, value);
    }

    Envelope::create(EnvelopeParts {
        status: StatusCode::OK,
        headers: Some(headers),
        body: Some(Bytes::from(data)),
    })
}

/// `/C:/dir/file` → `C:/dir/file`; Windows absolute paths arrive in URL form
/// with a leading slash.
pub fn strip_drive_prefix(path: &str) -> &str {
    let bytes = path.as_bytes();
    let is_drive = bytes.len() >= 3
        && bytes[0] == b'/'
        && (bytes[1].is_ascii_alphanumeric() || bytes[1] == b'_')
        && bytes[2] == b':';
    if is_drive {
        &path[1..]
    } else {
        path
    }
}

fn http_date(time: SystemTime) -> Option<HeaderValue> {
    let formatted = DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    HeaderValue::from_str(&formatted).ok()
}

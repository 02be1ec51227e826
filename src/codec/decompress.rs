//! Content decompression for fetched bodies.
//!
//! Only the two encodings advertised in `accept-encoding` are recognized.
//! Decoding runs on the blocking pool so large bodies do not stall the
//! reactor.

use bytes::Bytes;
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecompressError {
    #[error("corrupt {encoding} stream: {source}")]
    Corrupt {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("decompression task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Content codings understood by [`decompress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coding {
    Gzip,
    Deflate,
    Identity,
}

impl Coding {
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("gzip") => Coding::Gzip,
            Some(v) if v.eq_ignore_ascii_case("deflate") => Coding::Deflate,
            _ => Coding::Identity,
        }
    }
}

/// Decode `data` according to a `content-encoding` value.
///
/// Unknown or absent encodings pass the bytes through untouched.
pub async fn decompress(data: Bytes, encoding: Option<&str>) -> Result<Bytes, DecompressError> {
    let coding = Coding::from_header(encoding);
    if coding == Coding::Identity {
        return Ok(data);
    }
    tokio::task::spawn_blocking(move || decode(coding, &data)).await?
}

fn decode(coding: Coding, data: &[u8]) -> Result<Bytes, DecompressError> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let (result, encoding) = match coding {
        Coding::Gzip => (GzDecoder::new(data).read_to_end(&mut out), "gzip"),
        Coding::Deflate => (ZlibDecoder::new(data).read_to_end(&mut out), "deflate"),
        Coding::Identity => return Ok(Bytes::copy_from_slice(data)),
    };
    result.map_err(|source| DecompressError::Corrupt { encoding, source })?;
    Ok(Bytes::from(out))
}

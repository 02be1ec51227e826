//! Text encoding for request and response bodies.

use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use std::fmt;

/// A resolved character set.
///
/// Keeps the label it was configured with so that `content-type` headers echo
/// what the operator wrote (`utf-8`, `gbk`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    encoding: &'static Encoding,
    label: &'static str,
}

impl Charset {
    /// Resolve a WHATWG encoding label. Returns `None` for unknown labels.
    pub fn from_label(label: &str) -> Option<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes())?;
        Some(Self {
            encoding,
            label: canonical_label(encoding),
        })
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Encode text into bytes.
    pub fn encode(&self, text: &str) -> Bytes {
        let (bytes, _, _) = self.encoding.encode(text);
        Bytes::copy_from_slice(&bytes)
    }

    /// Decode bytes into text, replacing malformed sequences.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, _) = self.encoding.decode_without_bom_handling(bytes);
        text.into_owned()
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self {
            encoding: UTF_8,
            label: "utf-8",
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

// encoding_rs names are upper-case ("UTF-8", "GBK"); headers conventionally
// carry the lower-case form.
fn canonical_label(encoding: &'static Encoding) -> &'static str {
    match encoding.name() {
        "UTF-8" => "utf-8",
        "GBK" => "gbk",
        "gb18030" => "gb18030",
        "Big5" => "big5",
        "Shift_JIS" => "shift_jis",
        "EUC-JP" => "euc-jp",
        "EUC-KR" => "euc-kr",
        "windows-1252" => "windows-1252",
        "UTF-16LE" => "utf-16le",
        "UTF-16BE" => "utf-16be",
        other => other,
    }
}

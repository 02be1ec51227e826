//! Byte-level codecs shared by the client and the transport layer.
//!
//! # Data Flow
//! ```text
//! text body ──charset.rs──▶ bytes ──▶ backend
//! backend bytes ──decompress.rs (gzip/deflate)──▶ envelope body
//! form body ──urlencoded.rs──▶ FormData
//! ```

pub mod charset;
pub mod decompress;
pub mod urlencoded;

pub use charset::Charset;
pub use decompress::{decompress, DecompressError};
pub use urlencoded::FormData;

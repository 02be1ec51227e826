//! Inbound HTTP adapter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, trace layer)
//!     → ServerRequest + ServerResponse(ChannelSink)
//!     → mount table dispatch → pipeline
//!     → ChannelSink::end → axum Response → client
//! ```

pub mod server;

pub use server::{ChannelSink, HttpServer, ServerError};

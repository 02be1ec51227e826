//! Request/response value objects seen by pipeline steps.
//!
//! # Data Flow
//! ```text
//! inbound socket (http::server) ─┐
//!                                ├─▶ ServerRequest + ServerResponse ──▶ mount table ──▶ pipeline
//! loop: request (client)       ──┘
//!
//! ServerResponse::end()
//!     → TransportResponse::write_head / write / end
//!     → ChannelSink (socket) or BufferSink (loopback)
//! ```
//!
//! # Design Decisions
//! - Steps only see the `TransportResponse` trait, never the concrete sink
//! - Response body is buffered until `end()`; one flush per response
//! - Handles are `Clone` and share state, so every step writes to the same buffer

pub mod request;
pub mod response;

pub use request::ServerRequest;
pub use response::{ServerResponse, TransportResponse};

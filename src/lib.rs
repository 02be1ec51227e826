//! Request dispatch and pipeline execution core.
//!
//! - [`pipeline`]: ordered steps over a shared context, with a fault boundary
//! - [`client`]: one envelope per request over `file:`, `loop:`, `http:`, `https:`
//! - [`mount`]: the table `loop:` requests and inbound HTTP requests dispatch into

pub mod client;
pub mod codec;
pub mod config;
pub mod http;
pub mod mount;
pub mod observability;
pub mod pipeline;
pub mod transport;

pub use client::{Client, Envelope, RequestDescriptor};
pub use config::RelayConfig;
pub use http::HttpServer;
pub use mount::{Bundle, Mount, MountTable, Mounts};
pub use pipeline::{Context, Next, Pipeline, PipelineConfig, Step};

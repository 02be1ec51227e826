//! Mount table: maps internal and inbound requests to pipelines.
//!
//! # Data Flow
//! ```text
//! Bundle { charset, request, response }
//!     → table.rs (first mount whose matcher accepts the request)
//!     → matcher.rs (host + path prefix, AND semantics)
//!     → Pipeline::run(mount.pipe, Context)
//!     → no mount: 404 text/plain
//! ```
//!
//! # Design Decisions
//! - Mounts sorted by priority once, immutable while serving
//! - Host matching is case-insensitive, path prefix matching is not
//! - Each dispatch gets a fresh pipeline run and context

pub mod matcher;
pub mod table;

pub use table::{Bundle, Mount, MountTable, Mounts};

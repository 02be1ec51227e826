//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! client, pipeline, server produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Pipeline run IDs flow through every log line of a run
//! - Metrics are cheap (atomic increments); no-ops until a recorder is installed

pub mod logging;
pub mod metrics;

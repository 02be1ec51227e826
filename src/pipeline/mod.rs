//! Pipeline executor.
//!
//! # Data Flow
//! ```text
//! PipelineConfig { pipe: [A, B, ...], context }
//!     → Pipeline::run appends Finalize
//!     → advance(): cursor i → pipe[i](context, Next)
//!         step calls next.resume()  → advance again (now or from a callback)
//!         step ends the response    → run is done, nothing else fires
//!         step fails (Err / panic)  → 500 text/plain, chain halts
//!     → Finalize: context.response.end()
//! ```
//!
//! # Known limits
//! - Only synchronous faults are contained. A task a step spawned after it
//!   returned owns its own failures.
//! - There is no step timeout. A step that neither resumes nor ends the
//!   response leaves the run pending forever.

pub mod context;
pub mod executor;
pub mod steps;

pub use context::Context;
pub use executor::{step, BoxError, Next, Pipeline, PipelineConfig, PipelineState, Step, StepResult};

//! Chain driver with a synchronous fault boundary.
//!
//! # States
//! - Running(i): step `i - 1` was the last one invoked
//! - ErrorTerminated: a step failed, response forced to 500
//! - NormalTerminated: the terminal step ended the response
//!
//! # State Transitions
//! ```text
//! Running(i) → Running(i+1): step resumes
//! Running(i) → ErrorTerminated: step returns Err or panics
//! Running(n) → NormalTerminated: Finalize returns
//! Running(i) → NormalTerminated: a step ended the response itself
//! ```
//! Both terminal states are absorbing.

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::PipelineSettings;
use crate::observability::metrics;
use crate::pipeline::Context;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of one step invocation. `Err` trips the fault boundary.
pub type StepResult = Result<(), BoxError>;

/// One handler in the chain.
pub trait Step: Send + Sync {
    fn call(&self, ctx: &Context, next: Next) -> StepResult;

    /// Label used in fault logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Step for F
where
    F: Fn(&Context, Next) -> StepResult + Send + Sync,
{
    fn call(&self, ctx: &Context, next: Next) -> StepResult {
        self(ctx, next)
    }

    fn name(&self) -> &str {
        "fn"
    }
}

/// Box a closure as a step.
pub fn step<F>(f: F) -> Arc<dyn Step>
where
    F: Fn(&Context, Next) -> StepResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Input of [`Pipeline::run`].
pub struct PipelineConfig {
    pub pipe: Vec<Arc<dyn Step>>,
    pub context: Context,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running(usize),
    ErrorTerminated,
    NormalTerminated,
}

const RUNNING: u8 = 0;
const ERROR_TERMINATED: u8 = 1;
const NORMAL_TERMINATED: u8 = 2;

struct Inner {
    id: Uuid,
    pipe: Vec<Arc<dyn Step>>,
    context: Context,
    cursor: AtomicUsize,
    outcome: AtomicU8,
    error_message: String,
}

/// Handle to a running (or finished) pipeline.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

impl Pipeline {
    /// Start a run with the default fault message.
    pub fn run(config: PipelineConfig) -> Self {
        Self::run_with(config, &PipelineSettings::default())
    }

    /// Append the terminal step and invoke the first step.
    pub fn run_with(config: PipelineConfig, settings: &PipelineSettings) -> Self {
        let PipelineConfig { mut pipe, context } = config;
        pipe.push(Arc::new(Finalize));

        let inner = Arc::new(Inner {
            id: Uuid::new_v4(),
            pipe,
            context,
            cursor: AtomicUsize::new(0),
            outcome: AtomicU8::new(RUNNING),
            error_message: settings.error_message.clone(),
        });

        tracing::debug!(
            run_id = %inner.id,
            steps = inner.pipe.len(),
            path = %inner.context.request().path(),
            "Pipeline started"
        );
        metrics::record_pipeline_run();

        advance(&inner);
        Self { inner }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Current state. A step that ends the response synchronously finishes
    /// the run; one that ends it from a spawned task is seen as finished on
    /// its next `resume`, and reports `Running` until then.
    pub fn state(&self) -> PipelineState {
        match self.inner.outcome.load(Ordering::SeqCst) {
            ERROR_TERMINATED => PipelineState::ErrorTerminated,
            NORMAL_TERMINATED => PipelineState::NormalTerminated,
            _ => PipelineState::Running(self.inner.cursor.load(Ordering::SeqCst)),
        }
    }

    pub fn context(&self) -> &Context {
        &self.inner.context
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Resume capability handed to each step.
///
/// Consumed by [`Next::resume`]; dropping it without resuming leaves the run
/// waiting on whoever ends the response.
pub struct Next {
    inner: Arc<Inner>,
}

impl Next {
    pub fn resume(self) {
        advance(&self.inner);
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("run_id", &self.inner.id).finish()
    }
}

/// Ends the response once every authored step has resumed.
struct Finalize;

impl Step for Finalize {
    fn call(&self, ctx: &Context, _next: Next) -> StepResult {
        ctx.response().end();
        Ok(())
    }

    fn name(&self) -> &str {
        "finalize"
    }
}

fn advance(inner: &Arc<Inner>) {
    if inner.outcome.load(Ordering::SeqCst) != RUNNING {
        return;
    }
    // Ended from a task before resuming: nothing left for later steps to send.
    if inner.context.response().is_ended() {
        finish(inner);
        return;
    }

    let len = inner.pipe.len();
    // Consume the slot before calling, so a step resuming synchronously
    // lands on the following index.
    let Ok(index) = inner
        .cursor
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| (i < len).then_some(i + 1))
    else {
        return;
    };

    let step = &inner.pipe[index];
    let next = Next {
        inner: Arc::clone(inner),
    };

    let result = panic::catch_unwind(AssertUnwindSafe(|| step.call(&inner.context, next)));
    let fault = match result {
        Ok(Ok(())) => {
            if index + 1 == len || inner.context.response().is_ended() {
                finish(inner);
            }
            return;
        }
        Ok(Err(e)) => e.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };

    fail(inner, index, step.name(), &fault);
}

fn finish(inner: &Inner) {
    if inner
        .outcome
        .compare_exchange(RUNNING, NORMAL_TERMINATED, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        tracing::debug!(run_id = %inner.id, "Pipeline finished");
    }
}

fn fail(inner: &Inner, index: usize, name: &str, fault: &str) {
    tracing::error!(
        run_id = %inner.id,
        step = index,
        step_name = name,
        error = %fault,
        "Pipe function failed"
    );
    metrics::record_pipeline_fault();
    let _ = inner.outcome.compare_exchange(
        RUNNING,
        ERROR_TERMINATED,
        Ordering::SeqCst,
        Ordering::SeqCst,
    );

    let response = inner.context.response();
    if response.is_ended() {
        tracing::warn!(run_id = %inner.id, step = index, "Response already ended, fault not reported to client");
        return;
    }

    let content_type = format!("text/plain; charset={}", response.charset());
    response
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .head(CONTENT_TYPE, content_type)
        .clear()
        .end_with(&inner.error_message);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: <non-string payload>".to_string()
    }
}

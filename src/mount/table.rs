//! Mount table capability and the prefix-table implementation.

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use std::sync::Arc;

use crate::client::Client;
use crate::codec::Charset;
use crate::config::{MountConfig, PipelineSettings};
use crate::mount::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};
use crate::pipeline::steps::Fetch;
use crate::pipeline::{Context, Pipeline, PipelineConfig, Step};
use crate::transport::{ServerRequest, ServerResponse};

/// Everything a mount table needs to serve one request.
#[derive(Debug)]
pub struct Bundle {
    pub charset: Charset,
    pub request: ServerRequest,
    pub response: ServerResponse,
}

/// Routes a request to a handler and drives it until the response ends.
///
/// Shared across concurrent dispatches, so implementations must be `Sync`.
pub trait MountTable: Send + Sync {
    fn dispatch(&self, bundle: Bundle);
}

/// A named pipeline guarded by host/path conditions.
pub struct Mount {
    name: String,
    priority: u32,
    matcher: AndMatcher,
    pipe: Vec<Arc<dyn Step>>,
}

impl Mount {
    pub fn new(name: impl Into<String>, pipe: Vec<Arc<dyn Step>>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            matcher: AndMatcher::default(),
            pipe,
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.matcher.push(Box::new(HostMatcher::new(host)));
        self
    }

    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.matcher.push(Box::new(PathPrefixMatcher::new(prefix)));
        self
    }

    /// Higher priority is checked first.
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered mounts; first match wins.
pub struct Mounts {
    mounts: Vec<Mount>,
    settings: PipelineSettings,
}

impl Mounts {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            mounts: Vec::new(),
            settings,
        }
    }

    /// Build `Fetch` mounts from configuration.
    pub fn from_config(mounts: &[MountConfig], settings: PipelineSettings, client: &Client) -> Self {
        let mut table = Self::new(settings);
        for config in mounts {
            let fetch: Arc<dyn Step> = Arc::new(Fetch::new(client.clone(), config.upstream.clone()));
            let mut mount = Mount::new(config.name.clone(), vec![fetch]).priority(config.priority);
            if let Some(host) = &config.host {
                mount = mount.host(host.clone());
            }
            if let Some(prefix) = &config.path_prefix {
                mount = mount.path_prefix(prefix.clone());
            }
            table.add(mount);
        }
        table
    }

    /// Insert keeping priority order; equal priorities keep insertion order.
    pub fn add(&mut self, mount: Mount) -> &mut Self {
        let at = self
            .mounts
            .iter()
            .position(|m| m.priority < mount.priority)
            .unwrap_or(self.mounts.len());
        tracing::debug!(mount = %mount.name, priority = mount.priority, "Mount registered");
        self.mounts.insert(at, mount);
        self
    }

    pub fn match_request(&self, req: &ServerRequest) -> Option<&Mount> {
        self.mounts.iter().find(|m| m.matcher.matches(req))
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

impl MountTable for Mounts {
    fn dispatch(&self, bundle: Bundle) {
        let Bundle {
            charset,
            request,
            response,
        } = bundle;

        let Some(mount) = self.match_request(&request) else {
            tracing::debug!(path = %request.path(), "No mount matched");
            response
                .status(StatusCode::NOT_FOUND)
                .head(CONTENT_TYPE, format!("text/plain; charset={charset}"))
                .end_with("Not Found");
            return;
        };

        tracing::debug!(mount = %mount.name, path = %request.path(), "Dispatching");
        Pipeline::run_with(
            PipelineConfig {
                pipe: mount.pipe.clone(),
                context: Context::new(request, response, charset),
            },
            &self.settings,
        );
    }
}

//! Per-run shared context.

use axum::http::Extensions;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::codec::Charset;
use crate::transport::{ServerRequest, ServerResponse};

/// State shared by every step of one pipeline run.
///
/// Request and response are fixed at construction. Steps attach their own
/// data through the typed extension slots.
#[derive(Clone, Debug)]
pub struct Context {
    request: ServerRequest,
    response: ServerResponse,
    charset: Charset,
    extensions: Arc<Mutex<Extensions>>,
}

impl Context {
    pub fn new(request: ServerRequest, response: ServerResponse, charset: Charset) -> Self {
        Self {
            request,
            response,
            charset,
            extensions: Arc::new(Mutex::new(Extensions::new())),
        }
    }

    pub fn request(&self) -> &ServerRequest {
        &self.request
    }

    pub fn response(&self) -> &ServerResponse {
        &self.response
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    fn extensions(&self) -> MutexGuard<'_, Extensions> {
        self.extensions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a value, returning the one it replaced.
    pub fn insert<T: Clone + Send + Sync + 'static>(&self, value: T) -> Option<T> {
        self.extensions().insert(value)
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.extensions().get::<T>().cloned()
    }

    pub fn remove<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.extensions().remove::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::response::testing::RecordingSink;

    #[derive(Debug, Clone, PartialEq)]
    struct User(&'static str);

    #[test]
    fn extensions_are_shared_between_clones() {
        let ctx = Context::new(
            ServerRequest::builder().build(),
            ServerResponse::new(RecordingSink::default(), Charset::default(), true),
            Charset::default(),
        );
        let other = ctx.clone();
        assert_eq!(ctx.insert(User("ann")), None);
        assert_eq!(other.get::<User>(), Some(User("ann")));
        assert_eq!(other.insert(User("bob")), Some(User("ann")));
        assert_eq!(ctx.remove::<User>(), Some(User("bob")));
        assert_eq!(ctx.get::<User>(), None);
    }
}

//! Request and response interception.
//!
//! # Design
//! An interceptor has two fixed hook points. `before_dispatch` receives the
//! compiled request by value and returns the request to send, which may be a
//! modified or entirely new value; nothing is shared between calls.
//! `after_dispatch` receives the still-unevaluated response future and
//! returns another one, so response-side effects such as logging or error
//! mapping run only when the caller awaits.
//!
//! A `Pipeline` applies interceptors in registration order on both sides:
//! the first registered interceptor sees the request first and wraps the
//! response future first (its wrapper is innermost). Errors are not caught
//! between stages.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};

use crate::dispatch::{Response, ResponseFuture};
use crate::error::Error;
use crate::http::HttpRequest;

pub trait Interceptor: Send + Sync {
    fn before_dispatch(&self, request: HttpRequest) -> Result<HttpRequest, Error> {
        Ok(request)
    }

    fn after_dispatch(&self, response: ResponseFuture) -> ResponseFuture {
        response
    }
}

/// Ordered chain of interceptors.
#[derive(Clone, Default)]
pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.push(Arc::new(interceptor));
        self
    }

    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn before_dispatch(&self, request: HttpRequest) -> Result<HttpRequest, Error> {
        self.interceptors
            .iter()
            .try_fold(request, |request, interceptor| interceptor.before_dispatch(request))
    }

    pub fn after_dispatch(&self, response: ResponseFuture) -> ResponseFuture {
        self.interceptors
            .iter()
            .fold(response, |response, interceptor| interceptor.after_dispatch(response))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// Logs each outbound request and the outcome of its response.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInterceptor;

impl Interceptor for TracingInterceptor {
    fn before_dispatch(&self, request: HttpRequest) -> Result<HttpRequest, Error> {
        info!(
            method = %request.method,
            url = %request.url,
            query_params = request.query.len(),
            has_body = request.body.is_some(),
            "dispatching request"
        );
        Ok(request)
    }

    fn after_dispatch(&self, response: ResponseFuture) -> ResponseFuture {
        async move {
            let result = response.await;
            match &result {
                Ok(response) => info!(status = response.status, "response received"),
                Err(err) => warn!(error = %err, "request failed"),
            }
            result
        }
        .boxed()
    }
}

/// Turns non-2xx responses into errors: 404 becomes `Error::NotFound`,
/// anything else `Error::Status` carrying the body text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCheck;

impl Interceptor for StatusCheck {
    fn after_dispatch(&self, response: ResponseFuture) -> ResponseFuture {
        async move { check_status(response.await?) }.boxed()
    }
}

pub fn check_status(response: Response) -> Result<Response, Error> {
    if response.is_success() {
        return Ok(response);
    }
    if response.status == 404 {
        return Err(Error::NotFound);
    }
    Err(Error::Status {
        status: response.status,
        body: response.text(),
    })
}

//! Hands compiled requests to the transport and decodes responses.
//!
//! # Design
//! `Dispatcher::dispatch` returns a boxed future and does nothing until it is
//! awaited: the transport is called at most once, when the future is first
//! polled. Decoding happens inside the same future, before any response
//! interceptor sees the result, so a malformed payload surfaces as
//! `Error::Parse` from the awaited response rather than from `dispatch`.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse};

/// The network collaborator. Implementations must send the request exactly
/// as compiled: method, URL, headers, query pairs, and body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}

/// A deferred response. Awaiting it performs the I/O.
pub type ResponseFuture = BoxFuture<'static, Result<Response, Error>>;

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Payload as received.
    Raw(String),
    /// Payload decoded because the operation produces JSON.
    Json(Value),
}

/// Response as seen by interceptors and callers.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body as text. Decoded JSON is re-encoded compactly.
    pub fn text(&self) -> String {
        match &self.body {
            ResponseBody::Raw(text) => text.clone(),
            ResponseBody::Json(value) => value.to_string(),
        }
    }

    /// Decodes the body into `T`, whether or not it was already parsed.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, Error> {
        match self.body {
            ResponseBody::Json(value) => serde_json::from_value(value).map_err(Error::Parse),
            ResponseBody::Raw(text) => serde_json::from_str(&text).map_err(Error::Parse),
        }
    }
}

/// Parses a JSON payload. An empty (or all-whitespace) payload decodes to
/// `null` so bodiless replies such as 204 or HEAD stay usable.
pub fn decode_json(payload: &str) -> Result<Value, Error> {
    if payload.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(payload).map_err(Error::Parse)
}

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn dispatch(&self, request: HttpRequest, produces_json: bool) -> ResponseFuture {
        let transport = Arc::clone(&self.transport);
        async move {
            let raw = transport.send(request).await?;
            debug!(status = raw.status, produces_json, "transport returned response");
            let body = if produces_json {
                ResponseBody::Json(decode_json(&raw.body)?)
            } else {
                ResponseBody::Raw(raw.body)
            };
            Ok(Response {
                status: raw.status,
                headers: raw.headers,
                body,
            })
        }
        .boxed()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

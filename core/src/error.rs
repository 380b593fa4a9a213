//! Error types for declaring operations and executing calls.
//!
//! # Design
//! Two enums, split by when they can happen. `DeclarationError` is raised
//! while the registry is being populated and points at a broken declaration.
//! `Error` covers everything at call time: failures before dispatch come back
//! synchronously from `Client::call`, failures after dispatch (transport,
//! response decoding, status mapping) come out of the response future.

use thiserror::Error;

use crate::operation::ParamRole;

/// Boxed error from a collaborator whose concrete type we do not know.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while compiling, dispatching, or decoding a call.
#[derive(Debug, Error)]
pub enum Error {
    /// A body or composite query value could not be encoded to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The response payload could not be decoded.
    #[error("deserialization failed: {0}")]
    Parse(#[source] serde_json::Error),

    /// Whatever the transport raised, unchanged.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// No operation with a route is registered under this id.
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    /// Strict mode only: a binding points past the end of the argument list.
    #[error("operation `{operation}` has no argument at position {position}")]
    MissingArgument { operation: String, position: usize },

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// An interceptor rejected the call.
    #[error("interceptor failed: {0}")]
    Interceptor(#[source] BoxError),
}

impl Error {
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Error::Transport(err.into())
    }

    pub fn interceptor(err: impl Into<BoxError>) -> Self {
        Error::Interceptor(err.into())
    }
}

/// Errors raised while registering operations and bindings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("operation `{operation}` declares a second body parameter at position {position}")]
    DuplicateBody { operation: String, position: usize },

    #[error("operation `{operation}`: {role:?} binding at position {position} has no key")]
    MissingKey {
        operation: String,
        role: ParamRole,
        position: usize,
    },

    #[error("operation `{operation}` already has a route")]
    DuplicateRoute { operation: String },
}

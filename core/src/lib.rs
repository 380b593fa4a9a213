//! Declarative HTTP request construction.
//!
//! # Overview
//! Operations are declared once, as data: a verb, a URL template, static
//! headers, the media type they produce, and a table binding each call
//! argument position to a path placeholder, query key, header, or the body.
//! At call time the compiler combines a declaration with live arguments and
//! the client configuration into an `HttpRequest`, which flows through the
//! request interceptors, the `Transport`, optional JSON decoding, and the
//! response interceptors.
//!
//! # Design
//! - The `Registry` is append-only while declaring and read-only once shared
//!   behind an `Arc`.
//! - Compilation is synchronous and pure; any failure aborts the call before
//!   a request reaches the transport.
//! - Network I/O belongs to the `Transport` implementation. Responses are
//!   lazy futures, evaluated once when awaited.

pub mod args;
pub mod client;
pub mod compile;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod operation;
pub mod registry;

pub use args::Arguments;
pub use client::{Client, ClientBuilder};
pub use compile::{compile, CompileMode, Compiler};
pub use config::{BaseConfig, ClientConfig, NoConfig};
pub use dispatch::{Dispatcher, Response, ResponseBody, ResponseFuture, Transport};
pub use error::{BoxError, DeclarationError, Error};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use interceptor::{Interceptor, Pipeline, StatusCheck, TracingInterceptor};
pub use operation::{
    Bindings, MediaType, OperationBuilder, OperationDescriptor, ParamRole, ParameterBinding,
    QueryPolicy,
};
pub use registry::{Operation, Registry};

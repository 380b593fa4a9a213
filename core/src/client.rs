//! Call-time entry point tying the registry, compiler, interceptors and
//! dispatcher together.
//!
//! # Design
//! `Client` carries no per-call state. `call` does everything that can fail
//! synchronously (lookup, compilation, request interceptors) up front and
//! returns the response future only once a valid request exists. The future
//! then runs the transport, decoding, and response interceptors when awaited.
//! Clients are cheap to clone and share one read-only registry.

use std::sync::Arc;

use tracing::debug;

use crate::args::Arguments;
use crate::compile::{CompileMode, Compiler};
use crate::config::{ClientConfig, NoConfig};
use crate::dispatch::{Dispatcher, ResponseFuture, Transport};
use crate::error::Error;
use crate::http::HttpRequest;
use crate::interceptor::{Interceptor, Pipeline};
use crate::registry::Registry;

#[derive(Clone)]
pub struct Client {
    registry: Arc<Registry>,
    config: Arc<dyn ClientConfig>,
    compiler: Compiler,
    pipeline: Pipeline,
    dispatcher: Dispatcher,
}

impl Client {
    pub fn builder(registry: Arc<Registry>, transport: Arc<dyn Transport>) -> ClientBuilder {
        ClientBuilder {
            registry,
            transport,
            config: Arc::new(NoConfig),
            pipeline: Pipeline::new(),
            mode: CompileMode::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compiles a call without running interceptors or dispatching it.
    pub fn compile(&self, operation: &str, arguments: &Arguments) -> Result<HttpRequest, Error> {
        let operation = self.registry.operation(operation)?;
        self.compiler
            .compile(&operation, self.config.as_ref(), arguments)
    }

    /// Prepares a call. Errors returned here mean no request was sent.
    pub fn call(&self, operation: &str, arguments: &Arguments) -> Result<ResponseFuture, Error> {
        let operation = self.registry.operation(operation)?;
        let request = self
            .compiler
            .compile(&operation, self.config.as_ref(), arguments)?;
        let request = self.pipeline.before_dispatch(request)?;
        debug!(operation = operation.id(), "request ready for dispatch");
        let response = self.dispatcher.dispatch(request, operation.produces_json());
        Ok(self.pipeline.after_dispatch(response))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("operations", &self.registry.len())
            .field("mode", &self.compiler.mode())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

#[must_use]
pub struct ClientBuilder {
    registry: Arc<Registry>,
    transport: Arc<dyn Transport>,
    config: Arc<dyn ClientConfig>,
    pipeline: Pipeline,
    mode: CompileMode,
}

impl ClientBuilder {
    pub fn config(mut self, config: impl ClientConfig + 'static) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn shared_config(mut self, config: Arc<dyn ClientConfig>) -> Self {
        self.config = config;
        self
    }

    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.pipeline.push(Arc::new(interceptor));
        self
    }

    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn mode(mut self, mode: CompileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> Client {
        Client {
            registry: self.registry,
            config: self.config,
            compiler: Compiler::new(self.mode),
            pipeline: self.pipeline,
            dispatcher: Dispatcher::new(self.transport),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::FutureExt;
    use serde_json::{json, Value};

    use super::*;
    use crate::config::BaseConfig;
    use crate::dispatch::tests::StubTransport;
    use crate::dispatch::ResponseBody;
    use crate::http::HttpMethod;
    use crate::interceptor::StatusCheck;
    use crate::operation::{MediaType, OperationBuilder};

    fn registry() -> Arc<Registry> {
        let mut registry = Registry::new();
        registry
            .declare(
                "getUser",
                OperationBuilder::get("/users/{id}")
                    .path("id", 0)
                    .query("active", 1)
                    .header("X-Request-Id", 2)
                    .static_header("Accept", "application/json")
                    .produces(MediaType::Json),
            )
            .unwrap();
        registry
            .declare("createUser", OperationBuilder::post("/users").body(0))
            .unwrap();
        Arc::new(registry)
    }

    /// Adds an authorization header the way a token-injecting hook would.
    struct Stamp;

    impl Interceptor for Stamp {
        fn before_dispatch(&self, mut request: HttpRequest) -> Result<HttpRequest, Error> {
            request.headers.push(("X-Stamp".to_string(), "1".to_string()));
            Ok(request)
        }
    }

    #[tokio::test]
    async fn call_compiles_intercepts_and_dispatches() {
        let transport = Arc::new(StubTransport::new(200, r#"{"id":"42"}"#));
        let client = Client::builder(registry(), transport.clone())
            .config(BaseConfig::new("https://api.test").with_header("User-Agent", "restbind"))
            .interceptor(Stamp)
            .build();

        let args = Arguments::from(vec![json!("42"), json!(true), json!("req-1")]);
        let pending = client.call("getUser", &args).unwrap();
        assert_eq!(transport.calls(), 0);

        let response = pending.await.unwrap();
        assert_eq!(response.body, ResponseBody::Json(json!({"id": "42"})));

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let request = &sent[0];
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.full_url(), "https://api.test/users/42?active=true");
        assert_eq!(request.header("user-agent"), Some("restbind"));
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.header("x-request-id"), Some("req-1"));
        assert_eq!(request.header("x-stamp"), Some("1"));
    }

    #[tokio::test]
    async fn raw_operations_are_not_decoded() {
        let transport = Arc::new(StubTransport::new(201, "created"));
        let client = Client::builder(registry(), transport.clone()).build();

        let args = Arguments::new().arg(&json!({"name": "Ada"})).unwrap();
        let response = client.call("createUser", &args).unwrap().await.unwrap();
        assert_eq!(response.body, ResponseBody::Raw("created".to_string()));
        assert_eq!(
            transport.sent.lock().unwrap()[0].body.as_deref(),
            Some(r#"{"name":"Ada"}"#)
        );
    }

    #[test]
    fn unknown_operation_fails_before_dispatch() {
        let transport = Arc::new(StubTransport::new(200, ""));
        let client = Client::builder(registry(), transport.clone()).build();
        let err = client.call("deleteUser", &Arguments::new()).err().unwrap();
        assert!(matches!(err, Error::UnknownOperation(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn strict_client_rejects_short_argument_lists() {
        let transport = Arc::new(StubTransport::new(200, ""));
        let client = Client::builder(registry(), transport.clone())
            .mode(CompileMode::Strict)
            .build();
        let err = client
            .call("getUser", &Arguments::from(vec![json!(1)]))
            .err()
            .unwrap();
        assert!(matches!(err, Error::MissingArgument { position: 1, .. }));
        assert_eq!(transport.calls(), 0);
    }

    /// Records the body every response carries when it reaches the pipeline.
    struct CaptureBody(Arc<Mutex<Vec<ResponseBody>>>);

    impl Interceptor for CaptureBody {
        fn after_dispatch(&self, response: ResponseFuture) -> ResponseFuture {
            let seen = self.0.clone();
            async move {
                let response = response.await?;
                seen.lock().unwrap().push(response.body.clone());
                Ok(response)
            }
            .boxed()
        }
    }

    struct Reject;

    impl Interceptor for Reject {
        fn before_dispatch(&self, _request: HttpRequest) -> Result<HttpRequest, Error> {
            Err(Error::interceptor("no credentials"))
        }
    }

    #[tokio::test]
    async fn response_interceptors_see_decoded_payload() {
        let transport = Arc::new(StubTransport::new(404, r#"{"error":"missing"}"#));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let client = Client::builder(registry(), transport)
            .interceptor(CaptureBody(seen.clone()))
            .interceptor(StatusCheck)
            .build();

        let err = client
            .call("getUser", &Arguments::from(vec![json!(9)]))
            .unwrap()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ResponseBody::Json(json!({"error": "missing"}))]
        );
    }

    #[test]
    fn rejected_request_never_reaches_transport() {
        let transport = Arc::new(StubTransport::new(200, ""));
        let client = Client::builder(registry(), transport.clone())
            .interceptor(Reject)
            .build();

        let err = client
            .call("getUser", &Arguments::from(vec![json!(1)]))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Interceptor(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn compile_matches_what_call_would_send() {
        let transport = Arc::new(StubTransport::new(200, ""));
        let client = Client::builder(registry(), transport)
            .config(BaseConfig::new("http://localhost:3000"))
            .build();
        let request = client
            .compile("getUser", &Arguments::from(vec![json!(7), Value::Null]))
            .unwrap();
        assert_eq!(request.url, "http://localhost:3000/users/7");
        assert!(request.query.is_empty());
        assert_eq!(
            request.headers,
            vec![("Accept".to_string(), "application/json".to_string())]
        );
        assert!(format!("{client:?}").contains("operations: 2"));
    }
}

//! Append-only registry of declared operations.
//!
//! # Design
//! Declarations are collected through `&mut self` methods and may arrive in
//! any order: a header or binding can be registered before the route it
//! belongs to. Once declaration is finished the registry is wrapped in an
//! `Arc` and shared with clients, after which it is read-only.
//!
//! Operations are keyed by caller-chosen string ids rather than by the
//! identity of any live object.

use std::collections::HashMap;

use tracing::trace;

use crate::error::{DeclarationError, Error};
use crate::http::HttpMethod;
use crate::operation::{
    Bindings, MediaType, OperationBuilder, OperationDescriptor, ParamRole, ParameterBinding,
};

#[derive(Debug, Clone, Default)]
struct Declaration {
    descriptor: OperationDescriptor,
    bindings: Bindings,
}

/// Read-only view of a fully declared operation.
#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    id: &'a str,
    verb: HttpMethod,
    url_template: &'a str,
    descriptor: &'a OperationDescriptor,
    bindings: &'a Bindings,
}

impl<'a> Operation<'a> {
    pub fn id(&self) -> &'a str {
        self.id
    }

    pub fn verb(&self) -> HttpMethod {
        self.verb
    }

    pub fn url_template(&self) -> &'a str {
        self.url_template
    }

    pub fn static_headers(&self) -> &'a [(String, String)] {
        self.descriptor.static_headers()
    }

    pub fn produces_json(&self) -> bool {
        self.descriptor.produces_json()
    }

    pub fn descriptor(&self) -> &'a OperationDescriptor {
        self.descriptor
    }

    pub fn bindings(&self) -> &'a Bindings {
        self.bindings
    }
}

/// Process-lifetime store of operation metadata and parameter bindings.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    operations: HashMap<String, Declaration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, operation: &str) -> &mut Declaration {
        self.operations.entry(operation.to_string()).or_default()
    }

    /// Attaches the verb and URL template. A route can only be set once.
    pub fn register_operation(
        &mut self,
        operation: &str,
        verb: HttpMethod,
        url_template: impl Into<String>,
    ) -> Result<(), DeclarationError> {
        let descriptor = &mut self.entry(operation).descriptor;
        if descriptor.route.is_some() {
            return Err(DeclarationError::DuplicateRoute {
                operation: operation.to_string(),
            });
        }
        descriptor.route = Some((verb, url_template.into()));
        trace!(operation, %verb, "registered route");
        Ok(())
    }

    /// Adds static headers. A name already present (compared ignoring ASCII
    /// case) takes the new value in place.
    pub fn register_headers<I, K, V>(&mut self, operation: &str, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let static_headers = &mut self.entry(operation).descriptor.static_headers;
        for (name, value) in headers {
            crate::compile::upsert_header(static_headers, name.into(), value.into());
        }
    }

    pub fn register_produces(&mut self, operation: &str, media_type: MediaType) {
        self.entry(operation).descriptor.produces = media_type;
    }

    /// Appends a binding for `(operation, role)`. `key` is ignored for body
    /// bindings and required for every other role.
    pub fn register_binding(
        &mut self,
        operation: &str,
        role: ParamRole,
        key: Option<&str>,
        position: usize,
    ) -> Result<(), DeclarationError> {
        self.register(operation, ParameterBinding::new(role, key, position))
    }

    pub fn register(
        &mut self,
        operation: &str,
        binding: ParameterBinding,
    ) -> Result<(), DeclarationError> {
        trace!(operation, role = ?binding.role, position = binding.position, "registered binding");
        self.entry(operation).bindings.push(operation, binding)
    }

    /// Applies a whole declaration built with `OperationBuilder`.
    ///
    /// The declaration is staged on a copy of whatever was already
    /// registered for `operation` and stored only when every step succeeds,
    /// so a rejected builder leaves the registry untouched.
    pub fn declare(
        &mut self,
        operation: &str,
        builder: OperationBuilder,
    ) -> Result<(), DeclarationError> {
        let OperationBuilder {
            verb,
            url_template,
            headers,
            produces,
            bindings,
        } = builder;

        let mut staged = self.operations.get(operation).cloned().unwrap_or_default();
        if staged.descriptor.route.is_some() {
            return Err(DeclarationError::DuplicateRoute {
                operation: operation.to_string(),
            });
        }
        staged.descriptor.route = Some((verb, url_template));
        for (name, value) in headers {
            crate::compile::upsert_header(&mut staged.descriptor.static_headers, name, value);
        }
        staged.descriptor.produces = produces;
        for binding in bindings {
            staged.bindings.push(operation, binding)?;
        }

        trace!(operation, %verb, "declared operation");
        self.operations.insert(operation.to_string(), staged);
        Ok(())
    }

    /// Looks up an operation ready for compilation.
    pub fn operation(&self, operation: &str) -> Result<Operation<'_>, Error> {
        let (id, declaration) = self
            .operations
            .get_key_value(operation)
            .ok_or_else(|| Error::UnknownOperation(operation.to_string()))?;
        let (verb, url_template) = declaration
            .descriptor
            .route
            .as_ref()
            .ok_or_else(|| Error::UnknownOperation(operation.to_string()))?;
        Ok(Operation {
            id,
            verb: *verb,
            url_template,
            descriptor: &declaration.descriptor,
            bindings: &declaration.bindings,
        })
    }

    /// True when the operation has a route.
    pub fn contains(&self, operation: &str) -> bool {
        self.operations
            .get(operation)
            .is_some_and(|d| d.descriptor.route.is_some())
    }

    /// Number of operations that have a route and can be compiled.
    pub fn len(&self) -> usize {
        self.operation_ids().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of the operations that have a route.
    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.operations
            .iter()
            .filter(|(_, d)| d.descriptor.route.is_some())
            .map(|(id, _)| id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_may_arrive_in_any_order() {
        let mut registry = Registry::new();
        registry
            .register_binding("getUser", ParamRole::Path, Some("id"), 0)
            .unwrap();
        registry.register_headers("getUser", [("Accept", "application/json")]);
        registry.register_produces("getUser", MediaType::Json);
        assert!(!registry.contains("getUser"));

        registry
            .register_operation("getUser", HttpMethod::Get, "/users/{id}")
            .unwrap();

        let op = registry.operation("getUser").unwrap();
        assert_eq!(op.id(), "getUser");
        assert_eq!(op.verb(), HttpMethod::Get);
        assert_eq!(op.url_template(), "/users/{id}");
        assert!(op.produces_json());
        assert_eq!(op.bindings().of(ParamRole::Path).len(), 1);
        assert_eq!(
            op.static_headers(),
            &[("Accept".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn operation_without_bindings_is_valid() {
        let mut registry = Registry::new();
        registry.declare("ping", OperationBuilder::head("/ping")).unwrap();
        let op = registry.operation("ping").unwrap();
        assert!(op.bindings().is_empty());
        assert!(!op.produces_json());
    }

    #[test]
    fn unknown_and_routeless_operations_are_not_compilable() {
        let mut registry = Registry::new();
        registry
            .register_binding("orphan", ParamRole::Query, Some("q"), 0)
            .unwrap();

        assert!(matches!(
            registry.operation("missing"),
            Err(Error::UnknownOperation(id)) if id == "missing"
        ));
        assert!(matches!(
            registry.operation("orphan"),
            Err(Error::UnknownOperation(id)) if id == "orphan"
        ));
    }

    #[test]
    fn route_is_immutable_once_declared() {
        let mut registry = Registry::new();
        registry
            .register_operation("list", HttpMethod::Get, "/users")
            .unwrap();
        let err = registry
            .register_operation("list", HttpMethod::Post, "/users")
            .unwrap_err();
        assert_eq!(
            err,
            DeclarationError::DuplicateRoute {
                operation: "list".to_string()
            }
        );
        assert_eq!(registry.operation("list").unwrap().verb(), HttpMethod::Get);
    }

    #[test]
    fn repeated_header_registration_overrides_by_name() {
        let mut registry = Registry::new();
        registry.declare("op", OperationBuilder::get("/")).unwrap();
        registry.register_headers("op", [("Accept", "text/plain"), ("X-A", "1")]);
        registry.register_headers("op", [("accept", "application/json")]);

        let op = registry.operation("op").unwrap();
        assert_eq!(
            op.static_headers(),
            &[
                ("accept".to_string(), "application/json".to_string()),
                ("X-A".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn declare_rejects_second_body() {
        let mut registry = Registry::new();
        let err = registry
            .declare("create", OperationBuilder::post("/users").body(0).body(1))
            .unwrap_err();
        assert!(matches!(err, DeclarationError::DuplicateBody { position: 1, .. }));
    }

    #[test]
    fn failed_declare_leaves_no_trace() {
        let mut registry = Registry::new();
        registry
            .declare(
                "create",
                OperationBuilder::post("/users")
                    .static_header("Content-Type", "application/json")
                    .body(0)
                    .body(1),
            )
            .unwrap_err();
        assert!(!registry.contains("create"));
        assert!(registry.is_empty());

        registry
            .declare("create", OperationBuilder::post("/users").body(0))
            .unwrap();
        let op = registry.operation("create").unwrap();
        assert_eq!(op.verb(), HttpMethod::Post);
        assert_eq!(op.bindings().body().map(|b| b.position), Some(0));
        assert!(op.static_headers().is_empty());
    }

    #[test]
    fn failed_declare_keeps_earlier_registrations() {
        let mut registry = Registry::new();
        registry.register_headers("update", [("X-A", "1")]);
        registry
            .register_binding("update", ParamRole::Path, Some("id"), 0)
            .unwrap();

        registry
            .declare(
                "update",
                OperationBuilder::put("/users/{id}")
                    .query("fields", 1)
                    .binding(ParameterBinding::new(ParamRole::Header, None, 2)),
            )
            .unwrap_err();
        assert!(!registry.contains("update"));

        registry
            .declare("update", OperationBuilder::put("/users/{id}"))
            .unwrap();
        let op = registry.operation("update").unwrap();
        assert_eq!(op.bindings().of(ParamRole::Path).len(), 1);
        assert!(op.bindings().of(ParamRole::Query).is_empty());
        assert_eq!(op.static_headers(), &[("X-A".to_string(), "1".to_string())]);
    }

    #[test]
    fn len_counts_only_routed_operations() {
        let mut registry = Registry::new();
        registry
            .register_binding("orphan", ParamRole::Query, Some("q"), 0)
            .unwrap();
        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());

        registry.declare("ping", OperationBuilder::head("/ping")).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.operation_ids().collect::<Vec<_>>(), ["ping"]);
    }
}

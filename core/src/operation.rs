//! Declarative metadata for a single remote operation.
//!
//! # Design
//! An operation is described by two pieces of plain data: an
//! `OperationDescriptor` (verb, URL template, static headers, produced media
//! type) and a `Bindings` table mapping argument positions to request roles.
//! Nothing here performs I/O or touches argument values; the compiler reads
//! these tables at call time.
//!
//! `OperationBuilder` is the convenient way to write a whole declaration in
//! one expression. It is applied through `Registry::declare`, which runs the
//! same registration functions a piecemeal declaration would.

use crate::error::DeclarationError;
use crate::http::HttpMethod;

/// Which part of the request an argument feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    Path,
    Query,
    Header,
    Body,
}

/// What to do with a query argument that is empty.
///
/// `OmitIfEmpty` drops the parameter when its value is `null`, absent, `""`,
/// `0` or `false`. `Always` sends it regardless; an absent value is sent as
/// an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryPolicy {
    #[default]
    OmitIfEmpty,
    Always,
}

/// Media type an operation produces. `Json` responses are decoded before the
/// response interceptors run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaType {
    #[default]
    Raw,
    Json,
}

/// One argument-position-to-role association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBinding {
    pub role: ParamRole,
    /// Placeholder, query key, or header name. `None` for body bindings.
    pub key: Option<String>,
    pub position: usize,
    /// Only consulted for query bindings.
    pub policy: QueryPolicy,
}

impl ParameterBinding {
    pub fn new(role: ParamRole, key: Option<&str>, position: usize) -> Self {
        let key = match role {
            ParamRole::Body => None,
            _ => key.map(str::to_string),
        };
        Self {
            role,
            key,
            position,
            policy: QueryPolicy::default(),
        }
    }

    pub fn path(key: &str, position: usize) -> Self {
        Self::new(ParamRole::Path, Some(key), position)
    }

    pub fn query(key: &str, position: usize) -> Self {
        Self::new(ParamRole::Query, Some(key), position)
    }

    pub fn header(key: &str, position: usize) -> Self {
        Self::new(ParamRole::Header, Some(key), position)
    }

    pub fn body(position: usize) -> Self {
        Self::new(ParamRole::Body, None, position)
    }

    pub fn with_policy(mut self, policy: QueryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The key for keyed roles. Registration guarantees it is present.
    pub(crate) fn key_str(&self) -> &str {
        self.key.as_deref().unwrap_or_default()
    }
}

/// Static metadata of an operation.
///
/// The route (verb + URL template) may be registered after headers or
/// bindings, so it is optional until declaration completes. An operation
/// without a route cannot be compiled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub(crate) route: Option<(HttpMethod, String)>,
    pub(crate) static_headers: Vec<(String, String)>,
    pub(crate) produces: MediaType,
}

impl OperationDescriptor {
    pub fn verb(&self) -> Option<HttpMethod> {
        self.route.as_ref().map(|(verb, _)| *verb)
    }

    pub fn url_template(&self) -> Option<&str> {
        self.route.as_ref().map(|(_, url)| url.as_str())
    }

    pub fn static_headers(&self) -> &[(String, String)] {
        &self.static_headers
    }

    pub fn produces(&self) -> MediaType {
        self.produces
    }

    pub fn produces_json(&self) -> bool {
        self.produces == MediaType::Json
    }
}

/// Per-role binding lists of one operation.
///
/// Each list is kept sorted by argument position; bindings that share a
/// position stay in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    path: Vec<ParameterBinding>,
    query: Vec<ParameterBinding>,
    header: Vec<ParameterBinding>,
    body: Option<ParameterBinding>,
}

impl Bindings {
    pub fn of(&self, role: ParamRole) -> &[ParameterBinding] {
        match role {
            ParamRole::Path => &self.path,
            ParamRole::Query => &self.query,
            ParamRole::Header => &self.header,
            ParamRole::Body => self.body.as_slice(),
        }
    }

    pub fn body(&self) -> Option<&ParameterBinding> {
        self.body.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.query.is_empty() && self.header.is_empty() && self.body.is_none()
    }

    pub(crate) fn push(
        &mut self,
        operation: &str,
        binding: ParameterBinding,
    ) -> Result<(), DeclarationError> {
        let list = match binding.role {
            ParamRole::Body => {
                if self.body.is_some() {
                    return Err(DeclarationError::DuplicateBody {
                        operation: operation.to_string(),
                        position: binding.position,
                    });
                }
                self.body = Some(binding);
                return Ok(());
            }
            ParamRole::Path => &mut self.path,
            ParamRole::Query => &mut self.query,
            ParamRole::Header => &mut self.header,
        };
        if binding.key.is_none() {
            return Err(DeclarationError::MissingKey {
                operation: operation.to_string(),
                role: binding.role,
                position: binding.position,
            });
        }
        let at = list.partition_point(|b| b.position <= binding.position);
        list.insert(at, binding);
        Ok(())
    }
}

/// Fluent declaration of one operation.
///
/// ```
/// use restbind_core::{MediaType, OperationBuilder, Registry};
///
/// let mut registry = Registry::new();
/// registry
///     .declare(
///         "getUser",
///         OperationBuilder::get("/users/{id}")
///             .path("id", 0)
///             .query("active", 1)
///             .produces(MediaType::Json),
///     )
///     .unwrap();
/// assert!(registry.contains("getUser"));
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct OperationBuilder {
    pub(crate) verb: HttpMethod,
    pub(crate) url_template: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) produces: MediaType,
    pub(crate) bindings: Vec<ParameterBinding>,
}

impl OperationBuilder {
    pub fn new(verb: HttpMethod, url_template: impl Into<String>) -> Self {
        Self {
            verb,
            url_template: url_template.into(),
            headers: Vec::new(),
            produces: MediaType::default(),
            bindings: Vec::new(),
        }
    }

    pub fn get(url_template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url_template)
    }

    pub fn post(url_template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url_template)
    }

    pub fn put(url_template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url_template)
    }

    pub fn delete(url_template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url_template)
    }

    pub fn head(url_template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Head, url_template)
    }

    pub fn path(self, key: &str, position: usize) -> Self {
        self.binding(ParameterBinding::path(key, position))
    }

    pub fn query(self, key: &str, position: usize) -> Self {
        self.binding(ParameterBinding::query(key, position))
    }

    pub fn query_with(self, key: &str, position: usize, policy: QueryPolicy) -> Self {
        self.binding(ParameterBinding::query(key, position).with_policy(policy))
    }

    pub fn header(self, name: &str, position: usize) -> Self {
        self.binding(ParameterBinding::header(name, position))
    }

    pub fn body(self, position: usize) -> Self {
        self.binding(ParameterBinding::body(position))
    }

    pub fn binding(mut self, binding: ParameterBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Adds a header sent on every call of this operation.
    pub fn static_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds several static headers at once.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(name, value)| (name.into(), value.into())));
        self
    }

    pub fn produces(mut self, media_type: MediaType) -> Self {
        self.produces = media_type;
        self
    }
}

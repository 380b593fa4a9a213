//! Client-level configuration: base URL and default headers.
//!
//! # Design
//! The compiler only ever talks to the `ClientConfig` trait, whose accessors
//! default to "nothing configured". A client can override them to compute
//! values on the fly; most callers use `BaseConfig`, which can also be loaded
//! from JSON. Headers in JSON are written as `[["name", "value"], ...]` so
//! their order survives.

use serde::Deserialize;

/// Overridable accessors consulted on every compile.
pub trait ClientConfig: Send + Sync {
    fn base_url(&self) -> Option<&str> {
        None
    }

    fn default_headers(&self) -> Option<&[(String, String)]> {
        None
    }
}

/// Static configuration for a client instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BaseConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub default_headers: Option<Vec<(String, String)>>,
}

impl BaseConfig {
    /// The base URL is used verbatim; no trailing slash is trimmed or added.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            default_headers: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }
}

impl ClientConfig for BaseConfig {
    fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn default_headers(&self) -> Option<&[(String, String)]> {
        self.default_headers.as_deref()
    }
}

/// A configuration with nothing set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConfig;

impl ClientConfig for NoConfig {}

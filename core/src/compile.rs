//! Turns an operation declaration plus live arguments into an `HttpRequest`.
//!
//! # Design
//! Compilation runs five steps in a fixed order: body, path substitution,
//! query assembly, header merge, URL composition. Any failure aborts the
//! whole call before a request exists, so nothing half-built can reach the
//! dispatcher. The compiler holds no state besides its mode and never keeps
//! a reference to the arguments it was given.
//!
//! Value rendering rules shared by path, query and header bindings:
//! strings are used verbatim, numbers and booleans as their JSON text
//! (integral floats without the trailing `.0`),
//! arrays and objects as compact JSON, and `null` or an absent argument as
//! the empty string.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Number, Value};
use tracing::debug;

use crate::args::Arguments;
use crate::config::ClientConfig;
use crate::error::Error;
use crate::http::HttpRequest;
use crate::operation::{ParamRole, ParameterBinding, QueryPolicy};
use crate::registry::Operation;

/// Characters left alone by `encodeURIComponent`: alphanumerics and
/// `- _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How to treat a binding whose position is past the end of the arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    /// The argument is absent.
    #[default]
    Permissive,
    /// Fail with `Error::MissingArgument`.
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    mode: CompileMode,
}

impl Compiler {
    pub fn new(mode: CompileMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> CompileMode {
        self.mode
    }

    pub fn compile(
        &self,
        operation: &Operation<'_>,
        config: &dyn ClientConfig,
        arguments: &Arguments,
    ) -> Result<HttpRequest, Error> {
        let bindings = operation.bindings();

        let body = match bindings.body() {
            Some(binding) => match self.argument(operation, arguments, binding)? {
                Some(value) => Some(serde_json::to_string(value).map_err(Error::Serialization)?),
                None => None,
            },
            None => None,
        };

        let mut path = operation.url_template().to_string();
        for binding in bindings.of(ParamRole::Path) {
            let value = render(self.argument(operation, arguments, binding)?)?;
            let placeholder = format!("{{{}}}", binding.key_str());
            path = path.replacen(&placeholder, &value, 1);
        }

        let mut query: Vec<(String, String)> = Vec::new();
        for binding in bindings.of(ParamRole::Query) {
            let value = self.argument(operation, arguments, binding)?;
            if binding.policy == QueryPolicy::OmitIfEmpty && value.map_or(true, is_empty_value) {
                continue;
            }
            let value = render(value)?;
            let key = utf8_percent_encode(binding.key_str(), COMPONENT).to_string();
            let value = utf8_percent_encode(&value, COMPONENT).to_string();
            match query.iter_mut().find(|(k, _)| *k == key) {
                Some(pair) => pair.1 = value,
                None => query.push((key, value)),
            }
        }

        let mut headers = Vec::new();
        for (name, value) in config.default_headers().unwrap_or_default() {
            upsert_header(&mut headers, name.clone(), value.clone());
        }
        for (name, value) in operation.static_headers() {
            upsert_header(&mut headers, name.clone(), value.clone());
        }
        for binding in bindings.of(ParamRole::Header) {
            match self.argument(operation, arguments, binding)? {
                Some(value) if !value.is_null() => {
                    upsert_header(&mut headers, binding.key_str().to_string(), render(Some(value))?);
                }
                _ => {}
            }
        }

        let url = format!("{}{path}", config.base_url().unwrap_or_default());

        let request = HttpRequest {
            method: operation.verb(),
            url,
            headers,
            query,
            body,
        };
        debug!(
            operation = operation.id(),
            method = %request.method,
            url = %request.url,
            "compiled request"
        );
        Ok(request)
    }

    fn argument<'v>(
        &self,
        operation: &Operation<'_>,
        arguments: &'v Arguments,
        binding: &ParameterBinding,
    ) -> Result<Option<&'v Value>, Error> {
        match arguments.get(binding.position) {
            Some(value) => Ok(Some(value)),
            None if self.mode == CompileMode::Strict => Err(Error::MissingArgument {
                operation: operation.id().to_string(),
                position: binding.position,
            }),
            None => Ok(None),
        }
    }
}

/// Compiles with the default, permissive mode.
pub fn compile(
    operation: &Operation<'_>,
    config: &dyn ClientConfig,
    arguments: &Arguments,
) -> Result<HttpRequest, Error> {
    Compiler::default().compile(operation, config, arguments)
}

/// `null`, `""`, `0` and `false`. Arrays and objects are never empty here,
/// even when they have no elements.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn render(value: Option<&Value>) -> Result<String, Error> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Number(n)) => Ok(render_number(n)),
        Some(v) => serde_json::to_string(v).map_err(Error::Serialization),
    }
}

/// Integral floats render without a fractional part, so `2.0` becomes `2`.
fn render_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

/// Sets `name` in `headers`, replacing an entry with the same name ignoring
/// ASCII case. The replaced entry keeps its position.
pub(crate) fn upsert_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
        Some(entry) => *entry = (name, value),
        None => headers.push((name, value)),
    }
}

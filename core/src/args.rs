//! Per-call argument capture.
//!
//! Arguments are converted to `serde_json::Value` when they are captured, so
//! the compiler works on one uniform representation regardless of the
//! caller's types. A position past the end of the list is "absent", which is
//! distinct from an explicit `null`.

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;

/// Ordered argument values of a single call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` as the next positional argument.
    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, Error> {
        self.push(value)?;
        Ok(self)
    }

    pub fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let value = serde_json::to_value(value).map_err(Error::Serialization)?;
        self.values.push(value);
        Ok(())
    }

    pub fn push_value(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

impl FromIterator<Value> for Arguments {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn captures_serializable_values_in_order() {
        let args = Arguments::new()
            .arg("42")
            .unwrap()
            .arg(&true)
            .unwrap()
            .arg(&Some(3))
            .unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args.get(0), Some(&json!("42")));
        assert_eq!(args.get(1), Some(&json!(true)));
        assert_eq!(args.get(2), Some(&json!(3)));
        assert_eq!(args.get(3), None);
    }

    #[test]
    fn none_is_captured_as_null() {
        let args = Arguments::new().arg(&None::<String>).unwrap();
        assert_eq!(args.get(0), Some(&Value::Null));
    }

    #[test]
    fn unserializable_value_is_a_serialization_error() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], "non-string key");
        let err = Arguments::new().arg(&map).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Context
//!
//! The attribute map carried by every session and ticket. Attribute values are
//! JSON values restricted by convention to strings, `null`, lists of strings and
//! nested maps. Insertion order is preserved (`serde_json/preserve_order`) so that
//! monitor output lists attributes in the order the request handler wrote them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered mapping of attribute names to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Set an attribute, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Builder-style variant of [`Context::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns the attribute as a string slice, `None` if absent, null or not a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_attribute_is_kept() {
        let ctx = Context::new().with("rid", "R1").with("uid", Value::Null);

        assert!(ctx.contains("uid"));
        assert_eq!(ctx.get("uid"), Some(&Value::Null));
        assert_eq!(ctx.get_str("uid"), None);
        assert_eq!(ctx.get_str("rid"), Some("R1"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let ctx: Context = vec![("z", "1"), ("a", "2"), ("m", "3")].into_iter().collect();
        let names: Vec<&str> = ctx.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_nested_values_serialize_transparently() {
        let ctx = Context::new()
            .with("roles", json!(["admin", "user"]))
            .with("authsp", json!({"id": "Ldap", "level": 10}));

        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["roles"][1], "user");
        assert_eq!(value["authsp"]["level"], 10);

        let back: Context = serde_json::from_value(value).unwrap();
        assert_eq!(back, ctx);
    }
}

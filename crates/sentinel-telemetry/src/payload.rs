use std::sync::Arc;

use serde_json::Value;

/// An opaque JSON document returned by one telemetry endpoint.
///
/// Cloning is cheap: the tree is shared, so session snapshots taken on
/// every frame do not copy the body.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload(Arc<Value>);

impl Payload {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Look up a top-level field. Missing fields are `None`, never an error.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(self.value()).unwrap_or_else(|_| self.0.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

use std::collections::HashSet;

use serde_json::Value;

/// Tracks which resources a client has already seen.
///
/// A UI that performs an initial bulk fetch and also listens to the live
/// stream can receive the same product twice; feed both sources through
/// [`first_sighting`](Self::first_sighting) to count each one once.
#[derive(Debug, Default)]
pub struct SeenPayloads {
    ids: HashSet<String>,
}

impl SeenPayloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of a payload: its `admin_graphql_api_id`, else its `id`.
    pub fn identity(payload: &Value) -> Option<String> {
        let raw_id = payload.get("id").and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        payload
            .get("admin_graphql_api_id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| raw_id.map(|id| format!("gid://shopify/Product/{id}")))
    }

    /// Returns `true` the first time a payload identity is seen.
    ///
    /// Payloads without an identity are always reported as new.
    pub fn first_sighting(&mut self, payload: &Value) -> bool {
        match Self::identity(payload) {
            Some(id) => self.ids.insert(id),
            None => true,
        }
    }

    /// Forget an identity, e.g. after a `product_deleted` event.
    pub fn forget(&mut self, payload: &Value) {
        if let Some(id) = Self::identity(payload) {
            self.ids.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

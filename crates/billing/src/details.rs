//! Open key/value record attached to every order item.
//!
//! Execution metadata (registry step outputs, error messages, transfer codes)
//! accumulates here across retries. Updates are merge-only: new keys are
//! added, existing keys are overwritten, nested objects are merged key by
//! key. A details record is never wholesale-replaced.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known keys. Anything else is an open bag for registry step logs.
const KEY_ERROR: &str = "error";
const KEY_OUTPUTS: &str = "outputs";
const KEY_TRANSFER_CODE: &str = "transfer_code";
const KEY_INTERNAL: &str = "internal";
const KEY_REWRITE_CONTACTS: &str = "rewrite_contacts";
const KEY_REASON: &str = "reason";
const KEY_CREATED_AUTOMATICALLY: &str = "created_automatically";

/// Execution metadata for one order item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemDetails(Map<String, Value>);

impl ItemDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Details for a transfer item: the code the customer supplied plus the
    /// flags the transfer sub-flow branches on.
    pub fn for_transfer(transfer_code: impl Into<String>, internal: bool, rewrite_contacts: bool) -> Self {
        let mut d = Self::new();
        d.insert(KEY_TRANSFER_CODE, Value::String(transfer_code.into()));
        d.insert(KEY_INTERNAL, Value::Bool(internal));
        d.insert(KEY_REWRITE_CONTACTS, Value::Bool(rewrite_contacts));
        d
    }

    pub fn with_error(msg: impl Into<String>) -> Self {
        let mut d = Self::new();
        d.set_error(msg);
        d
    }

    pub fn with_reason(msg: impl Into<String>) -> Self {
        let mut d = Self::new();
        d.insert(KEY_REASON, Value::String(msg.into()));
        d
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Merge `other` into `self`: new keys added, existing keys overwritten,
    /// object values merged recursively.
    pub fn merge(&mut self, other: &ItemDetails) {
        for (key, value) in &other.0 {
            merge_value(self.0.entry(key.clone()).or_insert(Value::Null), value);
        }
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.insert(KEY_ERROR, Value::String(msg.into()));
    }

    pub fn error(&self) -> Option<&str> {
        self.0.get(KEY_ERROR).and_then(Value::as_str)
    }

    /// Replace the recorded registry step outputs for the latest attempt.
    pub fn set_outputs(&mut self, outputs: Vec<String>) {
        self.insert(
            KEY_OUTPUTS,
            Value::Array(outputs.into_iter().map(Value::String).collect()),
        );
    }

    pub fn outputs(&self) -> Vec<&str> {
        self.0
            .get(KEY_OUTPUTS)
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn transfer_code(&self) -> Option<&str> {
        self.0.get(KEY_TRANSFER_CODE).and_then(Value::as_str)
    }

    pub fn internal(&self) -> bool {
        self.0
            .get(KEY_INTERNAL)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn rewrite_contacts(&self) -> bool {
        self.0
            .get(KEY_REWRITE_CONTACTS)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn reason(&self) -> Option<&str> {
        self.0.get(KEY_REASON).and_then(Value::as_str)
    }

    pub fn created_automatically(&self) -> bool {
        self.0
            .get(KEY_CREATED_AUTOMATICALLY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn mark_created_automatically(&mut self) {
        self.insert(KEY_CREATED_AUTOMATICALLY, Value::Bool(true));
    }
}

fn merge_value(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(update)) => {
            for (key, value) in update {
                merge_value(existing.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_adds_new_keys_and_overwrites_existing() {
        let mut base = ItemDetails::for_transfer("abc123", true, false);
        let mut update = ItemDetails::new();
        update.set_error("boom");
        update.insert("internal", Value::Bool(false));

        base.merge(&update);

        assert_eq!(base.error(), Some("boom"));
        assert!(!base.internal());
        assert_eq!(base.transfer_code(), Some("abc123"));
    }

    #[test]
    fn merge_is_recursive_for_nested_objects() {
        let mut base = ItemDetails::new();
        base.insert("registry", json!({"step": 1, "host": "epp-1"}));
        let mut update = ItemDetails::new();
        update.insert("registry", json!({"step": 2}));

        base.merge(&update);

        assert_eq!(base.get("registry"), Some(&json!({"step": 2, "host": "epp-1"})));
    }

    #[test]
    fn outputs_round_trip_as_strings() {
        let mut d = ItemDetails::new();
        d.set_outputs(vec!["check ok".to_string(), "create ok".to_string()]);
        assert_eq!(d.outputs(), vec!["check ok", "create ok"]);
    }

    #[test]
    fn missing_flags_default_to_false() {
        let d = ItemDetails::new();
        assert!(!d.internal());
        assert!(!d.rewrite_contacts());
        assert!(!d.created_automatically());
        assert_eq!(d.transfer_code(), None);
    }

    #[test]
    fn serializes_as_plain_object() {
        let d = ItemDetails::for_transfer("xyz", false, true);
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["transfer_code"], "xyz");
        assert_eq!(v["rewrite_contacts"], true);
    }
}

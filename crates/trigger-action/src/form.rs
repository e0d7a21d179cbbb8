//! Scratch storage for values entered into open action forms.

use std::collections::HashMap;

use trigger_core::types::ActionId;

/// Entered field values, scoped by action.
///
/// Unwritten fields read as the empty string.
#[derive(Debug, Default)]
pub struct FormStore {
    values: HashMap<ActionId, HashMap<String, String>>,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, action: ActionId, name: &str) -> &str {
        self.values
            .get(&action)
            .and_then(|fields| fields.get(name))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn write(&mut self, action: ActionId, name: &str, value: impl Into<String>) {
        self.values
            .entry(action)
            .or_default()
            .insert(name.to_string(), value.into());
    }

    /// Reset every field of `action` to empty.
    pub fn clear(&mut self, action: ActionId) {
        if let Some(fields) = self.values.remove(&action) {
            tracing::debug!(action = %action, fields = fields.len(), "Form values discarded");
        }
    }
}

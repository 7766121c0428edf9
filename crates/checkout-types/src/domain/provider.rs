use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form field data a caller supplies to a provider (card details,
/// address lines, pickup location).
pub type FieldValues = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Payment,
    Shipping,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Operability note attached to a provider, shown to callers for
/// transparency. An `error` severity makes the provider unselectable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderState {
    pub code: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub key: String,
    pub label: String,
    pub required: bool,
}

impl FieldDefinition {
    pub fn required(key: &str, label: &str) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            required: true,
        }
    }

    pub fn optional(key: &str, label: &str) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            required: false,
        }
    }
}

/// Catalog entry describing a payment or shipping capability module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDefinition {
    pub id: String,
    pub kind: ProviderKind,
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldDefinition>,
    pub states: Vec<ProviderState>,
}

impl ProviderDefinition {
    pub fn has_error_state(&self) -> bool {
        self.states.iter().any(|s| s.severity == Severity::Error)
    }

    /// Keys of required fields that are absent or blank in `values`.
    pub fn missing_required(&self, values: &FieldValues) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .filter(|f| {
                values
                    .get(&f.key)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .map(|f| f.key.clone())
            .collect()
    }
}

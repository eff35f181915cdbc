//! Structured validation report for a header + formset submission.

use std::collections::BTreeMap;

use serde::Serialize;

pub const REQUIRED: &str = "This field is required.";

/// Errors attached to one submitted line row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowErrors {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub non_field: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Vec<String>>,
}

impl RowErrors {
    pub fn is_empty(&self) -> bool {
        self.non_field.is_empty() && self.fields.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

/// Everything wrong with a submission, keyed the way the form was sent:
/// formset-level messages, header fields, and per-row (0-based) errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub non_field: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rows: BTreeMap<usize, RowErrors>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.non_field.is_empty() && self.fields.is_empty() && self.rows.is_empty()
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn add_field(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_row_field(&mut self, row: usize, field: &str, message: impl Into<String>) {
        self.rows
            .entry(row)
            .or_default()
            .fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_row_non_field(&mut self, row: usize, message: impl Into<String>) {
        self.rows.entry(row).or_default().non_field.push(message.into());
    }

    pub fn row(&self, row: usize) -> Option<&RowErrors> {
        self.rows.get(&row)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} formset error(s), {} invalid field(s), {} invalid row(s)",
            self.non_field.len(),
            self.fields.len(),
            self.rows.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_only_populated_sections() {
        let mut errors = ValidationErrors::new();
        errors.add_row_field(1, "quantity", "Ensure this value is greater than 0.");

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "rows": { "1": { "fields": { "quantity": ["Ensure this value is greater than 0."] } } }
            })
        );
        assert!(errors.into_result().is_err());
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}

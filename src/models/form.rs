//! Untrusted form input and its sanitized counterpart

use std::collections::HashMap;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// One submitted field: a single value or a repeated one (checkbox groups).
///
/// Any JSON value is accepted. Numbers and booleans arrive as their text,
/// `null` as an absent value, so the pipeline reports what is wrong with
/// them instead of the request body being refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => FieldValue::Many(items.into_iter().filter_map(field_text).collect()),
            other => match field_text(other) {
                Some(text) => FieldValue::One(text),
                None => FieldValue::Many(Vec::new()),
            },
        })
    }
}

fn field_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

/// Raw request fields, exactly as submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    fields: IndexMap<String, FieldValue>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.fields.insert(field.to_string(), FieldValue::One(value.into()));
        self
    }

    pub fn with_many<I, S>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.fields.insert(field.to_string(), FieldValue::Many(values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Working copy of a submission while the pipeline runs over it.
///
/// Stages rewrite field values in place, record coerced dates, and append
/// violations; nothing is ever removed from the violation list.
#[derive(Debug, Clone, Default)]
pub struct SanitizedForm {
    fields: IndexMap<String, Vec<String>>,
    dates: HashMap<String, NaiveDate>,
    violations: Vec<Violation>,
}

impl SanitizedForm {
    pub fn from_raw(raw: &RawInput) -> Self {
        let fields = raw
            .fields
            .iter()
            .map(|(name, value)| {
                let values = match value {
                    FieldValue::One(v) => vec![v.clone()],
                    FieldValue::Many(vs) => vs.clone(),
                };
                (name.clone(), values)
            })
            .collect();
        Self {
            fields,
            ..Self::default()
        }
    }

    /// First value of a field, empty when the field was not submitted
    pub fn text(&self, field: &str) -> String {
        self.fields
            .get(field)
            .and_then(|values| values.first())
            .cloned()
            .unwrap_or_default()
    }

    /// Every non-empty value of a field
    pub fn values(&self, field: &str) -> Vec<String> {
        self.fields
            .get(field)
            .map(|values| values.iter().filter(|v| !v.is_empty()).cloned().collect())
            .unwrap_or_default()
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        self.dates.get(field).copied()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    pub(crate) fn values_mut(&mut self, field: &str) -> Option<&mut Vec<String>> {
        self.fields.get_mut(field)
    }

    pub(crate) fn set_date(&mut self, field: &str, date: NaiveDate) {
        self.dates.insert(field.to_string(), date);
    }

    pub(crate) fn reject(&mut self, field: &str, message: &str) {
        self.violations.push(Violation::new(field, message));
    }
}

/// Typed draft built from sanitized values.
///
/// Drafts are constructed whether or not the submission passed, so a
/// rejected form can be shown back to the user with what they typed.
pub trait FromForm: Sized {
    fn from_form(form: &SanitizedForm) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_single_and_repeated_values() {
        let raw: RawInput =
            serde_json::from_str(r#"{"title": "Dune", "genre": ["g1", "", "g2"]}"#).unwrap();
        let form = SanitizedForm::from_raw(&raw);
        assert_eq!(form.text("title"), "Dune");
        assert_eq!(form.values("genre"), vec!["g1".to_string(), "g2".to_string()]);
        assert_eq!(form.text("missing"), "");
        assert!(form.values("missing").is_empty());
    }

    #[test]
    fn test_deserialize_coerces_scalars() {
        let raw: RawInput = serde_json::from_str(
            r#"{"isbn": 9780261102217, "title": null, "genre": [1, null, "g2"], "flag": true}"#,
        )
        .unwrap();
        let form = SanitizedForm::from_raw(&raw);
        assert_eq!(form.text("isbn"), "9780261102217");
        assert_eq!(form.text("title"), "");
        assert!(form.values("title").is_empty());
        assert_eq!(form.values("genre"), vec!["1".to_string(), "g2".to_string()]);
        assert_eq!(form.text("flag"), "true");
    }
}

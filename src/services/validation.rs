//! Field-keyed validation errors
//!
//! Services collect problems per input field and hand them to the API layer,
//! which renders them as `{"field": ["message", ...]}`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Validation messages grouped by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single message for a single field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Check a required text field: present, not blank, within `max_len` chars
pub fn check_text(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) {
    if value.trim().is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if value.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max_len),
        );
    }
}

/// Check that an integer lies within `[min, max]`
pub fn check_range(errors: &mut FieldErrors, field: &str, value: i64, min: i64, max: i64) {
    if value < min {
        errors.add(field, format!("Ensure this value is greater than or equal to {}.", min));
    } else if value > max {
        errors.add(field, format!("Ensure this value is less than or equal to {}.", max));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("tags", "first");
        errors.add("tags", "second");
        errors.add("name", "bad");

        assert!(errors.contains("tags"));
        assert_eq!(
            errors.to_json(),
            serde_json::json!({"name": ["bad"], "tags": ["first", "second"]})
        );
        assert_eq!(errors.to_string(), "name: bad; tags: first; tags: second");
    }

    #[test]
    fn test_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(FieldErrors::single("x", "y").into_result().is_err());
    }

    #[test]
    fn test_check_text() {
        let mut errors = FieldErrors::new();
        check_text(&mut errors, "name", "   ", 10);
        check_text(&mut errors, "text", "ok", 10);
        check_text(&mut errors, "slug", "abcdefghijk", 10);

        assert!(errors.contains("name"));
        assert!(!errors.contains("text"));
        assert!(errors.contains("slug"));
    }

    #[test]
    fn test_check_range_bounds_inclusive() {
        let mut errors = FieldErrors::new();
        check_range(&mut errors, "low", 1, 1, 32000);
        check_range(&mut errors, "high", 32000, 1, 32000);
        assert!(errors.is_empty());

        check_range(&mut errors, "zero", 0, 1, 32000);
        check_range(&mut errors, "over", 32001, 1, 32000);
        assert!(errors.contains("zero"));
        assert!(errors.contains("over"));
    }
}

//! Minimal object schema validation
//!
//! Tool inputs and outputs are validated against a small JSON-schema
//! subset: required field presence plus per-property type checks. This
//! is the only local notion of correctness at the tool boundary;
//! semantic quality is judged later by the rubric scorer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::IsdError;

/// Accepted JSON value types for a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

/// Schema over a JSON object: required field names plus typed properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldType>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required, typed field.
    pub fn require(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(name, ty);
        self
    }

    /// Add an optional, typed field.
    pub fn optional(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.properties.insert(name.into(), ty);
        self
    }

    /// Validate a payload. `null` is never accepted for a required field.
    pub fn validate(&self, value: &Value) -> Result<(), IsdError> {
        let obj = value.as_object().ok_or_else(|| {
            IsdError::SchemaValidation("payload is not a JSON object".to_string())
        })?;

        for field in &self.required {
            match obj.get(field) {
                None | Some(Value::Null) => {
                    return Err(IsdError::SchemaValidation(format!(
                        "missing required field '{}'",
                        field
                    )));
                }
                Some(_) => {}
            }
        }

        for (name, ty) in &self.properties {
            if let Some(v) = obj.get(name) {
                if !v.is_null() && !ty.matches(v) {
                    return Err(IsdError::SchemaValidation(format!(
                        "field '{}' has wrong type",
                        name
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ObjectSchema {
        ObjectSchema::new()
            .require("summary", FieldType::String)
            .require("items", FieldType::Array)
            .optional("confidence", FieldType::Number)
    }

    #[test]
    fn test_valid_payload() {
        let payload = json!({"summary": "ok", "items": [1, 2], "confidence": 0.9});
        assert!(schema().validate(&payload).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let payload = json!({"summary": "ok"});
        let err = schema().validate(&payload).unwrap_err();
        assert!(err.to_string().contains("items"));
    }

    #[test]
    fn test_wrong_type() {
        let payload = json!({"summary": 42, "items": []});
        let err = schema().validate(&payload).unwrap_err();
        assert_eq!(err.category(), "schema_validation_error");
    }

    #[test]
    fn test_null_required_rejected() {
        let payload = json!({"summary": null, "items": []});
        assert!(schema().validate(&payload).is_err());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(schema().validate(&json!("just a string")).is_err());
    }
}

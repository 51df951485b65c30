//! Scenario input model
//!
//! A scenario is the immutable input to a benchmark run: what to teach,
//! to whom, under which constraints. Context attributes are free-form
//! categorical buckets; unknown values are carried through untouched and
//! simply match no weight adjustment downstream.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::IsdError;

/// Categorical context of the training request.
///
/// Every attribute is optional; scenarios describe only what they know.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,

    /// Duration bucket: "short (1 week or less)", "long (1-6 months)"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// Learning environment, e.g. "online", "corporate training center"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// e.g. "corporate", "university", "k-12 school"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_type: Option<String>,

    /// Age bucket, e.g. "teens", "20s", "30s", "40s and above"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_band: Option<String>,

    /// e.g. "elementary", "middle school", "high school", "undergraduate", "adult"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education_level: Option<String>,

    /// Domain expertise of the learners: "novice", "intermediate", "advanced"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expertise_level: Option<String>,

    /// Subject domain, e.g. "Software/IT", "Medical/Nursing", "Language"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_domain: Option<String>,

    /// e.g. "offline classroom", "online live", "blended", "simulation/VR"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_mode: Option<String>,

    /// Class size bucket: "small (1-10)", "medium (10-30)", "large (30+)"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_size: Option<String>,
}

/// One benchmark scenario. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub context: ContextAttributes,
    pub learning_goals: Vec<String>,
    #[serde(default)]
    pub constraints: HashMap<String, Value>,
}

impl Scenario {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            context: ContextAttributes::default(),
            learning_goals: Vec::new(),
            constraints: HashMap::new(),
        }
    }

    /// Parse and validate a scenario from JSON.
    pub fn from_json(json: &str) -> Result<Self, IsdError> {
        let scenario: Scenario = serde_json::from_str(json)
            .map_err(|e| IsdError::InputValidation(format!("scenario parse: {}", e)))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Structural validation: id, title and at least one learning goal.
    pub fn validate(&self) -> Result<(), IsdError> {
        if self.id.trim().is_empty() {
            return Err(IsdError::InputValidation("scenario id is empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(IsdError::InputValidation("scenario title is empty".to_string()));
        }
        if self.learning_goals.is_empty() {
            return Err(IsdError::InputValidation(
                "scenario has no learning goals".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_from_json() {
        let json = r#"{
            "id": "scn-001",
            "title": "Intro to Python",
            "context": {
                "age_band": "20s",
                "subject_domain": "Software/IT",
                "delivery_mode": "online asynchronous (LMS)"
            },
            "learning_goals": ["Understand variables", "Write loops"]
        }"#;
        let scenario = Scenario::from_json(json).unwrap();
        assert_eq!(scenario.id, "scn-001");
        assert_eq!(scenario.learning_goals.len(), 2);
        assert_eq!(scenario.context.age_band.as_deref(), Some("20s"));
        assert!(scenario.context.class_size.is_none());
    }

    #[test]
    fn test_scenario_without_goals_rejected() {
        let json = r#"{"id": "scn-002", "title": "Empty", "learning_goals": []}"#;
        let err = Scenario::from_json(json).unwrap_err();
        assert_eq!(err.category(), "input_validation_error");
    }
}

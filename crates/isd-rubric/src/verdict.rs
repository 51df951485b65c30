//! Quality verdicts produced at feedback gates
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who is judging at a review gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaterRole {
    Client,
    Expert,
    Learner,
}

impl RaterRole {
    pub fn label(&self) -> &'static str {
        match self {
            RaterRole::Client => "client",
            RaterRole::Expert => "expert",
            RaterRole::Learner => "learner",
        }
    }
}

/// One gate judgement: a headline score on a 0-10 scale, optional
/// per-sub-criterion grades, and a pass flag against the gate threshold.
/// Verdicts are immutable; gates keep the full history across loop
/// iterations rather than overwriting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rater: Option<RaterRole>,
    pub score: f64,
    #[serde(default)]
    pub sub_grades: BTreeMap<u8, u8>,
    pub passed: bool,
    pub rationale: String,
}

impl QualityVerdict {
    /// Verdict from a single rater, scored against a threshold.
    pub fn rated(rater: RaterRole, score: f64, threshold: f64, rationale: impl Into<String>) -> Self {
        let score = score.clamp(0.0, 10.0);
        Self {
            rater: Some(rater),
            score,
            sub_grades: BTreeMap::new(),
            passed: score >= threshold,
            rationale: rationale.into(),
        }
    }

    /// Fail-safe verdict used when gate computation itself failed:
    /// score zero, never passing.
    pub fn fail_safe(reason: impl Into<String>) -> Self {
        Self {
            rater: None,
            score: 0.0,
            sub_grades: BTreeMap::new(),
            passed: false,
            rationale: reason.into(),
        }
    }

    pub fn with_sub_grades(mut self, grades: BTreeMap<u8, u8>) -> Self {
        self.sub_grades = grades;
        self
    }

    pub fn is_passing(&self) -> bool {
        self.passed
    }
}

//! Fixed rubric structure: 33 sub-criteria, 13 categories, 5 phases
//!
//! The structure is data, not code: scorers iterate these tables, they
//! never hard-code criterion knowledge.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The five instructional-design phases.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Analysis,
    Design,
    Development,
    Implementation,
    Evaluation,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Analysis,
        Phase::Design,
        Phase::Development,
        Phase::Implementation,
        Phase::Evaluation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Analysis => "analysis",
            Phase::Design => "design",
            Phase::Development => "development",
            Phase::Implementation => "implementation",
            Phase::Evaluation => "evaluation",
        }
    }
}

/// One of the 33 gradeable sub-criteria.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SubCriterion {
    pub id: u8,
    pub name: &'static str,
    pub phase: Phase,
    /// Category the sub-criterion rolls up into (e.g. "A1").
    pub category: &'static str,
}

/// One of the 13 aggregation categories.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub phase: Phase,
    pub sub_ids: &'static [u8],
}

pub const SUB_CRITERIA: [SubCriterion; 33] = [
    // Analysis (1-10)
    SubCriterion { id: 1, name: "Problem identification and definition", phase: Phase::Analysis, category: "A1" },
    SubCriterion { id: 2, name: "Gap analysis", phase: Phase::Analysis, category: "A1" },
    SubCriterion { id: 3, name: "Performance analysis", phase: Phase::Analysis, category: "A1" },
    SubCriterion { id: 4, name: "Needs prioritization", phase: Phase::Analysis, category: "A1" },
    SubCriterion { id: 5, name: "Learner analysis", phase: Phase::Analysis, category: "A2" },
    SubCriterion { id: 6, name: "Environment analysis", phase: Phase::Analysis, category: "A2" },
    SubCriterion { id: 7, name: "Initial goal analysis", phase: Phase::Analysis, category: "A3" },
    SubCriterion { id: 8, name: "Subordinate skills analysis", phase: Phase::Analysis, category: "A3" },
    SubCriterion { id: 9, name: "Entry behavior analysis", phase: Phase::Analysis, category: "A3" },
    SubCriterion { id: 10, name: "Task analysis review", phase: Phase::Analysis, category: "A3" },
    // Design (11-18)
    SubCriterion { id: 11, name: "Learning objective refinement", phase: Phase::Design, category: "D1" },
    SubCriterion { id: 12, name: "Assessment planning", phase: Phase::Design, category: "D1" },
    SubCriterion { id: 13, name: "Instructional content selection", phase: Phase::Design, category: "D2" },
    SubCriterion { id: 14, name: "Instructional strategy formulation", phase: Phase::Design, category: "D2" },
    SubCriterion { id: 15, name: "Non-instructional strategy formulation", phase: Phase::Design, category: "D2" },
    SubCriterion { id: 16, name: "Media selection and utilization planning", phase: Phase::Design, category: "D2" },
    SubCriterion { id: 17, name: "Learning activity and time structuring", phase: Phase::Design, category: "D2" },
    SubCriterion { id: 18, name: "Storyboard and screen flow design", phase: Phase::Design, category: "D3" },
    // Development (19-23)
    SubCriterion { id: 19, name: "Learner material development", phase: Phase::Development, category: "Dev1" },
    SubCriterion { id: 20, name: "Instructor manual development", phase: Phase::Development, category: "Dev1" },
    SubCriterion { id: 21, name: "Operator manual development", phase: Phase::Development, category: "Dev1" },
    SubCriterion { id: 22, name: "Assessment instrument development", phase: Phase::Development, category: "Dev1" },
    SubCriterion { id: 23, name: "Expert review", phase: Phase::Development, category: "Dev2" },
    // Implementation (24-27)
    SubCriterion { id: 24, name: "Instructor and operator orientation", phase: Phase::Implementation, category: "I1" },
    SubCriterion { id: 25, name: "System and environment check", phase: Phase::Implementation, category: "I1" },
    SubCriterion { id: 26, name: "Prototype run", phase: Phase::Implementation, category: "I2" },
    SubCriterion { id: 27, name: "Operations monitoring and support", phase: Phase::Implementation, category: "I2" },
    // Evaluation (28-33)
    SubCriterion { id: 28, name: "Pilot data collection", phase: Phase::Evaluation, category: "E1" },
    SubCriterion { id: 29, name: "Formative revision", phase: Phase::Evaluation, category: "E1" },
    SubCriterion { id: 30, name: "Summative instrument development", phase: Phase::Evaluation, category: "E2" },
    SubCriterion { id: 31, name: "Summative evaluation and effect analysis", phase: Phase::Evaluation, category: "E2" },
    SubCriterion { id: 32, name: "Program adoption decision", phase: Phase::Evaluation, category: "E2" },
    SubCriterion { id: 33, name: "Program improvement", phase: Phase::Evaluation, category: "E3" },
];

pub const CATEGORIES: [Category; 13] = [
    Category { id: "A1", name: "Needs analysis", phase: Phase::Analysis, sub_ids: &[1, 2, 3, 4] },
    Category { id: "A2", name: "Learner and environment analysis", phase: Phase::Analysis, sub_ids: &[5, 6] },
    Category { id: "A3", name: "Task and goal analysis", phase: Phase::Analysis, sub_ids: &[7, 8, 9, 10] },
    Category { id: "D1", name: "Assessment and objective alignment design", phase: Phase::Design, sub_ids: &[11, 12] },
    Category { id: "D2", name: "Instructional strategy and learning experience design", phase: Phase::Design, sub_ids: &[13, 14, 15, 16, 17] },
    Category { id: "D3", name: "Prototype structure design", phase: Phase::Design, sub_ids: &[18] },
    Category { id: "Dev1", name: "Prototype development", phase: Phase::Development, sub_ids: &[19, 20, 21, 22] },
    Category { id: "Dev2", name: "Development review and revision", phase: Phase::Development, sub_ids: &[23] },
    Category { id: "I1", name: "Program run preparation", phase: Phase::Implementation, sub_ids: &[24, 25] },
    Category { id: "I2", name: "Program run", phase: Phase::Implementation, sub_ids: &[26, 27] },
    Category { id: "E1", name: "Formative evaluation", phase: Phase::Evaluation, sub_ids: &[28, 29] },
    Category { id: "E2", name: "Summative evaluation and adoption decision", phase: Phase::Evaluation, sub_ids: &[30, 31, 32] },
    Category { id: "E3", name: "Program improvement and feedback", phase: Phase::Evaluation, sub_ids: &[33] },
];

static SUB_BY_ID: Lazy<HashMap<u8, &'static SubCriterion>> =
    Lazy::new(|| SUB_CRITERIA.iter().map(|s| (s.id, s)).collect());

pub fn sub_criterion(id: u8) -> Option<&'static SubCriterion> {
    SUB_BY_ID.get(&id).copied()
}

/// Categories belonging to one phase, in table order.
pub fn categories_for(phase: Phase) -> impl Iterator<Item = &'static Category> {
    CATEGORIES.iter().filter(move |c| c.phase == phase)
}

//! isd-rubric: rubric scoring for instructional-design benchmark runs
//!
//! Holds the fixed rubric structure (33 sub-criteria → 13 categories →
//! 5 phases), gate verdicts and multi-rater aggregation, context-driven
//! phase weights, and the two-axis scorer (content 70% / trajectory 30%).
//!
//! ```ignore
//! use isd_rubric::{ContextWeightResolver, RubricScorer, ToolPlan};
//!
//! let weights = ContextWeightResolver::resolve(&scenario.context);
//! let scorer = RubricScorer::new(grader, graph.tool_plan());
//! let artifact = scorer
//!     .score(&scenario.id, "addie", &output, &trajectory, &weights)
//!     .await;
//! println!("final: {:.1}", artifact.final_score);
//! ```

pub mod aggregate;
pub mod criteria;
pub mod scorer;
pub mod verdict;
pub mod weights;

pub use aggregate::FeedbackAggregator;
pub use criteria::{categories_for, sub_criterion, Category, Phase, SubCriterion, CATEGORIES, SUB_CRITERIA};
pub use scorer::{
    score_trajectory, GradeBackend, GradingFailure, PhaseOutput, PlanEntry, ReferenceExample,
    RubricScorer, ScoreArtifact, ToolPlan, TrajectoryBreakdown, CONTENT_WEIGHT, TRAJECTORY_WEIGHT,
};
pub use verdict::{QualityVerdict, RaterRole};
pub use weights::{ContextWeightResolver, WeightVector, WEIGHT_FLOOR};

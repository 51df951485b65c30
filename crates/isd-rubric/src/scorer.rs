//! Two-axis rubric scoring
//!
//! The content axis grades the produced program against the 33
//! sub-criteria through a grading backend; the trajectory axis is a
//! pure function of the recorded trajectory and the declared tool plan,
//! so replaying the same trajectory always yields the same process
//! score. The two axes combine 70/30 into the final score.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::warn;

use isd_core::{IsdError, Trajectory};

use crate::criteria::{Phase, SubCriterion, CATEGORIES, SUB_CRITERIA};
use crate::weights::WeightVector;

/// Weight of the content axis in the final score.
pub const CONTENT_WEIGHT: f64 = 0.7;
/// Weight of the trajectory axis in the final score.
pub const TRAJECTORY_WEIGHT: f64 = 0.3;

/// Grade applied when the backend fails for a sub-criterion.
const FAILURE_GRADE: f64 = 1.0;

/// The five-phase program under evaluation: one JSON fragment per phase.
pub type PhaseOutput = BTreeMap<Phase, Value>;

/// Few-shot reference fed to the grading backend alongside a fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceExample {
    pub sub_id: u8,
    pub exemplar: String,
    pub grade: u8,
}

/// The grading call boundary. Implementations wrap a judge model;
/// tests use deterministic stubs.
#[async_trait]
pub trait GradeBackend: Send + Sync {
    /// Grade one phase fragment against one sub-criterion, on a 1-10
    /// scale. Errors are degraded by the scorer, never propagated.
    async fn grade(
        &self,
        sub: &SubCriterion,
        fragment: &Value,
        references: &[ReferenceExample],
    ) -> Result<u8, IsdError>;
}

/// Declared stage → tool expectations, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolPlan {
    pub stages: Vec<PlanEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub stage: String,
    pub tools: Vec<String>,
}

impl ToolPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, stage: impl Into<String>, tools: &[&str]) -> Self {
        self.stages.push(PlanEntry {
            stage: stage.into(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    pub fn tools_for(&self, stage: &str) -> Option<&[String]> {
        self.stages
            .iter()
            .find(|e| e.stage == stage)
            .map(|e| e.tools.as_slice())
    }
}

/// The four 25-point process sub-scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryBreakdown {
    pub tool_selection: f64,
    pub argument_accuracy: f64,
    pub redundancy_avoidance: f64,
    pub result_utilization: f64,
}

impl TrajectoryBreakdown {
    pub fn total(&self) -> f64 {
        self.tool_selection
            + self.argument_accuracy
            + self.redundancy_avoidance
            + self.result_utilization
    }

    fn zero() -> Self {
        Self {
            tool_selection: 0.0,
            argument_accuracy: 0.0,
            redundancy_avoidance: 0.0,
            result_utilization: 0.0,
        }
    }
}

/// Score the process axis. Pure: depends only on the trajectory and the
/// declared plan, so a replay reproduces the score exactly.
///
/// An empty trajectory earns nothing on this axis.
pub fn score_trajectory(trajectory: &Trajectory, plan: &ToolPlan) -> TrajectoryBreakdown {
    let calls = trajectory.calls();
    if calls.is_empty() {
        return TrajectoryBreakdown::zero();
    }

    // Stage visits in first-seen order.
    let mut visits: Vec<(String, u32)> = Vec::new();
    for call in calls {
        let key = (call.stage.clone(), call.visit);
        if !visits.contains(&key) {
            visits.push(key);
        }
    }

    // === Tool selection ===
    // Per stage visit: recall over declared tools, precision over calls
    // actually made. Visits to stages with no declared tools score zero.
    let mut selection_sum = 0.0;
    for (stage, visit) in &visits {
        let visit_calls: Vec<_> = trajectory.calls_for(stage, *visit).collect();
        let score = match plan.tools_for(stage) {
            Some(declared) if !declared.is_empty() => {
                let declared_set: HashSet<&str> = declared.iter().map(|t| t.as_str()).collect();
                let on_plan = visit_calls
                    .iter()
                    .filter(|c| declared_set.contains(c.tool.as_str()))
                    .count();
                let invoked: HashSet<&str> = visit_calls
                    .iter()
                    .filter(|c| declared_set.contains(c.tool.as_str()))
                    .map(|c| c.tool.as_str())
                    .collect();
                let precision = on_plan as f64 / visit_calls.len() as f64;
                let recall = invoked.len() as f64 / declared.len() as f64;
                (precision + recall) / 2.0
            }
            _ => 0.0,
        };
        selection_sum += score;
    }
    let tool_selection = 25.0 * selection_sum / visits.len() as f64;

    // === Argument accuracy ===
    let valid = calls.iter().filter(|c| c.args_valid).count();
    let argument_accuracy = 25.0 * valid as f64 / calls.len() as f64;

    // === Redundancy avoidance ===
    let distinct: HashSet<(&str, &str)> = calls
        .iter()
        .map(|c| (c.tool.as_str(), c.args_hash.as_str()))
        .collect();
    let redundancy_avoidance = 25.0 * distinct.len() as f64 / calls.len() as f64;

    // === Result utilization ===
    // From the second stage visit on, at least one call must have fed on
    // a fragment produced by an earlier stage.
    let result_utilization = if visits.len() < 2 {
        25.0
    } else {
        let mut utilized = 0usize;
        let mut earlier: HashSet<&str> = HashSet::new();
        earlier.insert(visits[0].0.as_str());
        for (stage, visit) in &visits[1..] {
            let used = trajectory.calls_for(stage, *visit).any(|c| {
                c.context_stages.iter().any(|s| earlier.contains(s.as_str()))
            });
            if used {
                utilized += 1;
            }
            earlier.insert(stage.as_str());
        }
        25.0 * utilized as f64 / (visits.len() - 1) as f64
    };

    TrajectoryBreakdown {
        tool_selection,
        argument_accuracy,
        redundancy_avoidance,
        result_utilization,
    }
}

/// A grading failure degraded to the minimum grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingFailure {
    pub sub_id: u8,
    pub detail: String,
}

/// Full scoring result for one (scenario, agent) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreArtifact {
    pub scenario_id: String,
    pub agent_id: String,
    /// Content axis, 0-100.
    pub content_score: f64,
    /// Trajectory axis, 0-100.
    pub trajectory_score: f64,
    /// `content * 0.7 + trajectory * 0.3`.
    pub final_score: f64,
    /// Per-phase means on the 0-10 scale.
    pub phase_scores: BTreeMap<Phase, f64>,
    pub category_scores: BTreeMap<String, f64>,
    pub sub_grades: BTreeMap<u8, f64>,
    pub trajectory_breakdown: TrajectoryBreakdown,
    /// Sub-criteria whose grading call failed (grade forced to 1).
    pub flagged: Vec<GradingFailure>,
    /// One-line account of how the final score came together.
    pub rationale: String,
    pub weights: WeightVector,
    pub graded_at: DateTime<Utc>,
}

/// Scores one run on both axes.
pub struct RubricScorer {
    grader: Arc<dyn GradeBackend>,
    plan: ToolPlan,
    references: BTreeMap<u8, Vec<ReferenceExample>>,
}

impl RubricScorer {
    pub fn new(grader: Arc<dyn GradeBackend>, plan: ToolPlan) -> Self {
        Self {
            grader,
            plan,
            references: BTreeMap::new(),
        }
    }

    pub fn with_references(mut self, references: Vec<ReferenceExample>) -> Self {
        for reference in references {
            self.references.entry(reference.sub_id).or_default().push(reference);
        }
        self
    }

    pub async fn score(
        &self,
        scenario_id: &str,
        agent_id: &str,
        output: &PhaseOutput,
        trajectory: &Trajectory,
        weights: &WeightVector,
    ) -> ScoreArtifact {
        let mut sub_grades: BTreeMap<u8, f64> = BTreeMap::new();
        let mut flagged = Vec::new();

        for sub in &SUB_CRITERIA {
            let fragment = output.get(&sub.phase).cloned().unwrap_or(Value::Null);
            let references = self
                .references
                .get(&sub.id)
                .map(|r| r.as_slice())
                .unwrap_or(&[]);
            match self.grader.grade(sub, &fragment, references).await {
                Ok(grade) => {
                    sub_grades.insert(sub.id, f64::from(grade.clamp(1, 10)));
                }
                Err(e) => {
                    warn!(sub_id = sub.id, error = %e, "grading failed, forcing minimum grade");
                    sub_grades.insert(sub.id, FAILURE_GRADE);
                    flagged.push(GradingFailure {
                        sub_id: sub.id,
                        detail: e.to_string(),
                    });
                }
            }
        }

        // Sub-criteria → category means → phase means. Every id in
        // SUB_CRITERIA was graded above (failures degrade to the
        // minimum grade), so the lookup cannot miss.
        let mut category_scores: BTreeMap<String, f64> = BTreeMap::new();
        for category in &CATEGORIES {
            let sum: f64 = category.sub_ids.iter().map(|id| sub_grades[id]).sum();
            category_scores.insert(category.id.to_string(), sum / category.sub_ids.len() as f64);
        }

        let mut phase_scores: BTreeMap<Phase, f64> = BTreeMap::new();
        for phase in Phase::ALL {
            let scores: Vec<f64> = CATEGORIES
                .iter()
                .filter(|c| c.phase == phase)
                .map(|c| category_scores[c.id])
                .collect();
            phase_scores.insert(phase, scores.iter().sum::<f64>() / scores.len() as f64);
        }

        // Phase means are 0-10; weighting lifts content to 0-100.
        let content_score: f64 = Phase::ALL
            .iter()
            .map(|p| weights.get(*p) * phase_scores[p] * 10.0)
            .sum();

        let trajectory_breakdown = score_trajectory(trajectory, &self.plan);
        let trajectory_score = trajectory_breakdown.total();
        let final_score = content_score * CONTENT_WEIGHT + trajectory_score * TRAJECTORY_WEIGHT;

        let mut rationale = format!(
            "content {:.1} over {} sub-criteria, trajectory {:.1}, final {:.1}",
            content_score,
            SUB_CRITERIA.len(),
            trajectory_score,
            final_score
        );
        if !flagged.is_empty() {
            rationale.push_str(&format!(
                "; {} grading failure(s) degraded to grade 1",
                flagged.len()
            ));
        }

        ScoreArtifact {
            scenario_id: scenario_id.to_string(),
            agent_id: agent_id.to_string(),
            content_score,
            trajectory_score,
            final_score,
            phase_scores,
            category_scores,
            sub_grades,
            trajectory_breakdown,
            flagged,
            rationale,
            weights: *weights,
            graded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isd_core::{ToolCall, ToolOutcome};
    use serde_json::json;

    /// Deterministic grader: fixed grade per sub-criterion id.
    struct StubGrader {
        grades: BTreeMap<u8, u8>,
        default: u8,
        fail_ids: Vec<u8>,
    }

    impl StubGrader {
        fn uniform(grade: u8) -> Self {
            Self {
                grades: BTreeMap::new(),
                default: grade,
                fail_ids: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl GradeBackend for StubGrader {
        async fn grade(
            &self,
            sub: &SubCriterion,
            _fragment: &Value,
            _references: &[ReferenceExample],
        ) -> Result<u8, IsdError> {
            if self.fail_ids.contains(&sub.id) {
                return Err(IsdError::Provider("judge unavailable".to_string()));
            }
            Ok(self.grades.get(&sub.id).copied().unwrap_or(self.default))
        }
    }

    fn output_with_all_phases() -> PhaseOutput {
        Phase::ALL
            .iter()
            .map(|p| (*p, json!({"summary": p.label()})))
            .collect()
    }

    fn successful_call(tool: &str, stage: &str, args: Value) -> ToolCall {
        ToolCall::new(
            tool,
            stage,
            0,
            args,
            ToolOutcome::Success { value: json!({}) },
        )
    }

    #[tokio::test]
    async fn test_uniform_grades_give_expected_content_score() {
        let scorer = RubricScorer::new(Arc::new(StubGrader::uniform(8)), ToolPlan::new());
        let artifact = scorer
            .score(
                "scn-001",
                "addie",
                &output_with_all_phases(),
                &Trajectory::new(),
                &WeightVector::baseline(),
            )
            .await;
        assert!((artifact.content_score - 80.0).abs() < 1e-9);
        assert_eq!(artifact.trajectory_score, 0.0);
        assert!((artifact.final_score - 56.0).abs() < 1e-9);
        // every sub-criterion carries a grade, even on an empty plan
        assert_eq!(artifact.sub_grades.len(), SUB_CRITERIA.len());
    }

    #[tokio::test]
    async fn test_category_mean_aggregation() {
        let mut grader = StubGrader::uniform(7);
        grader.grades = [(1u8, 8u8), (2, 7), (3, 6), (4, 9)].into_iter().collect();
        let scorer = RubricScorer::new(Arc::new(grader), ToolPlan::new());
        let artifact = scorer
            .score(
                "scn-001",
                "addie",
                &output_with_all_phases(),
                &Trajectory::new(),
                &WeightVector::baseline(),
            )
            .await;
        assert!((artifact.category_scores["A1"] - 7.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_grading_failure_forces_minimum_and_flags() {
        let mut grader = StubGrader::uniform(8);
        grader.fail_ids = vec![5];
        let scorer = RubricScorer::new(Arc::new(grader), ToolPlan::new());
        let artifact = scorer
            .score(
                "scn-001",
                "addie",
                &output_with_all_phases(),
                &Trajectory::new(),
                &WeightVector::baseline(),
            )
            .await;
        assert_eq!(artifact.sub_grades[&5], 1.0);
        assert_eq!(artifact.flagged.len(), 1);
        assert_eq!(artifact.flagged[0].sub_id, 5);
        assert!(artifact.rationale.contains("1 grading failure"));
        // A2 = mean(1, 8) = 4.5
        assert!((artifact.category_scores["A2"] - 4.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_scoring_is_idempotent_with_deterministic_grader() {
        let scorer = RubricScorer::new(
            Arc::new(StubGrader::uniform(6)),
            ToolPlan::new().add("analysis", &["analyze_needs"]),
        );
        let output = output_with_all_phases();
        let mut trajectory = Trajectory::new();
        trajectory.record(successful_call("analyze_needs", "analysis", json!({"goal": "x"})));
        let weights = WeightVector::baseline();

        let first = scorer.score("scn-001", "addie", &output, &trajectory, &weights).await;
        let second = scorer.score("scn-001", "addie", &output, &trajectory, &weights).await;
        assert_eq!(first.content_score, second.content_score);
        assert_eq!(first.trajectory_score, second.trajectory_score);
        assert_eq!(first.final_score, second.final_score);
        assert_eq!(first.sub_grades, second.sub_grades);
    }

    #[test]
    fn test_trajectory_axis_full_marks_on_clean_run() {
        let plan = ToolPlan::new()
            .add("analysis", &["analyze_needs", "analyze_learner"])
            .add("design", &["design_objectives"]);
        let mut trajectory = Trajectory::new();
        trajectory.record(successful_call("analyze_needs", "analysis", json!({"goal": "a"})));
        trajectory.record(successful_call("analyze_learner", "analysis", json!({"goal": "b"})));
        let mut design_call =
            successful_call("design_objectives", "design", json!({"needs": "from analysis"}));
        design_call.context_stages = vec!["analysis".to_string()];
        trajectory.record(design_call);

        let breakdown = score_trajectory(&trajectory, &plan);
        assert!((breakdown.tool_selection - 25.0).abs() < 1e-9);
        assert!((breakdown.argument_accuracy - 25.0).abs() < 1e-9);
        assert!((breakdown.redundancy_avoidance - 25.0).abs() < 1e-9);
        assert!((breakdown.result_utilization - 25.0).abs() < 1e-9);
        assert!((breakdown.total() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_call_lowers_redundancy_only() {
        let plan = ToolPlan::new().add("analysis", &["analyze_needs"]);
        let mut trajectory = Trajectory::new();
        let call = successful_call("analyze_needs", "analysis", json!({"goal": "a"}));
        trajectory.record(call.clone());
        trajectory.record(call);

        let breakdown = score_trajectory(&trajectory, &plan);
        assert!((breakdown.redundancy_avoidance - 12.5).abs() < 1e-9);
        assert!((breakdown.tool_selection - 25.0).abs() < 1e-9);

        // Same tool, different args: not redundant.
        let mut varied = Trajectory::new();
        varied.record(successful_call("analyze_needs", "analysis", json!({"goal": "a"})));
        varied.record(successful_call("analyze_needs", "analysis", json!({"goal": "b"})));
        let breakdown = score_trajectory(&varied, &plan);
        assert!((breakdown.redundancy_avoidance - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_args_lower_accuracy() {
        let plan = ToolPlan::new().add("analysis", &["analyze_needs"]);
        let mut trajectory = Trajectory::new();
        let mut bad = successful_call("analyze_needs", "analysis", json!({}));
        bad.args_valid = false;
        trajectory.record(bad);
        trajectory.record(successful_call("analyze_needs", "analysis", json!({"goal": "a"})));

        let breakdown = score_trajectory(&trajectory, &plan);
        assert!((breakdown.argument_accuracy - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_off_plan_stage_scores_zero_selection() {
        let plan = ToolPlan::new().add("analysis", &["analyze_needs"]);
        let mut trajectory = Trajectory::new();
        trajectory.record(successful_call("freestyle_tool", "improvisation", json!({})));
        let breakdown = score_trajectory(&trajectory, &plan);
        assert_eq!(breakdown.tool_selection, 0.0);
    }

    #[test]
    fn test_replay_reproduces_breakdown() {
        let plan = ToolPlan::new()
            .add("analysis", &["analyze_needs"])
            .add("design", &["design_objectives", "design_assessment"]);
        let mut trajectory = Trajectory::new();
        trajectory.record(successful_call("analyze_needs", "analysis", json!({"goal": "a"})));
        let mut design_call = successful_call("design_objectives", "design", json!({"n": 1}));
        design_call.context_stages = vec!["analysis".to_string()];
        trajectory.record(design_call);

        let first = score_trajectory(&trajectory, &plan);
        let second = score_trajectory(&trajectory, &plan);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_trajectory_earns_nothing() {
        let breakdown = score_trajectory(&Trajectory::new(), &ToolPlan::new());
        assert_eq!(breakdown.total(), 0.0);
    }
}

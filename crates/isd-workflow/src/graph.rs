//! Stage graphs: validated stage sequences with gated feedback loops
//!
//! A graph is a forward chain of stages plus at most two quality gates.
//! Each gate sits after a stage and may send control back to an earlier
//! stage; the engine enforces the gate's iteration budget. Graphs are
//! plain data and can be declared in YAML.

use serde::{Deserialize, Serialize};

use isd_core::{FieldType, IsdError, ObjectSchema, ToolDescriptor, ToolRegistry};
use isd_rubric::{Phase, RaterRole, ToolPlan};

use crate::stage::StageNode;

/// Most gates a single graph may carry (dual-loop designs use two).
pub const MAX_GATES: usize = 2;

/// A quality gate attached after a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSpec {
    /// Stage whose completion triggers the review.
    pub after: String,
    /// Earlier stage control returns to on a failing review.
    pub loop_to: String,
    /// Review panel; empty means a single expert rater.
    #[serde(default)]
    pub raters: Vec<RaterRole>,
    /// Score (0-10) at or above which the review passes.
    pub threshold: f64,
    /// Loop-back budget for this gate.
    pub max_iterations: u32,
    /// Stable label; loop state is tracked per label.
    pub label: String,
}

/// A validated workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageGraph {
    pub name: String,
    pub stages: Vec<StageNode>,
    #[serde(default)]
    pub gates: Vec<GateSpec>,
}

impl StageGraph {
    /// Parse a graph declared in YAML and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self, IsdError> {
        let graph: StageGraph = serde_yaml::from_str(yaml)
            .map_err(|e| IsdError::InputValidation(format!("stage graph parse: {}", e)))?;
        graph.validate()?;
        Ok(graph)
    }

    pub fn validate(&self) -> Result<(), IsdError> {
        if self.stages.is_empty() {
            return Err(IsdError::InputValidation(format!(
                "graph '{}' has no stages",
                self.name
            )));
        }
        for (i, stage) in self.stages.iter().enumerate() {
            if self.stages[..i].iter().any(|s| s.name == stage.name) {
                return Err(IsdError::InputValidation(format!(
                    "duplicate stage name '{}'",
                    stage.name
                )));
            }
        }
        if self.gates.len() > MAX_GATES {
            return Err(IsdError::InputValidation(format!(
                "graph '{}' declares {} gates, at most {} allowed",
                self.name,
                self.gates.len(),
                MAX_GATES
            )));
        }
        for (i, gate) in self.gates.iter().enumerate() {
            if self.gates[..i].iter().any(|g| g.label == gate.label) {
                return Err(IsdError::InputValidation(format!(
                    "duplicate gate label '{}'",
                    gate.label
                )));
            }
            if gate.max_iterations == 0 {
                return Err(IsdError::InputValidation(format!(
                    "gate '{}' needs max_iterations >= 1",
                    gate.label
                )));
            }
            let after = self.index_of(&gate.after).ok_or_else(|| {
                IsdError::InputValidation(format!(
                    "gate '{}' refers to unknown stage '{}'",
                    gate.label, gate.after
                ))
            })?;
            let loop_to = self.index_of(&gate.loop_to).ok_or_else(|| {
                IsdError::InputValidation(format!(
                    "gate '{}' loops to unknown stage '{}'",
                    gate.label, gate.loop_to
                ))
            })?;
            // only back-edges: forward jumps would skip work silently
            if loop_to > after {
                return Err(IsdError::InputValidation(format!(
                    "gate '{}' must loop to an earlier stage",
                    gate.label
                )));
            }
        }
        Ok(())
    }

    pub fn index_of(&self, stage: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name == stage)
    }

    pub fn gate_after(&self, stage: &str) -> Option<&GateSpec> {
        self.gates.iter().find(|g| g.after == stage)
    }

    /// Declared stage → tool expectations, for trajectory scoring.
    pub fn tool_plan(&self) -> ToolPlan {
        let mut plan = ToolPlan::new();
        for stage in &self.stages {
            let tools: Vec<&str> = stage.tools.iter().map(|t| t.as_str()).collect();
            plan = plan.add(&stage.name, &tools);
        }
        plan
    }

    /// Registry with one generic descriptor per declared tool: the
    /// executor always feeds `{scenario, state}`, outputs are free-form
    /// objects. Callers with stricter contracts register their own.
    pub fn descriptor_registry(&self) -> ToolRegistry {
        let input = ObjectSchema::new()
            .require("scenario", FieldType::Object)
            .require("state", FieldType::Object);
        let mut registry = ToolRegistry::new();
        for stage in &self.stages {
            for tool in &stage.tools {
                if !registry.contains(tool) {
                    registry.register(
                        ToolDescriptor::new(tool, format!("{} ({} stage)", tool, stage.name))
                            .with_input(input.clone()),
                    );
                }
            }
        }
        registry
    }

    // === Preset workflows ===

    /// Linear ADDIE: five phases, no feedback gate.
    pub fn addie() -> Self {
        Self {
            name: "addie".to_string(),
            stages: vec![
                StageNode::new(
                    "analysis",
                    Phase::Analysis,
                    &["analyze_needs", "analyze_learner", "analyze_context", "analyze_task"],
                ),
                StageNode::new(
                    "design",
                    Phase::Design,
                    &["design_objectives", "design_assessment", "design_strategy"],
                ),
                StageNode::new(
                    "development",
                    Phase::Development,
                    &["create_lesson_plan", "create_materials"],
                ),
                StageNode::new(
                    "implementation",
                    Phase::Implementation,
                    &["create_implementation_plan", "create_maintenance_plan"],
                ),
                StageNode::new(
                    "evaluation",
                    Phase::Evaluation,
                    &["create_quiz_items", "create_rubric", "create_program_evaluation"],
                ),
            ],
            gates: vec![],
        }
    }

    /// Dick & Carey: formative evaluation gate loops back to strategy
    /// and materials, up to three revisions.
    pub fn dick_carey() -> Self {
        Self {
            name: "dick_carey".to_string(),
            stages: vec![
                StageNode::new(
                    "goal_analysis",
                    Phase::Analysis,
                    &["analyze_goals", "analyze_learners_context"],
                ),
                StageNode::new(
                    "objectives",
                    Phase::Design,
                    &["write_objectives", "develop_assessments"],
                ),
                StageNode::new(
                    "strategy_materials",
                    Phase::Development,
                    &["develop_strategy", "develop_materials"],
                ),
                StageNode::new(
                    "formative_evaluation",
                    Phase::Evaluation,
                    &["run_formative_evaluation"],
                ),
                StageNode::new(
                    "instruction_delivery",
                    Phase::Implementation,
                    &["plan_instruction_delivery"],
                ),
                StageNode::new(
                    "summative_evaluation",
                    Phase::Evaluation,
                    &["design_summative_evaluation"],
                ),
            ],
            gates: vec![GateSpec {
                after: "formative_evaluation".to_string(),
                loop_to: "strategy_materials".to_string(),
                raters: vec![],
                threshold: 6.5,
                max_iterations: 3,
                label: "formative".to_string(),
            }],
        }
    }

    /// RPISD: rapid prototyping with two independent review loops, each
    /// judged by a client/expert/learner panel.
    pub fn rpisd() -> Self {
        let panel = vec![RaterRole::Client, RaterRole::Expert, RaterRole::Learner];
        Self {
            name: "rpisd".to_string(),
            stages: vec![
                StageNode::new(
                    "analysis",
                    Phase::Analysis,
                    &["analyze_needs_rapid", "define_requirements"],
                ),
                StageNode::new(
                    "prototype_design",
                    Phase::Design,
                    &["design_prototype", "design_assessment_plan"],
                ),
                StageNode::new(
                    "prototype_review",
                    Phase::Design,
                    &["collect_usability_feedback"],
                ),
                StageNode::new(
                    "development",
                    Phase::Development,
                    &["develop_full_course", "develop_support_materials"],
                ),
                StageNode::new(
                    "development_review",
                    Phase::Development,
                    &["collect_development_feedback"],
                ),
                StageNode::new("implementation", Phase::Implementation, &["run_pilot_program"]),
                StageNode::new("evaluation", Phase::Evaluation, &["evaluate_outcomes"]),
            ],
            gates: vec![
                GateSpec {
                    after: "prototype_review".to_string(),
                    loop_to: "prototype_design".to_string(),
                    raters: panel.clone(),
                    threshold: 7.5,
                    max_iterations: 2,
                    label: "prototype".to_string(),
                },
                GateSpec {
                    after: "development_review".to_string(),
                    loop_to: "development".to_string(),
                    raters: panel,
                    threshold: 7.5,
                    max_iterations: 2,
                    label: "development".to_string(),
                },
            ],
        }
    }
}

//! Run artifacts: what a finished (or cancelled) run leaves behind
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use isd_rubric::{PhaseOutput, QualityVerdict};

use crate::graph::StageGraph;
use crate::stage::{ProductionState, StageOutcome};

/// What the engine did at a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Send control back to the gate's loop target.
    LoopBack,
    /// End the cycle and continue forward.
    Proceed,
}

/// Per-gate loop bookkeeping. Each gate owns an independent state;
/// counters only ever grow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopState {
    pub label: String,
    /// Loop-backs taken so far.
    pub iteration: u32,
    pub max_iterations: u32,
    pub score_history: Vec<f64>,
    pub verdicts: Vec<QualityVerdict>,
    pub decisions: Vec<GateDecision>,
}

impl LoopState {
    pub fn new(label: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            label: label.into(),
            iteration: 0,
            max_iterations,
            score_history: Vec::new(),
            verdicts: Vec::new(),
            decisions: Vec::new(),
        }
    }
}

/// Execution metadata stamped on every artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub model_name: String,
    pub provider: String,
    /// Logical external calls recorded in the trajectory.
    pub external_calls: usize,
    pub elapsed_ms: u64,
    /// True when the run was cancelled before finishing the graph.
    pub incomplete: bool,
    pub engine_version: String,
}

/// The complete product of one run: structured output, full
/// trajectory, loop history, and every stage outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    pub run_id: String,
    pub scenario_id: String,
    pub agent_id: String,
    pub graph_name: String,
    pub produced_at: DateTime<Utc>,
    pub output: PhaseOutput,
    pub trajectory: isd_core::Trajectory,
    pub loops: Vec<LoopState>,
    pub stage_outcomes: Vec<StageOutcome>,
    pub metadata: RunMetadata,
}

/// Assemble the five-phase output from the final production state:
/// each phase collects the latest fragment of its stages, keyed by
/// stage name.
pub fn phase_output(graph: &StageGraph, state: &ProductionState) -> PhaseOutput {
    let mut output = PhaseOutput::new();
    for stage in &graph.stages {
        if let Some(fragment) = state.latest(&stage.name) {
            let entry = output
                .entry(stage.phase)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = entry {
                map.insert(stage.name.clone(), Value::Object(fragment.clone()));
            }
        }
    }
    output
}

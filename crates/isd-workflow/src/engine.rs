//! The workflow engine: graph walk, quality gates, loop control
//!
//! One run is one sequential control flow over a validated stage graph.
//! After a gated stage completes, the gate's panel reviews the current
//! production state; control loops back while the score is below the
//! threshold and the gate still has iteration budget, and proceeds
//! forward otherwise. A review that cannot be computed degrades to a
//! score-zero verdict rather than silently passing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use isd_core::{IsdError, RunContext, Scenario, ToolBackend, ToolRegistry, Trajectory};
use isd_rubric::{FeedbackAggregator, QualityVerdict, RaterRole};

use crate::artifact::{phase_output, GateDecision, LoopState, RunArtifact, RunMetadata};
use crate::config::EngineConfig;
use crate::executor::StageExecutor;
use crate::graph::{GateSpec, StageGraph};
use crate::stage::ProductionState;

/// The review call boundary at a gate. Implementations prompt a judge
/// model in the given rater's voice; tests use scripted verdicts.
#[async_trait]
pub trait GateEvaluator: Send + Sync {
    async fn review(
        &self,
        gate: &GateSpec,
        rater: RaterRole,
        scenario: &Scenario,
        state: &ProductionState,
    ) -> Result<QualityVerdict, IsdError>;
}

pub struct WorkflowEngine {
    graph: StageGraph,
    registry: ToolRegistry,
    backend: Arc<dyn ToolBackend>,
    gate_evaluator: Arc<dyn GateEvaluator>,
    config: EngineConfig,
}

impl WorkflowEngine {
    pub fn new(
        graph: StageGraph,
        registry: ToolRegistry,
        backend: Arc<dyn ToolBackend>,
        gate_evaluator: Arc<dyn GateEvaluator>,
        config: EngineConfig,
    ) -> Result<Self, IsdError> {
        graph.validate()?;
        Ok(Self {
            graph,
            registry,
            backend,
            gate_evaluator,
            config,
        })
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// Execute the graph for one scenario. Returns an artifact even on
    /// cancellation (tagged incomplete); only structural problems and
    /// invariant violations are errors.
    pub async fn run(
        &self,
        scenario: &Scenario,
        ctx: &RunContext,
    ) -> Result<RunArtifact, IsdError> {
        scenario.validate()?;
        let started = Instant::now();
        info!(run_id = %ctx.run_id, graph = %self.graph.name, scenario = %scenario.id, "run started");

        let executor = StageExecutor::new(&self.registry, self.backend.clone(), &self.config);
        let mut state = ProductionState::new();
        let mut trajectory = Trajectory::new();
        let mut outcomes = Vec::new();
        let mut visits: HashMap<String, u32> = HashMap::new();
        let mut loops: Vec<LoopState> = self
            .graph
            .gates
            .iter()
            .map(|g| LoopState::new(&g.label, g.max_iterations))
            .collect();
        let mut incomplete = false;

        let mut idx = 0usize;
        while idx < self.graph.stages.len() {
            // cancellation is cooperative and only honored between stages
            if ctx.cancel.is_cancelled() {
                info!(run_id = %ctx.run_id, "run cancelled, emitting partial artifact");
                incomplete = true;
                break;
            }

            let stage = &self.graph.stages[idx];
            let visit = match visits.get(&stage.name) {
                Some(prev) => prev + 1,
                None => 0,
            };
            visits.insert(stage.name.clone(), visit);

            let outcome = executor
                .execute(stage, visit, scenario, &state, &mut trajectory, ctx)
                .await?;
            info!(stage = %stage.name, visit, status = ?outcome.status, "stage finished");
            state.push(stage.name.clone(), visit, outcome.fragment.clone());
            outcomes.push(outcome);

            if let Some(gate) = self.graph.gate_after(&stage.name) {
                let loop_state = loops
                    .iter_mut()
                    .find(|l| l.label == gate.label)
                    .ok_or_else(|| {
                        IsdError::Internal(format!("no loop state for gate '{}'", gate.label))
                    })?;

                // each gate is evaluated at most budget + 1 times
                if loop_state.score_history.len() as u32 > gate.max_iterations {
                    return Err(IsdError::Internal(format!(
                        "gate '{}' exceeded its iteration budget",
                        gate.label
                    )));
                }

                let verdict = self.evaluate_gate(gate, scenario, &state).await;
                let decision = if verdict.score < gate.threshold
                    && loop_state.iteration < gate.max_iterations
                {
                    GateDecision::LoopBack
                } else {
                    GateDecision::Proceed
                };
                info!(
                    gate = %gate.label,
                    score = verdict.score,
                    threshold = gate.threshold,
                    iteration = loop_state.iteration,
                    ?decision,
                    "gate evaluated"
                );

                loop_state.score_history.push(verdict.score);
                loop_state.verdicts.push(verdict);
                loop_state.decisions.push(decision);

                if decision == GateDecision::LoopBack {
                    loop_state.iteration += 1;
                    idx = self.graph.index_of(&gate.loop_to).ok_or_else(|| {
                        IsdError::Internal(format!(
                            "gate '{}' loop target vanished",
                            gate.label
                        ))
                    })?;
                    continue;
                }
            }

            idx += 1;
        }

        let external_calls = trajectory.len();
        Ok(RunArtifact {
            run_id: ctx.run_id.clone(),
            scenario_id: scenario.id.clone(),
            agent_id: self.config.agent_id.clone(),
            graph_name: self.graph.name.clone(),
            produced_at: Utc::now(),
            output: phase_output(&self.graph, &state),
            trajectory,
            loops,
            stage_outcomes: outcomes,
            metadata: RunMetadata {
                model_name: self.config.model_name.clone(),
                provider: self.config.provider.clone(),
                external_calls,
                elapsed_ms: started.elapsed().as_millis() as u64,
                incomplete,
                engine_version: isd_core::ISD_BENCH_VERSION.to_string(),
            },
        })
    }

    /// Review the state with the gate's panel. A rater that cannot be
    /// reached yields a fail-safe score-zero verdict for the whole gate:
    /// a broken review must never pass work through.
    async fn evaluate_gate(
        &self,
        gate: &GateSpec,
        scenario: &Scenario,
        state: &ProductionState,
    ) -> QualityVerdict {
        let raters: Vec<RaterRole> = if gate.raters.is_empty() {
            vec![RaterRole::Expert]
        } else {
            gate.raters.clone()
        };

        let mut verdicts = Vec::with_capacity(raters.len());
        for rater in raters {
            match self
                .gate_evaluator
                .review(gate, rater, scenario, state)
                .await
            {
                Ok(verdict) => verdicts.push(verdict),
                Err(e) => {
                    warn!(gate = %gate.label, rater = rater.label(), error = %e, "gate review failed");
                    return QualityVerdict::fail_safe(format!(
                        "review by {} failed: {}",
                        rater.label(),
                        e
                    ));
                }
            }
        }

        if verdicts.len() == 1 {
            let mut verdict = verdicts.remove(0);
            verdict.passed = verdict.score >= gate.threshold;
            verdict
        } else {
            FeedbackAggregator::aggregate(&verdicts, gate.threshold)
        }
    }
}

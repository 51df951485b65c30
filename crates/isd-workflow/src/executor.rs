//! Stage execution: ordered tool calls with retry, timeout, validation
//!
//! The executor runs one stage at a time. Each declared tool gets its
//! input assembled from the scenario plus the merged prior state,
//! validated, invoked with bounded retries and a per-attempt deadline,
//! and its output validated against the tool's schema. Every logical
//! call lands in the trajectory, failed or not; a stage that loses all
//! its tools degrades to a failed outcome and the run moves on.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use isd_core::{
    IsdError, RunContext, Scenario, ToolBackend, ToolCall, ToolDescriptor, ToolFailure,
    ToolOutcome, ToolRegistry, Trajectory,
};

use crate::config::EngineConfig;
use crate::stage::{ProductionState, StageFailure, StageNode, StageOutcome, StageStatus};

pub struct StageExecutor<'a> {
    registry: &'a ToolRegistry,
    backend: Arc<dyn ToolBackend>,
    config: &'a EngineConfig,
}

impl<'a> StageExecutor<'a> {
    pub fn new(
        registry: &'a ToolRegistry,
        backend: Arc<dyn ToolBackend>,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            registry,
            backend,
            config,
        }
    }

    /// Run one stage visit. Only structural problems (a declared tool
    /// missing from the registry) escape as errors; tool failures
    /// degrade to a partial or failed outcome.
    pub async fn execute(
        &self,
        stage: &StageNode,
        visit: u32,
        scenario: &Scenario,
        state: &ProductionState,
        trajectory: &mut Trajectory,
        ctx: &RunContext,
    ) -> Result<StageOutcome, IsdError> {
        let started = Instant::now();
        let deadline = Duration::from_millis(self.config.stage_timeout_ms);
        let merged = state.merged();
        let context_stages: Vec<String> = state.stages().iter().map(|s| s.to_string()).collect();

        let mut fragment = Map::new();
        let mut failures = Vec::new();

        for (i, tool_name) in stage.tools.iter().enumerate() {
            if started.elapsed() > deadline {
                warn!(stage = %stage.name, "stage deadline exceeded, skipping remaining tools");
                for skipped in &stage.tools[i..] {
                    failures.push(StageFailure {
                        tool: skipped.clone(),
                        reason: "stage deadline exceeded".to_string(),
                    });
                }
                break;
            }

            let descriptor = self.registry.get(tool_name).ok_or_else(|| {
                IsdError::InputValidation(format!(
                    "stage '{}' declares unregistered tool '{}'",
                    stage.name, tool_name
                ))
            })?;

            let args = json!({
                "scenario": scenario,
                "state": Value::Object(merged.clone()),
            });

            // Input violations are the caller's fault: recorded, never retried.
            if let Err(e) = descriptor.input_schema.validate(&args) {
                warn!(tool = %tool_name, error = %e, "input schema violation");
                let mut call = ToolCall::new(
                    tool_name,
                    &stage.name,
                    visit,
                    args,
                    ToolOutcome::Failure {
                        reason: ToolFailure::SchemaViolation {
                            detail: e.to_string(),
                        },
                    },
                );
                call.args_valid = false;
                call.attempts = 0;
                call.context_stages = context_stages.clone();
                trajectory.record(call);
                failures.push(StageFailure {
                    tool: tool_name.clone(),
                    reason: e.to_string(),
                });
                continue;
            }

            let (outcome, attempts, latency_ms) =
                self.invoke_with_retry(descriptor, &args, ctx).await;

            match &outcome {
                ToolOutcome::Success { value } => {
                    debug!(tool = %tool_name, attempts, latency_ms, "tool call succeeded");
                    fragment.insert(tool_name.clone(), value.clone());
                }
                ToolOutcome::Failure { reason } => {
                    warn!(tool = %tool_name, attempts, %reason, "tool call exhausted retries");
                    failures.push(StageFailure {
                        tool: tool_name.clone(),
                        reason: reason.to_string(),
                    });
                }
            }

            let mut call = ToolCall::new(tool_name, &stage.name, visit, args, outcome);
            call.attempts = attempts;
            call.latency_ms = latency_ms;
            call.context_stages = context_stages.clone();
            trajectory.record(call);
        }

        let status = if failures.is_empty() {
            StageStatus::Success
        } else if fragment.is_empty() {
            StageStatus::Failed
        } else {
            StageStatus::Partial
        };

        Ok(StageOutcome {
            stage: stage.name.clone(),
            visit,
            status,
            fragment,
            failures,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// One logical call: up to `max_attempts` backend attempts, each
    /// under the per-call deadline, with doubling backoff in between.
    /// Output schema violations count as attempt failures since a fresh
    /// attempt may produce well-formed output.
    async fn invoke_with_retry(
        &self,
        descriptor: &ToolDescriptor,
        args: &Value,
        ctx: &RunContext,
    ) -> (ToolOutcome, u32, u64) {
        let started = Instant::now();
        let per_attempt = Duration::from_millis(self.config.tool_timeout_ms);
        let mut attempts = 0u32;
        let mut last_failure = ToolFailure::ProviderError {
            code: "no attempt made".to_string(),
        };

        while attempts < self.config.max_attempts {
            attempts += 1;

            let _permit = ctx.providers.acquire(self.backend.provider()).await;
            let result =
                match tokio::time::timeout(per_attempt, self.backend.invoke(descriptor, args)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(ToolFailure::Timeout),
                };

            match result {
                Ok(value) => match descriptor.output_schema.validate(&value) {
                    Ok(()) => {
                        return (
                            ToolOutcome::Success { value },
                            attempts,
                            started.elapsed().as_millis() as u64,
                        );
                    }
                    Err(e) => {
                        debug!(tool = %descriptor.name, attempt = attempts, error = %e, "malformed output");
                        last_failure = ToolFailure::SchemaViolation {
                            detail: e.to_string(),
                        };
                    }
                },
                Err(failure) => {
                    debug!(tool = %descriptor.name, attempt = attempts, %failure, "attempt failed");
                    last_failure = failure;
                }
            }

            if attempts < self.config.max_attempts {
                let backoff = self.config.retry_backoff_ms << (attempts - 1);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
        }

        (
            ToolOutcome::Failure {
                reason: last_failure,
            },
            attempts,
            started.elapsed().as_millis() as u64,
        )
    }
}

//! Append-only trajectory log
//!
//! Every logical tool invocation of a run is recorded as one `ToolCall`,
//! in strict invocation order. The trajectory has a single writer (the
//! executor) and is handed to scoring read-only; records are never
//! mutated or removed once appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool::ToolFailure;

/// Content hash over canonical argument JSON. serde_json orders object
/// keys, so semantically equal argument sets hash identically.
pub fn hash_args(args: &Value) -> String {
    let canonical = serde_json::to_vec(args).unwrap_or_default();
    format!("blake3:{}", blake3::hash(&canonical).to_hex())
}

/// Terminal outcome of one logical tool call (after retries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { value: Value },
    Failure { reason: ToolFailure },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }
}

/// One recorded tool invocation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Position in the trajectory, assigned on append.
    pub seq: usize,
    pub tool: String,
    pub stage: String,
    /// Which visit of the stage this call belongs to (feedback loops
    /// revisit stages).
    pub visit: u32,
    pub args: Value,
    pub args_hash: String,
    /// Whether the args passed the tool's input schema.
    pub args_valid: bool,
    /// Stages whose fragments were fed into this call's input.
    pub context_stages: Vec<String>,
    pub outcome: ToolOutcome,
    /// Backend attempts consumed, including the successful one.
    pub attempts: u32,
    pub latency_ms: u64,
    pub at: DateTime<Utc>,
}

impl ToolCall {
    pub fn new(
        tool: impl Into<String>,
        stage: impl Into<String>,
        visit: u32,
        args: Value,
        outcome: ToolOutcome,
    ) -> Self {
        let args_hash = hash_args(&args);
        Self {
            seq: 0,
            tool: tool.into(),
            stage: stage.into(),
            visit,
            args,
            args_hash,
            args_valid: true,
            context_stages: Vec::new(),
            outcome,
            attempts: 1,
            latency_ms: 0,
            at: Utc::now(),
        }
    }
}

/// Free-form reasoning annotation attached between calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryNote {
    /// Sequence index of the next call at the time of annotation.
    pub seq: usize,
    pub stage: String,
    pub text: String,
}

/// The full, ordered record of a run's external interactions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trajectory {
    calls: Vec<ToolCall>,
    #[serde(default)]
    notes: Vec<TrajectoryNote>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call; its `seq` is assigned here.
    pub fn record(&mut self, mut call: ToolCall) {
        call.seq = self.calls.len();
        self.calls.push(call);
    }

    pub fn annotate(&mut self, stage: impl Into<String>, text: impl Into<String>) {
        self.notes.push(TrajectoryNote {
            seq: self.calls.len(),
            stage: stage.into(),
            text: text.into(),
        });
    }

    pub fn calls(&self) -> &[ToolCall] {
        &self.calls
    }

    pub fn notes(&self) -> &[TrajectoryNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Calls belonging to one (stage, visit) pair, in order.
    pub fn calls_for(&self, stage: &str, visit: u32) -> impl Iterator<Item = &ToolCall> {
        let stage = stage.to_string();
        self.calls
            .iter()
            .filter(move |c| c.stage == stage && c.visit == visit)
    }

    pub fn failure_count(&self) -> usize {
        self.calls.iter().filter(|c| !c.outcome.is_success()).count()
    }
}

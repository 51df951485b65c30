//! Stage nodes, stage outcomes, and the production state
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use isd_rubric::Phase;

/// One node of the stage graph. Tools run in declaration order, always.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageNode {
    pub name: String,
    pub phase: Phase,
    pub tools: Vec<String>,
}

impl StageNode {
    pub fn new(name: impl Into<String>, phase: Phase, tools: &[&str]) -> Self {
        Self {
            name: name.into(),
            phase,
            tools: tools.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Every declared tool produced a valid output.
    Success,
    /// Some tools failed; the fragment holds what succeeded.
    Partial,
    /// No tool produced output; the fragment is empty.
    Failed,
}

/// A tool that ended in failure within a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageFailure {
    pub tool: String,
    pub reason: String,
}

/// Outcome record for one visit of one stage. Never dropped: every
/// outcome ends up in the run artifact, failed or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: String,
    pub visit: u32,
    pub status: StageStatus,
    /// Tool name → validated output.
    pub fragment: Map<String, Value>,
    pub failures: Vec<StageFailure>,
    pub latency_ms: u64,
}

/// Accumulated program fragments across stage visits.
///
/// Strictly monotonic: every visit appends a new versioned entry, no
/// destructive overwrite. The merged view exposes the latest fragment
/// per stage; older versions stay retrievable from `entries`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductionState {
    entries: Vec<StateEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEntry {
    pub stage: String,
    pub visit: u32,
    pub fragment: Map<String, Value>,
}

impl ProductionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: impl Into<String>, visit: u32, fragment: Map<String, Value>) {
        self.entries.push(StateEntry {
            stage: stage.into(),
            visit,
            fragment,
        });
    }

    pub fn entries(&self) -> &[StateEntry] {
        &self.entries
    }

    /// Latest fragment recorded for a stage, across visits.
    pub fn latest(&self, stage: &str) -> Option<&Map<String, Value>> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.stage == stage)
            .map(|e| &e.fragment)
    }

    /// Stage name → latest fragment, as one JSON object.
    pub fn merged(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for entry in &self.entries {
            merged.insert(entry.stage.clone(), Value::Object(entry.fragment.clone()));
        }
        merged
    }

    /// Distinct stage names with at least one fragment, in first-seen order.
    pub fn stages(&self) -> Vec<&str> {
        let mut stages: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !stages.contains(&entry.stage.as_str()) {
                stages.push(&entry.stage);
            }
        }
        stages
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragment(key: &str, value: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(key.to_string(), json!(value));
        map
    }

    #[test]
    fn test_revisit_supersedes_in_merged_view_only() {
        let mut state = ProductionState::new();
        state.push("design", 0, fragment("design_objectives", "v1"));
        state.push("design", 1, fragment("design_objectives", "v2"));

        // merged view shows the revision
        let merged = state.merged();
        assert_eq!(merged["design"]["design_objectives"], json!("v2"));
        // earlier version still on record
        assert_eq!(state.entries().len(), 2);
        assert_eq!(state.entries()[0].fragment["design_objectives"], json!("v1"));
    }

    #[test]
    fn test_stages_in_first_seen_order() {
        let mut state = ProductionState::new();
        state.push("analysis", 0, Map::new());
        state.push("design", 0, Map::new());
        state.push("analysis", 1, Map::new());
        assert_eq!(state.stages(), vec!["analysis", "design"]);
    }

    #[test]
    fn test_latest_prefers_newest_visit() {
        let mut state = ProductionState::new();
        state.push("development", 0, fragment("create_materials", "draft"));
        state.push("development", 1, fragment("create_materials", "final"));
        assert_eq!(
            state.latest("development").unwrap()["create_materials"],
            json!("final")
        );
        assert!(state.latest("evaluation").is_none());
    }
}

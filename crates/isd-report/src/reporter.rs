//! Cross-agent comparison reports
//!
//! Consumes score artifacts from any number of (agent, scenario) runs
//! and produces a ranked comparison, rendered as markdown or JSON.

use chrono::{DateTime, Utc};
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use isd_core::IsdError;
use isd_rubric::{Phase, ScoreArtifact};

const REPORT_TEMPLATE: &str = "\
# Agent Comparison Report

Generated: {{generated_at}}
Scenarios: {{scenario_count}}

## Rankings

| Rank | Agent | Final | Content | Trajectory | Runs | Flagged |
|------|-------|-------|---------|------------|------|---------|
{{#each rankings}}\
| {{rank}} | {{agent_id}} | {{fixed1 mean_final}} | {{fixed1 mean_content}} | {{fixed1 mean_trajectory}} | {{run_count}} | {{flagged_count}} |
{{/each}}
{{#if best_agent}}
**Best agent:** {{best_agent}}
{{/if}}
## Phase means (0-10)

{{#each rankings}}\
### {{agent_id}}

{{#each phase_means}}\
- {{label}}: {{fixed1 mean}}
{{/each}}
{{/each}}";

/// `{{fixed1 x}}` renders a number with one decimal place.
struct Fixed1Helper;

impl HelperDef for Fixed1Helper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = h.param(0).and_then(|v| v.value().as_f64()).unwrap_or(0.0);
        out.write(&format!("{:.1}", value))?;
        Ok(())
    }
}

static RENDERER: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    handlebars.register_helper("fixed1", Box::new(Fixed1Helper));
    handlebars
        .register_template_string("comparison", REPORT_TEMPLATE)
        .expect("comparison template is valid");
    handlebars
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseMean {
    pub label: String,
    pub mean: f64,
}

/// Aggregated results for one agent across its runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub rank: usize,
    pub agent_id: String,
    pub mean_final: f64,
    pub mean_content: f64,
    pub mean_trajectory: f64,
    pub run_count: usize,
    /// Grading failures flagged across the agent's runs.
    pub flagged_count: usize,
    pub phase_means: Vec<PhaseMean>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub generated_at: DateTime<Utc>,
    pub scenario_count: usize,
    /// Agents ordered by mean final score, best first.
    pub rankings: Vec<AgentSummary>,
    pub best_agent: Option<String>,
}

pub struct ComparisonReporter;

impl ComparisonReporter {
    /// Rank agents by mean final score across their runs.
    pub fn build(scores: &[ScoreArtifact]) -> ComparisonReport {
        let mut by_agent: BTreeMap<&str, Vec<&ScoreArtifact>> = BTreeMap::new();
        for score in scores {
            by_agent.entry(score.agent_id.as_str()).or_default().push(score);
        }

        let scenario_count = {
            let ids: std::collections::BTreeSet<&str> =
                scores.iter().map(|s| s.scenario_id.as_str()).collect();
            ids.len()
        };

        let mut rankings: Vec<AgentSummary> = by_agent
            .into_iter()
            .map(|(agent_id, runs)| {
                let n = runs.len() as f64;
                let mean = |f: fn(&ScoreArtifact) -> f64| -> f64 {
                    runs.iter().map(|r| f(r)).sum::<f64>() / n
                };
                let phase_means = Phase::ALL
                    .iter()
                    .map(|phase| PhaseMean {
                        label: phase.label().to_string(),
                        mean: runs
                            .iter()
                            .map(|r| r.phase_scores.get(phase).copied().unwrap_or(0.0))
                            .sum::<f64>()
                            / n,
                    })
                    .collect();
                AgentSummary {
                    rank: 0,
                    agent_id: agent_id.to_string(),
                    mean_final: mean(|r| r.final_score),
                    mean_content: mean(|r| r.content_score),
                    mean_trajectory: mean(|r| r.trajectory_score),
                    run_count: runs.len(),
                    flagged_count: runs.iter().map(|r| r.flagged.len()).sum(),
                    phase_means,
                }
            })
            .collect();

        // best first; BTreeMap already gave a stable tiebreak by agent id
        rankings.sort_by(|a, b| {
            b.mean_final
                .partial_cmp(&a.mean_final)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (i, summary) in rankings.iter_mut().enumerate() {
            summary.rank = i + 1;
        }

        let best_agent = rankings.first().map(|s| s.agent_id.clone());
        ComparisonReport {
            generated_at: Utc::now(),
            scenario_count,
            rankings,
            best_agent,
        }
    }

    pub fn to_json(report: &ComparisonReport) -> Result<String, IsdError> {
        serde_json::to_string_pretty(report)
            .map_err(|e| IsdError::Internal(format!("report serialization: {}", e)))
    }

    pub fn to_markdown(report: &ComparisonReport) -> Result<String, IsdError> {
        RENDERER
            .render("comparison", report)
            .map_err(|e| IsdError::Internal(format!("report render: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isd_rubric::{TrajectoryBreakdown, WeightVector};
    use std::collections::BTreeMap;

    fn artifact(agent: &str, scenario: &str, final_score: f64) -> ScoreArtifact {
        let mut phase_scores = BTreeMap::new();
        for phase in Phase::ALL {
            phase_scores.insert(phase, final_score / 10.0);
        }
        ScoreArtifact {
            scenario_id: scenario.to_string(),
            agent_id: agent.to_string(),
            content_score: final_score,
            trajectory_score: final_score,
            final_score,
            phase_scores,
            category_scores: BTreeMap::new(),
            sub_grades: BTreeMap::new(),
            trajectory_breakdown: TrajectoryBreakdown {
                tool_selection: 25.0,
                argument_accuracy: 25.0,
                redundancy_avoidance: 25.0,
                result_utilization: 25.0,
            },
            flagged: Vec::new(),
            rationale: String::new(),
            weights: WeightVector::baseline(),
            graded_at: Utc::now(),
        }
    }

    fn sample_scores() -> Vec<ScoreArtifact> {
        vec![
            artifact("addie", "scn-001", 70.0),
            artifact("addie", "scn-002", 80.0),
            artifact("rpisd", "scn-001", 85.0),
            artifact("rpisd", "scn-002", 83.0),
            artifact("dick_carey", "scn-001", 60.0),
        ]
    }

    #[test]
    fn test_rankings_sorted_by_mean_final() {
        let report = ComparisonReporter::build(&sample_scores());
        assert_eq!(report.scenario_count, 2);
        assert_eq!(report.rankings[0].agent_id, "rpisd");
        assert_eq!(report.rankings[0].rank, 1);
        assert!((report.rankings[0].mean_final - 84.0).abs() < 1e-9);
        assert_eq!(report.best_agent.as_deref(), Some("rpisd"));
        assert_eq!(report.rankings[2].agent_id, "dick_carey");
    }

    #[test]
    fn test_markdown_contains_table_and_best_agent() {
        let report = ComparisonReporter::build(&sample_scores());
        let markdown = ComparisonReporter::to_markdown(&report).unwrap();
        assert!(markdown.contains("| 1 | rpisd | 84.0 |"));
        assert!(markdown.contains("**Best agent:** rpisd"));
        assert!(markdown.contains("- analysis: 8.4"));
    }

    #[test]
    fn test_json_round_trips() {
        let report = ComparisonReporter::build(&sample_scores());
        let json = ComparisonReporter::to_json(&report).unwrap();
        let parsed: ComparisonReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.rankings.len(), 3);
    }

    #[test]
    fn test_empty_input_yields_empty_report() {
        let report = ComparisonReporter::build(&[]);
        assert!(report.rankings.is_empty());
        assert!(report.best_agent.is_none());
        assert_eq!(report.scenario_count, 0);
    }
}

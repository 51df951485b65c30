//! isd-report: comparison reporting over benchmark score artifacts
//!
//! Takes the score artifacts produced by isd-rubric across agents and
//! scenarios and renders ranked comparison reports (markdown or JSON).

pub mod reporter;

pub use reporter::{AgentSummary, ComparisonReport, ComparisonReporter, PhaseMean};

//! isd-workflow: staged execution of instructional-design agents
//!
//! A `StageGraph` declares the workflow (stages, tools, quality gates),
//! the `StageExecutor` runs one stage with retries and validation, and
//! the `WorkflowEngine` walks the graph, evaluates gates, and emits a
//! `RunArtifact` carrying the structured output plus the full
//! trajectory.
//!
//! ```ignore
//! use isd_workflow::{EngineConfig, StageGraph, WorkflowEngine};
//!
//! let graph = StageGraph::dick_carey();
//! let engine = WorkflowEngine::new(
//!     graph.clone(),
//!     graph.descriptor_registry(),
//!     backend,
//!     gate_evaluator,
//!     EngineConfig::for_agent("dick_carey"),
//! )?;
//! let artifact = engine.run(&scenario, &ctx).await?;
//! ```

pub mod artifact;
pub mod config;
pub mod engine;
pub mod executor;
pub mod graph;
pub mod stage;

pub use artifact::{phase_output, GateDecision, LoopState, RunArtifact, RunMetadata};
pub use config::EngineConfig;
pub use engine::{GateEvaluator, WorkflowEngine};
pub use executor::StageExecutor;
pub use graph::{GateSpec, StageGraph, MAX_GATES};
pub use stage::{ProductionState, StageFailure, StageNode, StageOutcome, StageStatus, StateEntry};

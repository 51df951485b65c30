//! isd-core: shared data model for the ISD agent benchmark
//!
//! Scenarios in, trajectories out: this crate holds the types every
//! other crate agrees on — the scenario input model, the tool registry
//! and backend seam, the append-only trajectory log, the unified error
//! taxonomy, and the run context (cancellation + provider caps).

pub mod context;
pub mod error;
pub mod scenario;
pub mod schema;
pub mod tool;
pub mod trajectory;

pub use context::{CancelToken, ProviderGate, RunContext};
pub use error::IsdError;
pub use scenario::{ContextAttributes, Scenario};
pub use schema::{FieldType, ObjectSchema};
pub use tool::{ToolBackend, ToolDescriptor, ToolFailure, ToolRegistry};
pub use trajectory::{hash_args, ToolCall, ToolOutcome, Trajectory, TrajectoryNote};

/// Crate version, embedded in artifacts.
pub const ISD_BENCH_VERSION: &str = env!("CARGO_PKG_VERSION");

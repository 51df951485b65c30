//! Tool descriptors, registry, and the backend call boundary
//!
//! Tools are capability descriptors, not structs-per-tool: a name, a
//! description, and input/output schemas. The registry maps names to
//! descriptors; the `ToolBackend` trait is the seam behind which the
//! actual model call lives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::ObjectSchema;

/// Declared capability of one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: ObjectSchema,
    pub output_schema: ObjectSchema,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: ObjectSchema::new(),
            output_schema: ObjectSchema::new(),
        }
    }

    pub fn with_input(mut self, schema: ObjectSchema) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_output(mut self, schema: ObjectSchema) -> Self {
        self.output_schema = schema;
        self
    }
}

/// Name → descriptor registry shared by every stage of a run.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) {
        self.tools.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names, sorted for stable iteration.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Why a backend call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolFailure {
    /// The call did not return within its deadline.
    Timeout,
    /// The returned payload did not match the declared output schema.
    SchemaViolation { detail: String },
    /// The provider rejected or failed the call.
    ProviderError { code: String },
    /// The provider throttled the call.
    RateLimited,
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolFailure::Timeout => write!(f, "timeout"),
            ToolFailure::SchemaViolation { detail } => write!(f, "schema violation: {}", detail),
            ToolFailure::ProviderError { code } => write!(f, "provider error: {}", code),
            ToolFailure::RateLimited => write!(f, "rate limited"),
        }
    }
}

/// The opaque external call. Implementations wrap one model provider.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Provider label used for concurrency gating.
    fn provider(&self) -> &str;

    /// Perform the call. Deadlines are enforced by the caller.
    async fn invoke(&self, tool: &ToolDescriptor, args: &Value) -> Result<Value, ToolFailure>;
}

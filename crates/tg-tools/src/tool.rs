// tool.rs: The Tool capability trait and its call context.
//
// Every tool follows the same contract:
//
//   1. take a fresh policy snapshot and refuse at once if the tool is
//      disabled, before `args` is looked at
//   2. parse `args` into its typed parameter struct (InvalidArguments on failure)
//   3. run the check for its resource kind; on denial return PolicyDenied
//      before touching anything
//   4. otherwise perform the action and return a JSON result
//
// The registry never decides anything; each tool knows which resource
// kind it needs checked.

use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tg_policy::{PolicyEngine, ResourceKind};
use uuid::Uuid;

use crate::error::ToolError;

/// Per-call execution settings.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Correlates log lines for one invocation.
    pub call_id: Uuid,
    /// Upper bound on how long the underlying action may run.
    pub timeout: Duration,
    /// Output larger than this is truncated.
    pub max_output_bytes: usize,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            call_id: Uuid::new_v4(),
            timeout: Duration::from_secs(30),
            max_output_bytes: 200 * 1024,
        }
    }
}

impl ToolContext {
    /// A fresh context (new call id) with the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// What the planning component sees for each enabled tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the `args` object.
    pub parameters: serde_json::Value,
}

/// An agent-callable capability that enforces its own policy check.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> serde_json::Value;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError>;
}

/// Refuse every call to a tool the policy does not enable.
pub(crate) fn authorize_tool(engine: &PolicyEngine, tool: &str) -> Result<(), ToolError> {
    let decision = engine.check_tool(tool);
    if decision.allowed {
        Ok(())
    } else {
        Err(ToolError::denied(tool, ResourceKind::Tool, &decision))
    }
}

/// Deserialize `args` into a tool's parameter struct.
pub(crate) fn parse_args<T: DeserializeOwned>(
    tool: &str,
    args: serde_json::Value,
) -> Result<T, ToolError> {
    if !args.is_object() {
        return Err(ToolError::invalid_arguments(
            tool,
            "arguments must be a JSON object",
        ));
    }
    serde_json::from_value(args).map_err(|e| ToolError::invalid_arguments(tool, e.to_string()))
}

/// JSON Schema for a parameter struct.
pub(crate) fn schema_for<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default()
}

/// Cut `text` down to at most `max_bytes`, respecting char boundaries.
pub(crate) fn truncate_utf8(text: &mut String, max_bytes: usize) -> bool {
    if text.len() <= max_bytes {
        return false;
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    true
}

// registry.rs: Named tool lookup and the enabled-only definition listing.
//
// The registry is filled while it is being built and shared read-only
// afterwards. It makes no authorization decisions of its own: `call`
// dispatches, and the tool runs its own policy check.

use std::collections::BTreeMap;
use std::sync::Arc;

use tg_policy::PolicyHandle;

use crate::error::ToolError;
use crate::fs::{EditTool, ListTool, ReadTool, WriteTool};
use crate::tool::{Tool, ToolContext, ToolDefinition};
use crate::{BashTool, WebFetchTool};

/// Registry of tool capabilities, keyed by name.
pub struct ToolRegistry {
    policy: PolicyHandle,
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// An empty registry whose listing is filtered through `policy`.
    pub fn new(policy: PolicyHandle) -> Self {
        Self {
            policy,
            tools: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in tool, each sharing `policy`.
    pub fn with_builtin_tools(policy: PolicyHandle) -> Self {
        let mut registry = Self::new(policy.clone());
        registry.register(ReadTool::new(policy.clone()));
        registry.register(WriteTool::new(policy.clone()));
        registry.register(EditTool::new(policy.clone()));
        registry.register(ListTool::new(policy.clone()));
        registry.register(BashTool::new(policy.clone()));
        registry.register(WebFetchTool::new(policy));
        registry
    }

    /// Add a tool, replacing any tool already registered under its name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_some() {
            tracing::warn!(tool = %name, "tool registered twice; keeping the latest");
        }
    }

    /// Look up a tool by name, enabled or not.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Names of every registered tool.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Definitions of the tools the current policy enables, ordered by name.
    ///
    /// Disabled tools are left out entirely so the planner never sees them.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let engine = self.policy.current();
        self.tools
            .values()
            .filter(|tool| engine.is_enabled(tool.name()))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Dispatch a call by name.
    pub async fn call(
        &self,
        name: &str,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::unavailable(name))?;

        tracing::debug!(tool = name, call_id = %ctx.call_id, "dispatching tool call");
        let result = tool.execute(ctx, args).await;
        if let Err(e) = &result {
            tracing::debug!(tool = name, call_id = %ctx.call_id, error = %e, "tool call failed");
        }
        result
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

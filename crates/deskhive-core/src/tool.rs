//! Tool surface exposed to the LLM-agent layer.
//!
//! Every operation the agents can call is a [`ToolExecutor`] registered in
//! a [`ToolRegistry`]; the [`ToolContext`] carries the calling
//! conversation's state handle so tools can read session context and leave
//! their breadcrumbs.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::session::StateStore;

/// What a tool advertises to the agent layer: its name, what it does, and
/// the JSON schema of its input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Result envelope text plus the error flag callers branch on.
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

pub fn tool_ok(content: impl Into<String>) -> ToolOutput {
    ToolOutput {
        content: content.into(),
        is_error: false,
    }
}

/// Domain misses (unknown user, unknown ticket) come back this way, not as
/// `Err` — only infrastructure failures abort an execution.
pub fn tool_error(message: impl Into<String>) -> ToolOutput {
    ToolOutput {
        content: message.into(),
        is_error: true,
    }
}

/// Per-invocation context: the handle to the conversation on whose behalf
/// the tool runs.
#[derive(Clone)]
pub struct ToolContext {
    session: StateStore,
}

impl ToolContext {
    pub fn new(session: StateStore) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &StateStore {
        &self.session
    }

    pub fn conversation_id(&self) -> &str {
        self.session.conversation_id()
    }
}

/// One callable operation.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definition(&self) -> ToolDef;

    async fn execute(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

/// The set of tools the engine exposes, keyed by name. Iteration order is
/// the name order, so advertised definitions are stable across runs.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool under its advertised name. Re-registering a name
    /// replaces the earlier tool.
    pub fn register(&mut self, tool: Box<dyn ToolExecutor>) {
        let name = tool.definition().name.clone();
        self.tools.insert(name, tool);
    }

    pub fn tool_defs(&self) -> Vec<ToolDef> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Run a tool by name. An unknown name is an `Err`; the engine folds it
    /// into an error envelope for the caller.
    pub async fn execute(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow!("tool not found: {name}"))?;
        tool.execute(input, ctx).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Tools the answer agent can call.

use super::model::{ToolInvocation, ToolSpec};
use crate::error::{HeraldError, Result};
use crate::rag::{format_results, Retriever};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Name under which the retriever is offered to the model.
pub const RETRIEVE_TOOL_NAME: &str = "retrieve_context";

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// Run the tool with raw JSON arguments.
    async fn call(&self, arguments: &str) -> Result<String>;
}

/// Tools available to one agent, looked up by name.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. If two tools share a name, the first one added wins.
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Execute an invocation. Failures come back as text for the model.
    pub async fn execute(&self, invocation: &ToolInvocation) -> String {
        info!("Agent calling tool: {}", invocation);

        let Some(tool) = self
            .tools
            .iter()
            .find(|t| t.spec().name == invocation.name)
        else {
            warn!("Model requested unknown tool {}", invocation.name);
            return format!("Tool error: Unknown tool: {}", invocation.name);
        };

        match tool.call(&invocation.arguments).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool {} failed: {}", invocation.name, e);
                format!("Tool error: {}", e)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RetrieveArgs {
    query: String,
}

/// Exposes a [`Retriever`] as the `retrieve_context` tool.
pub struct RetrieveTool {
    retriever: Retriever,
}

impl RetrieveTool {
    pub fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for RetrieveTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: RETRIEVE_TOOL_NAME.to_string(),
            description: "Retrieve information related to a query from the indexed news articles."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look up in the articles"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, arguments: &str) -> Result<String> {
        let args: RetrieveArgs = serde_json::from_str(arguments)
            .map_err(|e| HeraldError::Agent(format!("Invalid tool arguments: {}", e)))?;

        let results = self.retriever.retrieve(&args.query, self.retriever.k()).await?;
        if results.is_empty() {
            return Ok("No relevant context found.".to_string());
        }
        Ok(format_results(&results))
    }
}

//! Provider-neutral chat model interface.

use crate::error::{HeraldError, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments.
    pub arguments: String,
}

impl std::fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolInvocation>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

/// Event produced while a model turn streams in.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A text delta.
    Text(String),
    /// A complete tool invocation.
    ToolCall(ToolInvocation),
}

/// JSON-schema description of a tool offered to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

pub type ModelStream = BoxStream<'static, Result<ModelEvent>>;

/// Trait for chat-completion providers.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Start one model turn. Tool calls are only emitted once complete.
    async fn stream_turn(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ModelStream>;

    /// Run one turn without tools and return the whole text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let mut stream = self.stream_turn(messages, &[]).await?;
        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event? {
                ModelEvent::Text(delta) => text.push_str(&delta),
                ModelEvent::ToolCall(call) => {
                    return Err(HeraldError::Model(format!(
                        "Unexpected tool call {} in plain completion",
                        call.name
                    )));
                }
            }
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChatModel;

    #[test]
    fn test_tool_invocation_display() {
        let call = ToolInvocation {
            id: "call_1".to_string(),
            name: "retrieve_context".to_string(),
            arguments: r#"{"query":"test"}"#.to_string(),
        };
        assert_eq!(call.to_string(), r#"retrieve_context({"query":"test"})"#);
    }

    #[tokio::test]
    async fn test_complete_joins_deltas() {
        let model = ScriptedChatModel::new(vec![vec![
            ModelEvent::Text("Hello".to_string()),
            ModelEvent::Text(", world".to_string()),
        ]]);
        let text = model.complete(&[ChatMessage::User("hi".to_string())]).await.unwrap();
        assert_eq!(text, "Hello, world");
    }
}

//! Answer agent with tool calling.
//!
//! A chat model decides when to call the retrieval tool; its text is
//! streamed back to the caller as a growing answer.

mod model;
mod openai;
mod runner;
mod tools;

pub use model::{ChatMessage, ChatModel, ModelEvent, ModelStream, ToolInvocation, ToolSpec};
pub use openai::OpenAIChatModel;
pub use runner::{AgentState, AnswerAgent, DEFAULT_MAX_ITERATIONS};
pub use tools::{RetrieveTool, Tool, ToolSet, RETRIEVE_TOOL_NAME};

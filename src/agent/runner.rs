//! Answer agent: a tool-using model loop that streams its answer.

use super::model::{ChatMessage, ChatModel, ModelEvent, ModelStream, ToolInvocation};
use super::tools::ToolSet;
use crate::error::{HeraldError, Result};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

/// Default bound on model turns per question.
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Where the loop is between two pulls from the answer stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// A model turn is open or about to be opened.
    AwaitingModel,
    /// The last turn asked for tools; results are pending.
    AwaitingToolResult,
    Done,
}

/// Answers one question at a time using a model and a tool set.
#[derive(Clone)]
pub struct AnswerAgent {
    model: Arc<dyn ChatModel>,
    tools: ToolSet,
    system_prompt: String,
    max_iterations: usize,
}

impl AnswerAgent {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolSet, system_prompt: &str) -> Self {
        Self {
            model,
            tools,
            system_prompt: system_prompt.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set maximum model turns for one question.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Stream the answer to `query` as successive cumulative strings.
    ///
    /// The last `Ok` item is the complete answer. A model failure ends the
    /// stream with an error; earlier items stay valid.
    pub fn answer(&self, query: &str) -> BoxStream<'static, Result<String>> {
        info!("Answering: {}", query);

        let run = Run {
            agent: self.clone(),
            state: AgentState::AwaitingModel,
            messages: vec![
                ChatMessage::System(self.system_prompt.clone()),
                ChatMessage::User(query.to_string()),
            ],
            turn: None,
            turn_text: String::new(),
            turn_calls: Vec::new(),
            answer: String::new(),
            iterations: 0,
            yielded: false,
        };

        stream::unfold(run, |mut run| async move {
            let item = run.step().await?;
            Some((item, run))
        })
        .fuse()
        .boxed()
    }

    /// Drive the stream to completion and return the final answer.
    pub async fn answer_text(&self, query: &str) -> Result<String> {
        let mut stream = self.answer(query);
        let mut last = String::new();
        while let Some(item) = stream.next().await {
            last = item?;
        }
        Ok(last)
    }
}

struct Run {
    agent: AnswerAgent,
    state: AgentState,
    messages: Vec<ChatMessage>,
    turn: Option<ModelStream>,
    turn_text: String,
    turn_calls: Vec<ToolInvocation>,
    /// Text shown to the caller so far.
    answer: String,
    iterations: usize,
    yielded: bool,
}

impl Run {
    fn finish_with(&mut self, error: HeraldError) -> Option<Result<String>> {
        self.state = AgentState::Done;
        self.turn = None;
        Some(Err(error))
    }

    /// Advance until there is something to yield, or `None` once done.
    async fn step(&mut self) -> Option<Result<String>> {
        loop {
            match self.state {
                AgentState::Done => return None,

                AgentState::AwaitingModel => {
                    if self.turn.is_none() {
                        if self.iterations >= self.agent.max_iterations {
                            return self.finish_with(HeraldError::Agent(format!(
                                "Agent exceeded maximum iterations ({})",
                                self.agent.max_iterations
                            )));
                        }
                        self.iterations += 1;
                        debug!("Agent iteration {}", self.iterations);

                        let specs = self.agent.tools.specs();
                        match self.agent.model.stream_turn(&self.messages, &specs).await {
                            Ok(turn) => self.turn = Some(turn),
                            Err(e) => return self.finish_with(e),
                        }
                    }

                    let Some(turn) = self.turn.as_mut() else {
                        continue;
                    };

                    let event = turn.next().await;
                    match event {
                        Some(Ok(ModelEvent::Text(delta))) => {
                            self.turn_text.push_str(&delta);
                            self.answer.push_str(&delta);
                            self.yielded = true;
                            return Some(Ok(self.answer.clone()));
                        }
                        Some(Ok(ModelEvent::ToolCall(call))) => self.turn_calls.push(call),
                        Some(Err(e)) => return self.finish_with(e),
                        None => {
                            self.turn = None;
                            let content = std::mem::take(&mut self.turn_text);
                            let calls = std::mem::take(&mut self.turn_calls);

                            if calls.is_empty() {
                                self.state = AgentState::Done;
                                if !self.yielded {
                                    self.yielded = true;
                                    return Some(Ok(self.answer.clone()));
                                }
                                return None;
                            }

                            self.messages.push(ChatMessage::Assistant {
                                content: (!content.is_empty()).then_some(content),
                                tool_calls: calls,
                            });
                            self.state = AgentState::AwaitingToolResult;
                        }
                    }
                }

                AgentState::AwaitingToolResult => {
                    let calls = match self.messages.last() {
                        Some(ChatMessage::Assistant { tool_calls, .. }) => tool_calls.clone(),
                        _ => Vec::new(),
                    };
                    for call in &calls {
                        let output = self.agent.tools.execute(call).await;
                        self.messages.push(ChatMessage::Tool {
                            call_id: call.id.clone(),
                            content: output,
                        });
                    }
                    self.state = AgentState::AwaitingModel;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tools::Tool;
    use crate::agent::ToolSpec;
    use crate::testing::ScriptedChatModel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTool {
        calls: AtomicUsize,
        fail: bool,
    }

    impl EchoTool {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "retrieve_context".to_string(),
                description: "echo".to_string(),
                parameters: serde_json::json!({"type": "object"}),
            }
        }

        async fn call(&self, arguments: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HeraldError::Provider("index unavailable".to_string()));
            }
            Ok(format!("context for {}", arguments))
        }
    }

    fn text(s: &str) -> ModelEvent {
        ModelEvent::Text(s.to_string())
    }

    fn tool_call(id: &str) -> ModelEvent {
        ModelEvent::ToolCall(ToolInvocation {
            id: id.to_string(),
            name: "retrieve_context".to_string(),
            arguments: r#"{"query":"payouts"}"#.to_string(),
        })
    }

    async fn collect(agent: &AnswerAgent, query: &str) -> Vec<Result<String>> {
        agent.answer(query).collect().await
    }

    #[tokio::test]
    async fn test_tool_then_answer_streams_prefixes() {
        let model = Arc::new(ScriptedChatModel::new(vec![
            vec![tool_call("call_1")],
            vec![text("Workers "), text("got "), text("payouts.")],
        ]));
        let tool = Arc::new(EchoTool::new(false));
        let agent = AnswerAgent::new(model.clone(), ToolSet::new().with(tool.clone()), "system");

        let items: Vec<String> = collect(&agent, "What happened?")
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(items, vec!["Workers ", "Workers got ", "Workers got payouts."]);
        for pair in items.windows(2) {
            assert!(pair[1].starts_with(&pair[0]));
        }
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);

        // second turn saw the tool result
        let seen = model.seen_messages();
        assert_eq!(seen.len(), 2);
        assert!(matches!(
            seen[1].last(),
            Some(ChatMessage::Tool { call_id, content })
                if call_id == "call_1" && content.starts_with("context for")
        ));
    }

    #[tokio::test]
    async fn test_tool_error_is_fed_back() {
        let model = Arc::new(ScriptedChatModel::new(vec![
            vec![tool_call("call_1")],
            vec![text("Sorry, no data.")],
        ]));
        let agent = AnswerAgent::new(
            model.clone(),
            ToolSet::new().with(Arc::new(EchoTool::new(true))),
            "system",
        );

        let answer = agent.answer_text("q").await.unwrap();
        assert_eq!(answer, "Sorry, no data.");
        assert!(matches!(
            model.seen_messages()[1].last(),
            Some(ChatMessage::Tool { content, .. }) if content.starts_with("Tool error:")
        ));
    }

    #[tokio::test]
    async fn test_model_failure_ends_stream_with_error() {
        let model = Arc::new(ScriptedChatModel::new(vec![vec![text("Partial ")]]).with_stream_error());
        let agent = AnswerAgent::new(model, ToolSet::new(), "system");

        let items = collect(&agent, "q").await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Partial ");
        assert!(matches!(items[1], Err(HeraldError::Model(_))));
    }

    #[tokio::test]
    async fn test_runaway_tool_loop_is_bounded() {
        let script = (0..5).map(|i| vec![tool_call(&format!("call_{i}"))]).collect();
        let model = Arc::new(ScriptedChatModel::new(script));
        let agent = AnswerAgent::new(model, ToolSet::new().with(Arc::new(EchoTool::new(false))), "system")
            .with_max_iterations(3);

        let items = collect(&agent, "q").await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(HeraldError::Agent(_))));
    }

    #[tokio::test]
    async fn test_silent_model_yields_empty_answer() {
        let model = Arc::new(ScriptedChatModel::new(vec![vec![]]));
        let agent = AnswerAgent::new(model, ToolSet::new(), "system");

        let items = collect(&agent, "q").await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "");
    }

    #[tokio::test]
    async fn test_stream_is_finite() {
        let model = Arc::new(ScriptedChatModel::new(vec![vec![text("done")]]));
        let agent = AnswerAgent::new(model, ToolSet::new(), "system");

        let mut stream = agent.answer("q");
        assert_eq!(stream.next().await.unwrap().unwrap(), "done");
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }
}

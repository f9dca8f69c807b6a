//! OpenAI chat-completions implementation of [`ChatModel`].

use super::model::{ChatMessage, ChatModel, ModelEvent, ModelStream, ToolInvocation, ToolSpec};
use crate::config::AgentSettings;
use crate::error::{HeraldError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionResponseStream, ChatCompletionTool, ChatCompletionToolType,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tracing::{debug, instrument};

/// Streaming chat model backed by the OpenAI API.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl OpenAIChatModel {
    /// Create a model client with no token limit.
    pub fn new(model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            temperature,
            max_tokens: None,
        })
    }

    /// Create the answer model from agent settings.
    pub fn from_settings(settings: &AgentSettings, timeout: Duration) -> Result<Self> {
        Ok(Self::new(&settings.model, settings.temperature, timeout)?.with_max_tokens(settings.max_tokens))
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn build_request(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<CreateChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(model_error)?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(self.temperature);

        if let Some(max_tokens) = self.max_tokens {
            args.max_completion_tokens(max_tokens);
        }
        if !tools.is_empty() {
            args.tools(tools.iter().map(to_tool).collect::<Vec<_>>());
        }

        args.build().map_err(model_error)
    }
}

fn model_error(e: OpenAIError) -> HeraldError {
    HeraldError::Model(e.to_string())
}

fn to_request_message(message: &ChatMessage) -> std::result::Result<ChatCompletionRequestMessage, OpenAIError> {
    Ok(match message {
        ChatMessage::System(content) => ChatCompletionRequestSystemMessageArgs::default()
            .content(content.clone())
            .build()?
            .into(),
        ChatMessage::User(content) => ChatCompletionRequestUserMessageArgs::default()
            .content(content.clone())
            .build()?
            .into(),
        ChatMessage::Assistant { content, tool_calls } => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(content) = content {
                args.content(content.clone());
            }
            if !tool_calls.is_empty() {
                args.tool_calls(
                    tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            args.build()?.into()
        }
        ChatMessage::Tool { call_id, content } => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(call_id.clone())
            .content(content.clone())
            .build()?
            .into(),
    })
}

fn to_tool(spec: &ToolSpec) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: spec.name.clone(),
            description: Some(spec.description.clone()),
            parameters: Some(spec.parameters.clone()),
            strict: None,
        },
    }
}

/// Tool call assembled from streamed fragments.
#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

struct TurnDecoder {
    inner: ChatCompletionResponseStream,
    calls: BTreeMap<u32, PartialToolCall>,
    pending: VecDeque<ModelEvent>,
    finished: bool,
}

/// Turn the raw chunk stream into text deltas followed by complete tool calls.
fn decode_turn(inner: ChatCompletionResponseStream) -> ModelStream {
    let decoder = TurnDecoder {
        inner,
        calls: BTreeMap::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(decoder, |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                return Some((Ok(event), st));
            }
            if st.finished {
                return None;
            }

            match st.inner.next().await {
                Some(Ok(response)) => {
                    for choice in response.choices {
                        if let Some(text) = choice.delta.content {
                            if !text.is_empty() {
                                st.pending.push_back(ModelEvent::Text(text));
                            }
                        }
                        for chunk in choice.delta.tool_calls.unwrap_or_default() {
                            let call = st.calls.entry(chunk.index).or_default();
                            if let Some(id) = chunk.id {
                                call.id = id;
                            }
                            if let Some(function) = chunk.function {
                                if let Some(name) = function.name {
                                    call.name.push_str(&name);
                                }
                                if let Some(arguments) = function.arguments {
                                    call.arguments.push_str(&arguments);
                                }
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(model_error(e)), st));
                }
                None => {
                    st.finished = true;
                    let calls = std::mem::take(&mut st.calls);
                    st.pending.extend(calls.into_values().map(|call| {
                        ModelEvent::ToolCall(ToolInvocation {
                            id: call.id,
                            name: call.name,
                            arguments: call.arguments,
                        })
                    }));
                }
            }
        }
    })
    .fuse()
    .boxed()
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn stream_turn(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ModelStream> {
        let request = self.build_request(messages, tools)?;
        let inner = self.client.chat().create_stream(request).await.map_err(model_error)?;
        debug!("Model turn started");
        Ok(decode_turn(inner))
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = self.build_request(messages, &[])?;
        let response = self.client.chat().create(request).await.map_err(model_error)?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| HeraldError::Model("Empty response from model".to_string()))
    }
}

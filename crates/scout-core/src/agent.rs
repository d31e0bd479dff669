//! Bounded tool-calling agent loop.
//!
//! The agent alternates between asking the provider for a completion and
//! executing any tool calls it returns, feeding results back until the
//! model produces a final text answer or the iteration budget runs out.
//! Malformed tool calls are tolerated: they become tool error results the
//! model can recover from instead of aborting the run.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use crate::error::Error;
use crate::message::{Message, StreamChunk, ToolCall, Usage};
use crate::provider::{CompletionRequest, Provider};
use crate::tool::ToolRegistry;

/// Configuration for the agent loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Name used in progress events and logs.
    pub name: String,
    /// System prompt prepended to every run.
    pub system_prompt: Option<String>,
    /// Maximum reasoning/tool iterations per run.
    pub max_iterations: usize,
    /// Sampling temperature for provider calls.
    pub temperature: Option<f32>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: None,
            max_iterations: 5,
            temperature: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Events emitted during agent execution for progress reporting.
#[derive(Debug, Clone)]
pub enum AgentProgressEvent {
    /// An iteration of the agent loop has started.
    IterationStart {
        iteration: u32,
        max_iterations: u32,
    },
    /// A chunk of thinking/reasoning content.
    ThinkingDelta { content: String },
    /// A tool execution has started.
    ToolStart { tool_name: String },
    /// A tool execution has completed.
    ToolComplete { tool_name: String, is_error: bool },
    /// Usage statistics update after an LLM call.
    UsageUpdate { usage: Usage },
}

/// Handler for receiving agent progress events.
///
/// The chat interface uses this to display streamed reasoning and tool
/// activity while the run is in flight. The run blocks until completion;
/// there is no cancellation path.
#[async_trait]
pub trait AgentProgressHandler: Send + Sync {
    async fn on_progress(&self, event: AgentProgressEvent);
}

/// An LLM-powered agent wired to a tool registry.
///
/// Constructed once at startup from configuration and reused for every
/// query; each `run` is independent and receives only the single task
/// text, never prior conversation.
pub struct Agent {
    config: AgentConfig,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
}

impl Agent {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            config,
            provider,
            tools,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    /// Run a single task to completion.
    ///
    /// When a progress handler is provided, provider calls stream and
    /// thinking content, tool activity, and usage are reported as they
    /// happen. Returns the final text answer.
    pub async fn run(
        &self,
        task: &str,
        progress: Option<Arc<dyn AgentProgressHandler>>,
    ) -> Result<String, Error> {
        debug!(
            agent = %self.config.name,
            tools_available = self.tools.len(),
            has_progress_handler = progress.is_some(),
            "Agent run starting"
        );

        let mut messages = Vec::new();
        if let Some(system) = &self.config.system_prompt {
            messages.push(Message::system(system.as_str()));
        }
        messages.push(Message::user(task));

        let max_iterations = self.config.max_iterations as u32;

        for iteration in 0..self.config.max_iterations {
            if let Some(ref handler) = progress {
                handler
                    .on_progress(AgentProgressEvent::IterationStart {
                        iteration: iteration as u32 + 1,
                        max_iterations,
                    })
                    .await;
            }

            debug!(
                agent = %self.config.name,
                iteration = iteration,
                message_count = messages.len(),
                "Agent iteration starting"
            );

            let mut request =
                CompletionRequest::new(messages.clone()).with_tools(self.tools.definitions());
            if let Some(temp) = self.config.temperature {
                request = request.with_temperature(temp);
            }

            let (content, tool_calls, usage) = if progress.is_some() {
                self.run_streaming_iteration(request, progress.as_ref()).await?
            } else {
                self.run_complete_iteration(request).await?
            };

            if let Some(ref handler) = progress {
                handler
                    .on_progress(AgentProgressEvent::UsageUpdate { usage })
                    .await;
            }

            if !tool_calls.is_empty() {
                debug!(
                    agent = %self.config.name,
                    tool_count = tool_calls.len(),
                    "Agent executing tools"
                );

                // Store the tool calls without content so interleaved
                // thinking never enters the request history.
                messages.push(Message::assistant_with_tool_calls("", tool_calls.clone()));

                for tool_call in &tool_calls {
                    if let Some(ref handler) = progress {
                        handler
                            .on_progress(AgentProgressEvent::ToolStart {
                                tool_name: tool_call.name.clone(),
                            })
                            .await;
                    }

                    debug!(agent = %self.config.name, tool = %tool_call.name, "Executing tool");
                    let result = execute_tool(&self.tools, tool_call).await;
                    let is_error = result.starts_with("Error:");

                    if let Some(ref handler) = progress {
                        handler
                            .on_progress(AgentProgressEvent::ToolComplete {
                                tool_name: tool_call.name.clone(),
                                is_error,
                            })
                            .await;
                    }

                    messages.push(Message::tool_result(&tool_call.id, result));
                }

                continue;
            }

            debug!(
                agent = %self.config.name,
                iterations = iteration + 1,
                response_len = content.len(),
                "Agent completed"
            );
            return Ok(content);
        }

        Err(Error::agent(format!(
            "{} exceeded max iterations ({})",
            self.config.name, self.config.max_iterations
        )))
    }

    /// Run a single iteration using streaming (for progress reporting).
    async fn run_streaming_iteration(
        &self,
        request: CompletionRequest,
        progress: Option<&Arc<dyn AgentProgressHandler>>,
    ) -> Result<(String, Vec<ToolCall>, Usage), Error> {
        let mut stream = self.provider.stream(request).await?;

        let mut content = String::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut current_tool_call: Option<(String, String, String)> = None;
        let mut usage = Usage::default();

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(StreamChunk::Start { .. }) => {}
                Ok(StreamChunk::ThinkingDelta { content: delta }) => {
                    if let Some(handler) = progress {
                        handler
                            .on_progress(AgentProgressEvent::ThinkingDelta { content: delta })
                            .await;
                    }
                }
                Ok(StreamChunk::Delta { content: delta }) => {
                    content.push_str(&delta);
                }
                Ok(StreamChunk::ToolCallStart { id, name }) => {
                    if let Some(pending) = current_tool_call.take() {
                        tool_calls.push(finish_tool_call(pending));
                    }
                    current_tool_call = Some((id, name, String::new()));
                }
                Ok(StreamChunk::ToolCallDelta { arguments }) => {
                    if let Some((_, _, ref mut args)) = current_tool_call {
                        args.push_str(&arguments);
                    }
                }
                Ok(StreamChunk::Done { usage: u }) => {
                    if let Some(pending) = current_tool_call.take() {
                        tool_calls.push(finish_tool_call(pending));
                    }
                    if let Some(u) = u {
                        usage = u;
                    }
                }
                Ok(StreamChunk::Error { message }) => {
                    debug!(agent = %self.config.name, error = %message, "Stream error");
                    return Err(Error::stream(message));
                }
                Err(e) => {
                    debug!(agent = %self.config.name, error = %e, "Stream error");
                    return Err(e);
                }
            }
        }

        Ok((content, tool_calls, usage))
    }

    /// Run a single iteration using non-streaming complete().
    async fn run_complete_iteration(
        &self,
        mut request: CompletionRequest,
    ) -> Result<(String, Vec<ToolCall>, Usage), Error> {
        request.stream = false;

        let response = self.provider.complete(request).await?;

        if let Some(ref thinking) = response.thinking {
            debug!(
                agent = %self.config.name,
                thinking_len = thinking.len(),
                "Extracted thinking content (not stored)"
            );
        }

        Ok((
            response.message.content,
            response.message.tool_calls,
            response.usage,
        ))
    }
}

/// Assemble a streamed tool call; arguments that fail to parse become
/// Null so the tool can report invalid arguments back to the model.
fn finish_tool_call((id, name, args): (String, String, String)) -> ToolCall {
    let arguments: serde_json::Value =
        serde_json::from_str(&args).unwrap_or(serde_json::Value::Null);
    ToolCall::new(id, name, arguments)
}

/// Execute a single tool call. Never fails the run: unknown tools and
/// tool failures are rendered as error text fed back to the model.
async fn execute_tool(registry: &ToolRegistry, tool_call: &ToolCall) -> String {
    let Some(tool) = registry.get(&tool_call.name) else {
        return format!("Error: Unknown tool '{}'", tool_call.name);
    };

    match tool.execute(tool_call.arguments.clone()).await {
        Ok(output) => {
            if output.is_error {
                format!("Error: {}", output.content)
            } else {
                output.content
            }
        }
        Err(e) => format!("Error executing tool: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CompletionResponse, FinishReason};
    use crate::testing::MockProvider;
    use crate::tool::{PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the query back"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.name(), self.description()).with_parameters(
                ToolParameters::new().add_property(
                    "query",
                    PropertySchema::string("Text to echo"),
                    true,
                ),
            )
        }

        async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
            match arguments.get("query").and_then(|q| q.as_str()) {
                Some(q) => Ok(ToolOutput::success(format!("echo: {}", q))),
                None => Ok(ToolOutput::error("Invalid arguments: missing query")),
            }
        }
    }

    fn tool_call_response(call: ToolCall) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant_with_tool_calls("", vec![call]),
            thinking: None,
            usage: Usage::new(0, 0),
            model: "mock-model".to_string(),
            finish_reason: FinishReason::ToolCalls,
        }
    }

    fn agent_with(provider: Arc<MockProvider>) -> Agent {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        Agent::new(
            provider,
            Arc::new(registry),
            AgentConfig::new("assistant").with_max_iterations(5),
        )
    }

    #[test]
    fn test_agent_config_defaults() {
        let config = AgentConfig::new("assistant");
        assert_eq!(config.max_iterations, 5);
        assert!(config.system_prompt.is_none());
    }

    #[tokio::test]
    async fn test_run_returns_final_answer() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("Final answer.");
        let agent = agent_with(Arc::clone(&provider));

        let answer = agent.run("question", None).await.unwrap();
        assert_eq!(answer, "Final answer.");
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_run_executes_tool_then_answers() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_raw_response(tool_call_response(ToolCall::new(
            "call-1",
            "echo",
            serde_json::json!({"query": "hi"}),
        )));
        provider.queue_response("Done after tool.");
        let agent = agent_with(Arc::clone(&provider));

        let answer = agent.run("use the tool", None).await.unwrap();
        assert_eq!(answer, "Done after tool.");

        // The second request must include the tool result.
        let last = provider.last_request().unwrap();
        let tool_msg = last
            .messages
            .iter()
            .find(|m| m.tool_call_id.as_deref() == Some("call-1"))
            .expect("tool result message");
        assert_eq!(tool_msg.content, "echo: hi");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_tolerated() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_raw_response(tool_call_response(ToolCall::new(
            "call-1",
            "no_such_tool",
            serde_json::json!({}),
        )));
        provider.queue_response("Recovered.");
        let agent = agent_with(Arc::clone(&provider));

        let answer = agent.run("task", None).await.unwrap();
        assert_eq!(answer, "Recovered.");

        let last = provider.last_request().unwrap();
        let tool_msg = last
            .messages
            .iter()
            .find(|m| m.tool_call_id.as_deref() == Some("call-1"))
            .unwrap();
        assert!(tool_msg.content.starts_with("Error: Unknown tool"));
    }

    #[tokio::test]
    async fn test_exceeding_iterations_is_an_error() {
        let provider = Arc::new(MockProvider::new());
        for i in 0..5 {
            provider.queue_raw_response(tool_call_response(ToolCall::new(
                format!("call-{}", i),
                "echo",
                serde_json::json!({"query": "again"}),
            )));
        }
        let agent = agent_with(provider);

        let err = agent.run("loop forever", None).await.unwrap_err();
        assert!(matches!(err, Error::Agent(_)));
    }

    #[tokio::test]
    async fn test_only_task_is_submitted() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("ok");
        let agent = Agent::new(
            provider.clone(),
            Arc::new(ToolRegistry::new()),
            AgentConfig::new("assistant").with_system_prompt("Be helpful."),
        );

        agent.run("just this", None).await.unwrap();

        let request = provider.last_request().unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, crate::Role::System);
        assert_eq!(request.messages[1].content, "just this");
    }
}

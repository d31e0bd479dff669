//! Session state for the interactive research chat.
//!
//! The session owns the conversation transcript and drives the two-tier
//! answer path: agent run first, direct completion on agent failure, and
//! a fixed apology when both fail. Every transition happens through
//! [`SessionEvent`], so the interface layer stays a stateless renderer.

use std::sync::Arc;

use scout_core::{
    extract_sources, Agent, AgentProgressHandler, CompletionRequest, ConversationStore, Message,
    Provider,
};
use tracing::{debug, warn};

/// System prompt for the research agent.
pub const RESEARCH_SYSTEM_PROMPT: &str = "\
You are a research assistant with access to web search, arXiv paper search, \
and Wikipedia lookup tools. Use them to find current, accurate information \
before answering. Always include the URLs of the sources you used in your \
answer so the user can verify them. Be concise and factual.";

/// Assistant reply when a question arrives before the agent exists.
const NOT_INITIALIZED_REPLY: &str =
    "The research agent is not initialized. Please check your API key configuration.";

/// Assistant reply when both the agent and the direct completion fail.
const APOLOGY_REPLY: &str =
    "I'm experiencing technical difficulties. Please try again in a moment.";

/// Canned queries behind the quick-action commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    ArxivPapers,
    WikipediaNews,
    WebTrends,
}

impl QuickAction {
    pub fn query(&self) -> &'static str {
        match self {
            QuickAction::ArxivPapers => {
                "Find the latest research papers about artificial intelligence from arXiv"
            }
            QuickAction::WikipediaNews => "Search Wikipedia for current events in technology",
            QuickAction::WebTrends => "Search the web for recent developments in machine learning",
        }
    }
}

/// User-driven state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Free-text question.
    Submit(String),
    /// One of the canned research queries.
    QuickAction(QuickAction),
    /// Reset the transcript.
    Clear,
}

/// Conversation state plus the answer pipeline.
pub struct ResearchSession {
    store: ConversationStore,
    agent: Option<Agent>,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl ResearchSession {
    pub fn new(
        provider: Arc<dyn Provider>,
        agent: Option<Agent>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            store: ConversationStore::new(),
            agent,
            provider,
            model: model.into(),
            temperature,
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    pub fn latest(&self) -> &Message {
        self.store.latest()
    }

    /// Apply one event and run the answer pipeline if it was a question.
    pub async fn handle(
        &mut self,
        event: SessionEvent,
        progress: Option<Arc<dyn AgentProgressHandler>>,
    ) {
        match event {
            SessionEvent::Clear => {
                self.store.clear();
            }
            SessionEvent::Submit(text) => {
                self.ask(&text, progress).await;
            }
            SessionEvent::QuickAction(action) => {
                self.ask(action.query(), progress).await;
            }
        }
    }

    async fn ask(&mut self, question: &str, progress: Option<Arc<dyn AgentProgressHandler>>) {
        if self.agent.is_none() {
            // Without an agent there is nothing to answer with; the
            // question is not recorded so a fixed setup can retry it.
            self.store.push_assistant(NOT_INITIALIZED_REPLY, Vec::new());
            return;
        }

        self.store.push_user(question);
        self.respond(progress).await;
    }

    /// Produce the assistant reply for the latest user message.
    ///
    /// Tier 1 is the tool-using agent; tier 2 retries the question as a
    /// plain completion; tier 3 is a fixed apology. Each tier appends an
    /// assistant message, so this always leaves the session answered.
    async fn respond(&mut self, progress: Option<Arc<dyn AgentProgressHandler>>) {
        let question = self.latest().content.clone();

        let agent = match &self.agent {
            Some(agent) => agent,
            None => return,
        };

        match agent.run(&question, progress).await {
            Ok(answer) => {
                let sources = extract_sources(&answer);
                debug!(sources = sources.len(), "Agent answered");
                self.store.push_assistant(answer, sources);
                return;
            }
            Err(e) => {
                warn!(error = %e, "Agent run failed, retrying as direct completion");
            }
        }

        let request = CompletionRequest::new(vec![Message::user(&question)])
            .with_model(self.model.as_str())
            .with_temperature(self.temperature)
            .with_stream(false);

        match self.provider.complete(request).await {
            Ok(response) => {
                let sources = extract_sources(&response.message.content);
                self.store.push_assistant(response.message.content, sources);
            }
            Err(e) => {
                warn!(error = %e, "Direct completion failed, replying with apology");
                self.store.push_assistant(APOLOGY_REPLY, Vec::new());
            }
        }
    }
}

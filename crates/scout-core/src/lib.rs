//! scout-core: Core types and traits for scout
//!
//! This crate provides the foundational types and traits used throughout
//! the scout research assistant: message and citation types, the
//! conversation store, the provider and tool abstractions, and the
//! bounded tool-calling agent loop.

pub mod agent;
pub mod conversation;
pub mod error;
pub mod message;
pub mod provider;
pub mod sources;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::{Agent, AgentConfig, AgentProgressEvent, AgentProgressHandler};
pub use conversation::{ConversationStore, CLEARED_GREETING, GREETING};
pub use error::Error;
pub use message::{Message, Role, StreamChunk, ToolCall, Usage};
pub use provider::{
    CompletionRequest, CompletionResponse, FinishReason, Provider, StreamResult,
};
pub use sources::{extract_sources, Source, SourceKind};
pub use tool::{PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters, ToolRegistry};

pub type Result<T> = std::result::Result<T, Error>;

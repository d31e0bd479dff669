//! LLM provider implementations for scout.

mod groq;

pub use groq::GroqProvider;

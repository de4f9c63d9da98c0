//! LLM provider implementations

mod chat_completions;

pub use chat_completions::ChatCompletionsClient;

#[cfg(feature = "llm-groq")]
pub mod groq;

#[cfg(feature = "llm-groq")]
pub use groq::GroqProvider;

#[cfg(feature = "llm-fireworks")]
pub mod fireworks;

#[cfg(feature = "llm-fireworks")]
pub use fireworks::FireworksProvider;

pub mod gemini;
pub mod provider;
pub mod types;

pub use gemini::{GeminiChat, GeminiClient, GeminiEmbeddings};
pub use provider::{ChatModel, Embedder, LlmError};
pub use types::{ChatMessage, ChatRequest};

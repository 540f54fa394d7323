//! The question-answering chain: condense, retrieve, prompt, complete.

mod conversational;
mod memory;
mod prompt;

pub use conversational::{ChainError, ChainOutput, ConversationalChain};
pub use memory::{SessionStore, Turn};
pub use prompt::{format_history, PromptError, PromptTemplate, CONDENSE_QUESTION_TEMPLATE, PERSONA_TEMPLATE};

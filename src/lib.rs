//! HTTP backend that answers questions through a retrieval-augmented chain
//! over an author's corpus, and serves the compiled web client.

pub mod chain;
pub mod core;
pub mod llm;
pub mod rag;
pub mod secrets;
pub mod server;
pub mod state;

use std::path::PathBuf;

use thiserror::Error;

use crate::chain::PromptError;
use crate::rag::RagError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("vector index directory not found: {0}")]
    MissingIndex(PathBuf),

    #[error("no API credential available for the language model clients")]
    MissingCredential,

    #[error("failed to load vector index: {0}")]
    Index(#[source] RagError),

    #[error("invalid prompt template: {0}")]
    Prompt(#[source] PromptError),
}

use std::sync::Arc;

use thiserror::Error;

use super::memory::{SessionStore, Turn};
use super::prompt::{format_history, PromptTemplate};
use crate::llm::{ChatModel, ChatRequest, Embedder, LlmError};
use crate::rag::{ChunkSearchResult, RagError, RagStore};

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("language model call failed: {0}")]
    Llm(#[from] LlmError),
    #[error("retrieval failed: {0}")]
    Rag(#[from] RagError),
}

#[derive(Debug, Clone)]
pub struct ChainOutput {
    /// `None` when the model produced no text.
    pub answer: Option<String>,
    /// The question actually used for retrieval.
    pub generated_question: String,
    pub source_documents: Vec<ChunkSearchResult>,
}

/// Retrieval chain with per-session memory.
///
/// A follow-up question is first rewritten into a standalone one using the
/// session history; that question drives retrieval and the final persona
/// prompt. The original question and the answer are then recorded in the
/// session window.
pub struct ConversationalChain {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn RagStore>,
    chat: Arc<dyn ChatModel>,
    memory: Arc<SessionStore>,
    qa_prompt: PromptTemplate,
    condense_prompt: PromptTemplate,
    retriever_k: usize,
}

impl ConversationalChain {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn RagStore>,
        chat: Arc<dyn ChatModel>,
        memory: Arc<SessionStore>,
        qa_prompt: PromptTemplate,
        condense_prompt: PromptTemplate,
        retriever_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            chat,
            memory,
            qa_prompt,
            condense_prompt,
            retriever_k: retriever_k.max(1),
        }
    }

    pub fn memory(&self) -> &Arc<SessionStore> {
        &self.memory
    }

    pub async fn ask(&self, session_id: &str, question: &str) -> Result<ChainOutput, ChainError> {
        let history = self.memory.history(session_id);

        let generated_question = if history.is_empty() {
            question.to_string()
        } else {
            self.condense(&history, question).await?
        };

        let query_embedding = self.embedder.embed_query(&generated_question).await?;
        let source_documents = self
            .store
            .search(&query_embedding, self.retriever_k)
            .await?;

        let context = source_documents
            .iter()
            .map(|result| result.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = self.qa_prompt.render(&[
            ("context", context.as_str()),
            ("question", generated_question.as_str()),
        ]);

        let answer = self.chat.complete(ChatRequest::prompt(prompt)).await?;

        if let Some(answer) = &answer {
            self.memory
                .record(session_id, Turn::new(question, answer.as_str()));
        }

        Ok(ChainOutput {
            answer,
            generated_question,
            source_documents,
        })
    }

    async fn condense(&self, history: &[Turn], question: &str) -> Result<String, ChainError> {
        let chat_history = format_history(history);
        let prompt = self.condense_prompt.render(&[
            ("chat_history", chat_history.as_str()),
            ("question", question),
        ]);

        let standalone = self
            .chat
            .complete(ChatRequest::prompt(prompt))
            .await?
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        Ok(standalone.unwrap_or_else(|| question.to_string()))
    }
}

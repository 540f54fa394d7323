use std::sync::Arc;
use std::time::Duration;

use crate::chain::{ConversationalChain, PromptTemplate, SessionStore};
use crate::core::config::AppConfig;
use crate::llm::{Embedder, GeminiChat, GeminiClient, GeminiEmbeddings};
use crate::rag::{FlatIndexStore, RagError};
use crate::secrets::{load_api_key, Credential, SecretSource};

pub mod error;
pub mod lifecycle;

use error::InitializationError;
pub use lifecycle::{ChainSlot, ChainState};

/// Application state shared across all routes and background tasks.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub chain: ChainSlot,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            chain: ChainSlot::new(),
        }
    }

    pub fn with_chain(config: AppConfig, chain: ConversationalChain) -> Self {
        Self {
            config: Arc::new(config),
            chain: ChainSlot::ready(Arc::new(chain)),
        }
    }

    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Fetching the API key from Secret Manager
    /// 2. Assembling the retrieval chain
    ///
    /// Neither step is fatal: a failure leaves the chain in `Failed` and the
    /// server still starts.
    pub async fn initialize(config: AppConfig, secrets: &dyn SecretSource) -> Arc<Self> {
        let state = Arc::new(Self::new(config));
        let credential = load_api_key(secrets).await;

        state.chain.begin();
        let result = assemble_chain(&state.config, credential);
        match &result {
            Ok(_) => tracing::info!("Retrieval chain initialized successfully."),
            Err(err) => tracing::error!(
                "CRITICAL Error during retrieval chain initialization: {:?}",
                err
            ),
        }
        state.chain.finish(result);

        state
    }
}

/// Builds the chain from config and the loaded credential.
///
/// Order: vector index, embeddings client, chat model, session memory,
/// prompt templates.
pub fn assemble_chain(
    config: &AppConfig,
    credential: Option<Credential>,
) -> Result<ConversationalChain, InitializationError> {
    tracing::info!("Initializing retrieval chain components...");
    let store = FlatIndexStore::load(&config.paths.index_dir).map_err(|err| match err {
        RagError::MissingIndex(dir) => {
            tracing::error!(
                "Vector index directory not found at expected location: {}",
                dir.display()
            );
            InitializationError::MissingIndex(dir)
        }
        other => InitializationError::Index(other),
    })?;

    let credential = credential.ok_or(InitializationError::MissingCredential)?;
    let client = GeminiClient::new(
        &config.llm.api_base,
        credential,
        Duration::from_secs(config.llm.request_timeout_secs),
    );
    let embeddings = GeminiEmbeddings::new(client.clone(), &config.llm.embedding_model);
    if let Some(built_with) = store.embedding_model() {
        if built_with != embeddings.model_name() {
            tracing::warn!(
                "Vector index was built with {} but queries use {}",
                built_with,
                embeddings.model_name()
            );
        }
    }

    let chat = GeminiChat::new(client, &config.llm.chat_model, config.llm.temperature);
    let memory = SessionStore::from_config(&config.memory);
    let qa_prompt = PromptTemplate::persona().map_err(InitializationError::Prompt)?;
    let condense_prompt =
        PromptTemplate::condense_question().map_err(InitializationError::Prompt)?;

    Ok(ConversationalChain::new(
        Arc::new(embeddings),
        Arc::new(store),
        Arc::new(chat),
        Arc::new(memory),
        qa_prompt,
        condense_prompt,
        config.llm.retriever_k,
    ))
}

/// Periodically drops idle sessions while the chain is ready.
pub fn spawn_session_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_secs(state.config.memory.sweep_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(chain) = state.chain.chain() else {
                continue;
            };
            let removed = chain.memory().evict_expired();
            if removed > 0 {
                tracing::debug!("Evicted {} idle chat sessions", removed);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::tempdir;

    use crate::rag::INDEX_FILE;
    use crate::secrets::{SecretError, SecretName};

    struct UnreachableSecrets;

    #[async_trait]
    impl SecretSource for UnreachableSecrets {
        async fn access_secret(&self, _name: &SecretName) -> Result<Credential, SecretError> {
            Err(SecretError::Payload("metadata server unreachable".to_string()))
        }
    }

    struct FixedSecret;

    #[async_trait]
    impl SecretSource for FixedSecret {
        async fn access_secret(&self, _name: &SecretName) -> Result<Credential, SecretError> {
            Ok(Credential::new("test-key"))
        }
    }

    fn config_with_index(root: &std::path::Path) -> AppConfig {
        let index_dir = root.join("vector_index");
        fs::create_dir_all(&index_dir).expect("index dir");
        fs::write(
            index_dir.join(INDEX_FILE),
            json!({
                "embedding_model": "models/embedding-001",
                "documents": [{ "content": "text", "embedding": [0.1, 0.2, 0.3] }]
            })
            .to_string(),
        )
        .expect("index file");

        let mut config = AppConfig::default();
        config.paths.index_dir = index_dir;
        config
    }

    #[test]
    fn missing_index_directory_fails_assembly() {
        let dir = tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.paths.index_dir = dir.path().join("absent");

        let result = assemble_chain(&config, Some(Credential::new("k")));

        assert!(matches!(result, Err(InitializationError::MissingIndex(_))));
    }

    #[test]
    fn missing_index_is_reported_before_missing_credential() {
        let dir = tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.paths.index_dir = dir.path().join("absent");

        let result = assemble_chain(&config, None);

        match result {
            Err(InitializationError::MissingIndex(path)) => {
                assert_eq!(path, dir.path().join("absent"))
            }
            _ => panic!("expected a missing index error"),
        }
    }

    #[test]
    fn missing_credential_fails_assembly() {
        let dir = tempdir().expect("tempdir");
        let config = config_with_index(dir.path());

        let result = assemble_chain(&config, None);

        assert!(matches!(result, Err(InitializationError::MissingCredential)));
    }

    #[test]
    fn corrupt_index_fails_assembly() {
        let dir = tempdir().expect("tempdir");
        let config = config_with_index(dir.path());
        fs::write(config.paths.index_dir.join(INDEX_FILE), "{ not json").expect("overwrite");

        let result = assemble_chain(&config, Some(Credential::new("k")));

        assert!(matches!(result, Err(InitializationError::Index(_))));
    }

    #[tokio::test]
    async fn initialize_reaches_ready_with_index_and_secret() {
        let dir = tempdir().expect("tempdir");
        let config = config_with_index(dir.path());

        let state = AppState::initialize(config, &FixedSecret).await;

        assert_eq!(state.chain.state().label(), "ready");
        assert!(state.chain.chain().is_some());
    }

    #[tokio::test]
    async fn initialize_degrades_to_failed_instead_of_erroring() {
        let dir = tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.paths.index_dir = dir.path().join("absent");

        let state = AppState::initialize(config, &UnreachableSecrets).await;

        assert_eq!(state.chain.state().label(), "failed");
        assert!(state.chain.chain().is_none());
    }
}

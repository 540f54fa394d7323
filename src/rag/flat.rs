//! File-backed flat vector index.
//!
//! The index directory holds a single `index.json` produced offline:
//!
//! ```json
//! {
//!   "embedding_model": "models/embedding-001",
//!   "dimension": 768,
//!   "documents": [
//!     { "id": "c-0001", "content": "...", "metadata": { "source": "..." }, "embedding": [0.01, ...] }
//!   ]
//! }
//! ```
//!
//! The whole index is loaded into memory once and searched by exhaustive
//! cosine similarity.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use super::store::{ChunkSearchResult, RagError, RagStore, StoredChunk};
use super::vector_math::{top_k, NormalizedMatrix};

pub const INDEX_FILE: &str = "index.json";

#[derive(Deserialize)]
struct IndexFile {
    embedding_model: Option<String>,
    dimension: Option<usize>,
    documents: Vec<IndexDocument>,
}

#[derive(Deserialize)]
struct IndexDocument {
    id: Option<String>,
    content: String,
    metadata: Option<serde_json::Value>,
    embedding: Vec<f32>,
}

pub struct FlatIndexStore {
    chunks: Vec<StoredChunk>,
    matrix: NormalizedMatrix,
    embedding_model: Option<String>,
}

impl FlatIndexStore {
    pub fn load(index_dir: &Path) -> Result<Self, RagError> {
        if !index_dir.is_dir() {
            return Err(RagError::MissingIndex(index_dir.to_path_buf()));
        }

        let path = index_dir.join(INDEX_FILE);
        let contents = fs::read_to_string(&path).map_err(|source| RagError::Io {
            path: path.clone(),
            source,
        })?;
        let file: IndexFile =
            serde_json::from_str(&contents).map_err(|source| RagError::Parse {
                path: path.clone(),
                source,
            })?;

        let store = Self::from_file(file, &path)?;
        tracing::info!(
            "Loaded vector index from {} ({} chunks, dimension {})",
            path.display(),
            store.count(),
            store.dimension()
        );
        Ok(store)
    }

    fn from_file(file: IndexFile, path: &Path) -> Result<Self, RagError> {
        let items = file
            .documents
            .into_iter()
            .enumerate()
            .map(|(idx, doc)| {
                let chunk = StoredChunk {
                    chunk_id: doc.id.unwrap_or_else(|| format!("chunk-{}", idx)),
                    content: doc.content,
                    metadata: doc.metadata,
                };
                (chunk, doc.embedding)
            })
            .collect::<Vec<_>>();

        if items.is_empty() {
            return Err(RagError::InvalidIndex(format!(
                "{} contains no documents",
                path.display()
            )));
        }

        let mut store = Self::from_chunks(items, file.dimension)?;
        store.embedding_model = file.embedding_model;
        Ok(store)
    }

    /// Builds an index from in-memory chunks. Without an explicit
    /// `dimension`, the first embedding decides it.
    pub fn from_chunks(
        items: Vec<(StoredChunk, Vec<f32>)>,
        dimension: Option<usize>,
    ) -> Result<Self, RagError> {
        let dimension = dimension
            .or_else(|| items.first().map(|(_, embedding)| embedding.len()))
            .unwrap_or(0);
        if dimension == 0 {
            return Err(RagError::InvalidIndex(
                "embedding dimension must be positive".to_string(),
            ));
        }

        let (chunks, embeddings): (Vec<StoredChunk>, Vec<Vec<f32>>) = items.into_iter().unzip();
        let matrix = NormalizedMatrix::from_rows(&embeddings, dimension)?;

        Ok(Self {
            chunks,
            matrix,
            embedding_model: None,
        })
    }

    /// Model the index was built with, if recorded.
    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }
}

#[async_trait]
impl RagStore for FlatIndexStore {
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, RagError> {
        let scores = self.matrix.cosine_scores(query_embedding)?;

        Ok(top_k(&scores, limit.max(1))
            .into_iter()
            .map(|(idx, score)| ChunkSearchResult {
                chunk: self.chunks[idx].clone(),
                score,
            })
            .collect())
    }

    fn count(&self) -> usize {
        self.chunks.len()
    }

    fn dimension(&self) -> usize {
        self.matrix.dimension()
    }
}

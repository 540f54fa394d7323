//! Retrieval over the prebuilt vector index.
//!
//! This module provides:
//! - `RagStore`: the search capability the chain depends on
//! - `FlatIndexStore`: the file-backed implementation loaded at startup

mod flat;
mod store;
mod vector_math;

pub use flat::{FlatIndexStore, INDEX_FILE};
pub use store::{ChunkSearchResult, RagError, RagStore, StoredChunk};

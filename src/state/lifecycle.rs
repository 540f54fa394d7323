use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::chain::ConversationalChain;

use super::error::InitializationError;

/// Lifecycle of the retrieval chain.
///
/// `Uninitialized → Initializing → Ready | Failed`. `Ready` and `Failed` are
/// terminal until the process restarts.
#[derive(Clone)]
pub enum ChainState {
    Uninitialized,
    Initializing,
    Ready(Arc<ConversationalChain>),
    Failed(String),
}

impl ChainState {
    pub fn label(&self) -> &'static str {
        match self {
            ChainState::Uninitialized => "uninitialized",
            ChainState::Initializing => "initializing",
            ChainState::Ready(_) => "ready",
            ChainState::Failed(_) => "failed",
        }
    }
}

pub struct ChainSlot {
    inner: RwLock<ChainState>,
}

impl ChainSlot {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ChainState::Uninitialized),
        }
    }

    /// A slot that is already `Ready`.
    pub fn ready(chain: Arc<ConversationalChain>) -> Self {
        Self {
            inner: RwLock::new(ChainState::Ready(chain)),
        }
    }

    /// `Uninitialized → Initializing`. Returns false from any other state.
    pub fn begin(&self) -> bool {
        let mut state = self.write();
        if !matches!(*state, ChainState::Uninitialized) {
            return false;
        }
        *state = ChainState::Initializing;
        true
    }

    /// `Initializing → Ready | Failed`. Returns false from any other state.
    pub fn finish(&self, result: Result<ConversationalChain, InitializationError>) -> bool {
        let mut state = self.write();
        if !matches!(*state, ChainState::Initializing) {
            return false;
        }
        *state = match result {
            Ok(chain) => ChainState::Ready(Arc::new(chain)),
            Err(err) => ChainState::Failed(err.to_string()),
        };
        true
    }

    /// The chain, only when `Ready`.
    pub fn chain(&self) -> Option<Arc<ConversationalChain>> {
        match &*self.read() {
            ChainState::Ready(chain) => Some(chain.clone()),
            _ => None,
        }
    }

    pub fn state(&self) -> ChainState {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, ChainState> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChainState> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ChainSlot {
    fn default() -> Self {
        Self::new()
    }
}

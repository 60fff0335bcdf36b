use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use relbatch_core::{Chunk, OperationSet, TupleKey, TupleOperation};

use crate::config::DEFAULT_MAX_TUPLES_PER_CHUNK;
use crate::error::ClientError;

use super::{Ack, Transport, WriteTarget};

#[derive(Debug, Default)]
struct InnerState {
    stores: HashMap<String, BTreeSet<TupleKey>>,
    requests: usize,
}

/// Process-local stand-in for the authorization service.
///
/// Mirrors the remote write contract: each request is applied atomically,
/// writing an existing tuple or deleting a missing one rejects the whole
/// request, and requests above the per-request limit are refused.
#[derive(Debug, Clone)]
pub struct InMemoryTransport {
    state: Arc<Mutex<InnerState>>,
    max_per_request: usize,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InnerState::default())),
            max_per_request: DEFAULT_MAX_TUPLES_PER_CHUNK,
        }
    }

    pub fn with_max_per_request(mut self, max_per_request: usize) -> Self {
        self.max_per_request = max_per_request;
        self
    }

    /// Inserts tuples directly, bypassing request validation.
    pub fn seed(&self, store_id: &str, keys: impl IntoIterator<Item = TupleKey>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .stores
            .entry(store_id.to_string())
            .or_default()
            .extend(keys);
    }

    /// Tuples currently stored for `store_id`, in key order.
    pub fn tuples(&self, store_id: &str) -> Vec<TupleKey> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .stores
            .get(store_id)
            .map(|tuples| tuples.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, store_id: &str, key: &TupleKey) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .stores
            .get(store_id)
            .is_some_and(|tuples| tuples.contains(key))
    }

    /// Number of requests received, including rejected ones.
    pub fn request_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .requests
    }

    fn apply(&self, target: &WriteTarget, operations: &[TupleOperation]) -> Result<Ack, ClientError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.requests += 1;

        if target.store_id.is_empty() {
            return Err(ClientError::Validation("store id is required".to_string()));
        }
        if operations.len() > self.max_per_request {
            return Err(ClientError::Validation(format!(
                "request contains {} tuple updates, limit is {}",
                operations.len(),
                self.max_per_request
            )));
        }

        let mut seen = HashSet::with_capacity(operations.len());
        for op in operations {
            if !seen.insert(&op.key) {
                return Err(ClientError::Validation(format!(
                    "duplicate tuple in request: {}",
                    op.key
                )));
            }
        }

        let store = state.stores.entry(target.store_id.clone()).or_default();
        for op in operations {
            let exists = store.contains(&op.key);
            if op.is_write() && exists {
                return Err(ClientError::Validation(format!(
                    "cannot write a tuple which already exists: {}",
                    op.key
                )));
            }
            if op.is_delete() && !exists {
                return Err(ClientError::Validation(format!(
                    "cannot delete a tuple which does not exist: {}",
                    op.key
                )));
            }
        }

        for op in operations {
            if op.is_write() {
                store.insert(op.key.clone());
            } else {
                store.remove(&op.key);
            }
        }

        Ok(Ack {
            applied: operations.len(),
        })
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for InMemoryTransport {
    async fn send(&self, target: &WriteTarget, chunk: &Chunk) -> Result<Ack, ClientError> {
        self.apply(target, &chunk.operations)
    }

    async fn send_all(
        &self,
        target: &WriteTarget,
        operations: &OperationSet,
    ) -> Result<Ack, ClientError> {
        self.apply(target, operations.operations())
    }
}

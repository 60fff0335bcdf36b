use crate::error::{BatchError, ClientError};

/// Terminal state of one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutcome {
    pub chunk_index: usize,
    /// Requests actually sent for this chunk; zero for cancelled chunks.
    pub attempts: u32,
    pub succeeded: bool,
    pub error: Option<ClientError>,
}

impl ChunkOutcome {
    pub fn success(chunk_index: usize, attempts: u32) -> Self {
        Self {
            chunk_index,
            attempts,
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(chunk_index: usize, attempts: u32, error: ClientError) -> Self {
        Self {
            chunk_index,
            attempts,
            succeeded: false,
            error: Some(error),
        }
    }

    pub fn cancelled(chunk_index: usize) -> Self {
        Self::failure(chunk_index, 0, ClientError::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(ClientError::is_cancelled)
    }
}

/// Summary of one batch execution.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    transactional: bool,
    total_operations: usize,
    total_chunks: usize,
    succeeded_chunks: usize,
    failed_chunks: usize,
    errors: Vec<ClientError>,
    outcomes: Vec<ChunkOutcome>,
}

impl BatchResult {
    /// Result of a batch with nothing to send.
    pub fn empty(transactional: bool) -> Self {
        ResultAggregator::new(transactional, 0, 0).finish()
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    pub fn total_operations(&self) -> usize {
        self.total_operations
    }

    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    pub fn succeeded_chunks(&self) -> usize {
        self.succeeded_chunks
    }

    pub fn failed_chunks(&self) -> usize {
        self.failed_chunks
    }

    /// Chunk errors in the order the chunks finished.
    pub fn errors(&self) -> &[ClientError] {
        &self.errors
    }

    pub fn first_error(&self) -> Option<&ClientError> {
        self.errors.first()
    }

    /// Per-chunk outcomes in the order the chunks finished.
    pub fn outcomes(&self) -> &[ChunkOutcome] {
        &self.outcomes
    }

    /// Fraction of chunks that succeeded, `0.0` when there were no chunks.
    pub fn success_rate(&self) -> f64 {
        if self.total_chunks == 0 {
            0.0
        } else {
            self.succeeded_chunks as f64 / self.total_chunks as f64
        }
    }

    pub fn is_partial_success(&self) -> bool {
        self.succeeded_chunks > 0 && self.failed_chunks > 0
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_chunks == 0
    }

    pub fn is_complete_failure(&self) -> bool {
        self.total_chunks > 0 && self.succeeded_chunks == 0
    }

    /// Turns any chunk failure into an error.
    pub fn into_result(self) -> Result<Self, BatchError> {
        match self.errors.first() {
            None => Ok(self),
            Some(first) => Err(BatchError::Failed {
                failed_chunks: self.failed_chunks,
                total_chunks: self.total_chunks,
                first_error: first.clone(),
            }),
        }
    }
}

/// Folds chunk outcomes into a [`BatchResult`].
///
/// Outcomes are recorded one at a time by the dispatch loop, in the order
/// chunks reach a terminal state.
#[derive(Debug)]
pub struct ResultAggregator {
    transactional: bool,
    total_operations: usize,
    total_chunks: usize,
    succeeded_chunks: usize,
    failed_chunks: usize,
    errors: Vec<ClientError>,
    outcomes: Vec<ChunkOutcome>,
}

impl ResultAggregator {
    pub fn new(transactional: bool, total_operations: usize, total_chunks: usize) -> Self {
        Self {
            transactional,
            total_operations,
            total_chunks,
            succeeded_chunks: 0,
            failed_chunks: 0,
            errors: Vec::new(),
            outcomes: Vec::with_capacity(total_chunks),
        }
    }

    pub fn record(&mut self, outcome: ChunkOutcome) {
        if outcome.succeeded {
            self.succeeded_chunks += 1;
        } else {
            self.failed_chunks += 1;
            if let Some(ref error) = outcome.error {
                self.errors.push(error.clone());
            }
        }
        self.outcomes.push(outcome);
    }

    pub fn recorded(&self) -> usize {
        self.outcomes.len()
    }

    pub fn finish(self) -> BatchResult {
        debug_assert!(
            self.outcomes.len() <= self.total_chunks,
            "more outcomes than chunks"
        );
        BatchResult {
            transactional: self.transactional,
            total_operations: self.total_operations,
            total_chunks: self.total_chunks,
            succeeded_chunks: self.succeeded_chunks,
            failed_chunks: self.failed_chunks,
            errors: self.errors,
            outcomes: self.outcomes,
        }
    }
}

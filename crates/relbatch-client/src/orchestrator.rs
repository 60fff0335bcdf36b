use std::sync::Arc;
use std::time::Instant;

use relbatch_core::{OperationSet, TupleKey, chunk_operations, deduplicate};

use crate::aggregate::{BatchResult, ChunkOutcome, ResultAggregator};
use crate::config::BatchOptions;
use crate::dispatch::Dispatcher;
use crate::error::BatchError;
use crate::transport::{Transport, WriteTarget};

/// Entry point for writing a batch of tuple changes.
///
/// Composes deduplication, chunking, dispatch and aggregation. The target
/// store and model are passed explicitly with every call.
#[derive(Debug)]
pub struct BatchOrchestrator<T> {
    transport: Arc<T>,
}

impl<T> Clone for BatchOrchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport + 'static> BatchOrchestrator<T> {
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    pub fn from_shared(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Deduplicates `writes` and `deletes` and sends them to `target`.
    ///
    /// Option errors are returned before anything is sent. Chunk failures are
    /// reported inside the [`BatchResult`], never as an `Err`.
    pub async fn execute<W, D>(
        &self,
        target: &WriteTarget,
        writes: W,
        deletes: D,
        options: &BatchOptions,
    ) -> Result<BatchResult, BatchError>
    where
        W: IntoIterator<Item = TupleKey>,
        D: IntoIterator<Item = TupleKey>,
    {
        options.validate()?;
        let operations = deduplicate(writes, deletes);
        self.execute_set(target, operations, options).await
    }

    /// Like [`execute`](Self::execute) for an already deduplicated set.
    pub async fn execute_set(
        &self,
        target: &WriteTarget,
        operations: OperationSet,
        options: &BatchOptions,
    ) -> Result<BatchResult, BatchError> {
        options.validate()?;

        let batch_id = uuid::Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(
            %batch_id,
            store_id = %target.store_id,
            operations = operations.len(),
            writes = operations.write_count(),
            deletes = operations.delete_count(),
            duplicates_removed = operations.duplicates_removed(),
            transactional = options.transactional,
            "starting batch"
        );

        if operations.is_empty() {
            tracing::info!(%batch_id, "nothing to write");
            return Ok(BatchResult::empty(options.transactional));
        }

        let result = if options.transactional {
            self.send_transaction(target, &operations).await
        } else {
            let chunks = chunk_operations(&operations, options.max_tuples_per_chunk)?;
            let mut aggregator = ResultAggregator::new(false, operations.len(), chunks.len());
            Dispatcher::from_options(Arc::clone(&self.transport), options)
                .dispatch(target, chunks, &mut aggregator)
                .await;
            aggregator.finish()
        };

        tracing::info!(
            %batch_id,
            chunks = result.total_chunks(),
            succeeded = result.succeeded_chunks(),
            failed = result.failed_chunks(),
            success_rate = result.success_rate(),
            elapsed = ?started.elapsed(),
            "batch finished"
        );

        Ok(result)
    }

    async fn send_transaction(&self, target: &WriteTarget, operations: &OperationSet) -> BatchResult {
        let mut aggregator = ResultAggregator::new(true, operations.len(), 1);
        match self.transport.send_all(target, operations).await {
            Ok(_) => aggregator.record(ChunkOutcome::success(0, 1)),
            Err(err) => {
                tracing::warn!(error = %err, "transactional write failed");
                aggregator.record(ChunkOutcome::failure(0, 1, err));
            }
        }
        aggregator.finish()
    }
}

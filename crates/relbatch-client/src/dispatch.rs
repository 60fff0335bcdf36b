use std::collections::HashMap;
use std::sync::Arc;

use relbatch_core::Chunk;
use tokio::task::JoinSet;

use crate::aggregate::{ChunkOutcome, ResultAggregator};
use crate::config::BatchOptions;
use crate::error::ClientError;
use crate::retry::RetryPolicy;
use crate::transport::{Transport, WriteTarget};

/// Lifecycle of a chunk inside the dispatcher.
///
/// `Pending -> InFlight -> {Succeeded, Retrying, Failed}`, with `Retrying`
/// looping back to `InFlight`. Pending chunks skipped by fail-fast become
/// `Cancelled` without being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    InFlight { attempt: u32 },
    Retrying { attempt: u32 },
    Succeeded,
    Failed,
    Cancelled,
}

impl ChunkState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChunkState::Succeeded | ChunkState::Failed | ChunkState::Cancelled
        )
    }
}

/// Sends chunks through a [`Transport`] with at most `max_parallel` in flight.
///
/// Chunks start in index order as capacity frees up. Outcomes are recorded
/// one at a time from the dispatch loop, so the aggregator is never shared
/// between tasks.
#[derive(Debug)]
pub struct Dispatcher<T> {
    transport: Arc<T>,
    policy: RetryPolicy,
    max_parallel: usize,
    stop_on_first_error: bool,
}

impl<T: Transport + 'static> Dispatcher<T> {
    pub fn new(
        transport: Arc<T>,
        policy: RetryPolicy,
        max_parallel: usize,
        stop_on_first_error: bool,
    ) -> Self {
        Self {
            transport,
            policy,
            max_parallel: max_parallel.max(1),
            stop_on_first_error,
        }
    }

    pub fn from_options(transport: Arc<T>, options: &BatchOptions) -> Self {
        Self::new(
            transport,
            RetryPolicy::from_options(options),
            options.max_parallel_requests,
            options.stop_on_first_error,
        )
    }

    /// Runs every chunk to a terminal state and records its outcome.
    ///
    /// Returns the final state of each chunk, indexed by position in `chunks`.
    pub async fn dispatch(
        &self,
        target: &WriteTarget,
        chunks: Vec<Chunk>,
        aggregator: &mut ResultAggregator,
    ) -> Vec<ChunkState> {
        let target = Arc::new(target.clone());
        let mut states = vec![ChunkState::Pending; chunks.len()];
        let mut pending = chunks.into_iter().enumerate();
        let mut tasks = JoinSet::new();
        let mut running: HashMap<tokio::task::Id, usize> = HashMap::new();
        let mut cancelled = false;

        loop {
            while !cancelled && tasks.len() < self.max_parallel {
                let Some((position, chunk)) = pending.next() else {
                    break;
                };
                states[position] = ChunkState::InFlight { attempt: 1 };
                let handle = tasks.spawn(run_chunk(
                    Arc::clone(&self.transport),
                    Arc::clone(&target),
                    chunk,
                    self.policy.clone(),
                ));
                running.insert(handle.id(), position);
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };

            let (position, outcome) = match joined {
                Ok((id, outcome)) => (running.remove(&id), outcome),
                Err(err) => {
                    let position = running.remove(&err.id());
                    let chunk_index = position.unwrap_or_default();
                    tracing::error!(chunk = chunk_index, error = %err, "chunk task aborted");
                    (
                        position,
                        ChunkOutcome::failure(
                            chunk_index,
                            0,
                            ClientError::Server(format!("chunk task aborted: {err}")),
                        ),
                    )
                }
            };

            if let Some(position) = position {
                states[position] = if outcome.succeeded {
                    ChunkState::Succeeded
                } else {
                    ChunkState::Failed
                };
            }

            if !outcome.succeeded && self.stop_on_first_error && !cancelled {
                tracing::warn!(
                    chunk = outcome.chunk_index,
                    in_flight = tasks.len(),
                    "chunk failed, cancelling pending chunks"
                );
                cancelled = true;
            }
            aggregator.record(outcome);
        }

        for (position, chunk) in pending {
            tracing::debug!(chunk = chunk.index, "chunk cancelled before dispatch");
            states[position] = ChunkState::Cancelled;
            aggregator.record(ChunkOutcome::cancelled(chunk.index));
        }

        states
    }
}

/// Sends one chunk until it succeeds, fails fatally, or runs out of retries.
async fn run_chunk<T: Transport>(
    transport: Arc<T>,
    target: Arc<WriteTarget>,
    chunk: Chunk,
    policy: RetryPolicy,
) -> ChunkOutcome {
    let mut attempt = 1;
    loop {
        let state = ChunkState::InFlight { attempt };
        tracing::debug!(
            chunk = chunk.index,
            attempt,
            operations = chunk.len(),
            ?state,
            "sending chunk"
        );

        let err = match transport.send(&target, &chunk).await {
            Ok(ack) => {
                tracing::debug!(chunk = chunk.index, attempt, applied = ack.applied, "chunk applied");
                return ChunkOutcome::success(chunk.index, attempt);
            }
            Err(err) => err,
        };

        let class = policy.classify(&err);
        if !policy.should_retry(attempt, class) {
            tracing::warn!(
                chunk = chunk.index,
                attempt,
                class = ?class,
                error = %err,
                "chunk failed"
            );
            return ChunkOutcome::failure(chunk.index, attempt, err);
        }

        let delay = policy.delay_after(attempt, &err);
        let state = ChunkState::Retrying { attempt };
        tracing::warn!(
            chunk = chunk.index,
            attempt,
            class = ?class,
            ?delay,
            error = %err,
            ?state,
            "retrying chunk"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

mod chunk;
mod dedup;

pub use chunk::{Chunk, chunk_operations};
pub use dedup::{OperationSet, deduplicate};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("max_tuples_per_chunk must be at least 1, got {0}")]
    InvalidChunkSize(usize),

    #[error("max_parallel_requests must be at least 1, got {0}")]
    InvalidParallelism(usize),

    #[error("retry_delay_seconds must be a finite, non-negative number, got {0}")]
    InvalidRetryDelay(f64),

    #[error("invalid option '{field}': {message}")]
    InvalidOption { field: &'static str, message: String },
}

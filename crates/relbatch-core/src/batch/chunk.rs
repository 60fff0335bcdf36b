use crate::tuple::TupleOperation;

use super::{ConfigurationError, OperationSet};

/// A contiguous slice of an [`OperationSet`] sent as one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub operations: Vec<TupleOperation>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn writes(&self) -> impl Iterator<Item = &TupleOperation> {
        self.operations.iter().filter(|op| op.is_write())
    }

    pub fn deletes(&self) -> impl Iterator<Item = &TupleOperation> {
        self.operations.iter().filter(|op| op.is_delete())
    }
}

/// Splits `set` into `ceil(len / max_per_chunk)` chunks, preserving order.
pub fn chunk_operations(
    set: &OperationSet,
    max_per_chunk: usize,
) -> Result<Vec<Chunk>, ConfigurationError> {
    if max_per_chunk == 0 {
        return Err(ConfigurationError::InvalidChunkSize(max_per_chunk));
    }

    Ok(set
        .operations()
        .chunks(max_per_chunk)
        .enumerate()
        .map(|(index, operations)| Chunk {
            index,
            operations: operations.to_vec(),
        })
        .collect())
}

pub mod batch;
pub mod tuple;

pub use batch::{Chunk, ConfigurationError, OperationSet, chunk_operations, deduplicate};
pub use tuple::{OperationKind, TupleKey, TupleOperation};

pub mod aggregate;
pub mod config;
pub mod conversions;
pub mod dispatch;
pub mod error;
pub mod interceptor;
pub mod orchestrator;
pub mod proto;
pub mod retry;
pub mod transport;

pub use aggregate::{BatchResult, ChunkOutcome, ResultAggregator};
pub use config::{BatchOptions, ClientOptions, DEFAULT_MAX_TUPLES_PER_CHUNK};
pub use dispatch::{ChunkState, Dispatcher};
pub use error::{BatchError, ClientError};
pub use orchestrator::BatchOrchestrator;
pub use retry::{ErrorClass, RetryPolicy};
pub use transport::{Ack, GrpcTransport, InMemoryTransport, Transport, WriteTarget};

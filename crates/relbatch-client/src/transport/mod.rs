mod grpc;
mod memory;

pub use grpc::GrpcTransport;
pub use memory::InMemoryTransport;

use std::future::Future;

use relbatch_core::{Chunk, OperationSet};

use crate::error::ClientError;

/// Store (and optionally the authorization model) a batch is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTarget {
    pub store_id: String,
    pub authorization_model_id: Option<String>,
}

impl WriteTarget {
    pub fn new(store_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            authorization_model_id: None,
        }
    }

    pub fn with_model(mut self, authorization_model_id: impl Into<String>) -> Self {
        self.authorization_model_id = Some(authorization_model_id.into());
        self
    }
}

/// Acknowledgement of an applied write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub applied: usize,
}

/// Sends tuple operations to the authorization service.
///
/// A single call is one request: the service applies all of its operations or
/// none of them.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        target: &WriteTarget,
        chunk: &Chunk,
    ) -> impl Future<Output = Result<Ack, ClientError>> + Send;

    fn send_all(
        &self,
        target: &WriteTarget,
        operations: &OperationSet,
    ) -> impl Future<Output = Result<Ack, ClientError>> + Send;
}

use relbatch_core::{Chunk, OperationSet};
use tonic::transport::Channel;

use crate::config::ClientOptions;
use crate::conversions;
use crate::error::ClientError;
use crate::interceptor::BearerInterceptor;
use crate::proto::relbatch::v1::{self, relationship_service_client::RelationshipServiceClient};

use super::{Ack, Transport, WriteTarget};

type InterceptedChannel =
    tonic::service::interceptor::InterceptedService<Channel, BearerInterceptor>;

/// Transport over the `relbatch.v1.RelationshipService` gRPC API.
///
/// Cloning is cheap; clones share the underlying HTTP/2 channel.
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    relationships: RelationshipServiceClient<InterceptedChannel>,
}

impl GrpcTransport {
    pub async fn connect(endpoint: &str, options: ClientOptions) -> Result<Self, ClientError> {
        let channel = Channel::from_shared(endpoint.to_string())
            .map_err(|e| ClientError::Connection(e.to_string()))?
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .connect()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        Self::from_channel(channel, &options)
    }

    pub fn from_channel(channel: Channel, options: &ClientOptions) -> Result<Self, ClientError> {
        let interceptor = BearerInterceptor::new(options.api_key.as_deref())?;
        Ok(Self {
            relationships: RelationshipServiceClient::with_interceptor(channel, interceptor),
        })
    }

    async fn write(&self, request: v1::WriteRelationshipsRequest) -> Result<Ack, ClientError> {
        let sent = request.updates.len();
        let response = self
            .relationships
            .clone()
            .write_relationships(request)
            .await?
            .into_inner();

        Ok(Ack {
            applied: usize::try_from(response.applied).unwrap_or(sent),
        })
    }
}

impl Transport for GrpcTransport {
    async fn send(&self, target: &WriteTarget, chunk: &Chunk) -> Result<Ack, ClientError> {
        self.write(conversions::write_request(target, &chunk.operations))
            .await
    }

    async fn send_all(
        &self,
        target: &WriteTarget,
        operations: &OperationSet,
    ) -> Result<Ack, ClientError> {
        self.write(conversions::write_request(target, operations))
            .await
    }
}

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relbatch_client::proto::relbatch::v1::{
    self,
    relationship_service_server::{RelationshipService, RelationshipServiceServer},
};
use relbatch_client::{
    BatchOptions, BatchOrchestrator, ClientError, ClientOptions, GrpcTransport, InMemoryTransport,
    Transport, WriteTarget, conversions,
};
use relbatch_core::{Chunk, TupleKey};
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};

const API_KEY: &str = "integration-key";

/// Relationship service backed by the in-memory store, with scripted
/// failures returned ahead of real processing.
struct TestRelationshipService {
    store: InMemoryTransport,
    faults: Arc<Mutex<VecDeque<Status>>>,
    requests: Arc<Mutex<Vec<v1::WriteRelationshipsRequest>>>,
}

#[tonic::async_trait]
impl RelationshipService for TestRelationshipService {
    async fn write_relationships(
        &self,
        request: Request<v1::WriteRelationshipsRequest>,
    ) -> Result<Response<v1::WriteRelationshipsResponse>, Status> {
        let authorized = request
            .metadata()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {API_KEY}"));
        if !authorized {
            return Err(Status::unauthenticated("missing or invalid api key"));
        }

        if let Some(status) = self.faults.lock().unwrap().pop_front() {
            return Err(status);
        }

        let req = request.into_inner();
        self.requests.lock().unwrap().push(req.clone());

        let operations = req
            .updates
            .iter()
            .map(|update| {
                conversions::proto_update_to_domain(update)
                    .ok_or_else(|| Status::invalid_argument("update needs an operation and a tuple key"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let target = WriteTarget {
            store_id: req.store_id,
            authorization_model_id: req.authorization_model_id,
        };

        let ack = self
            .store
            .send(&target, &Chunk { index: 0, operations })
            .await
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        Ok(Response::new(v1::WriteRelationshipsResponse {
            applied: ack.applied as u32,
        }))
    }
}

struct TestServer {
    endpoint: String,
    store: InMemoryTransport,
    faults: Arc<Mutex<VecDeque<Status>>>,
    requests: Arc<Mutex<Vec<v1::WriteRelationshipsRequest>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    fn inject(&self, status: Status) {
        self.faults.lock().unwrap().push_back(status);
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn start_server() -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let endpoint = format!("http://{addr}");

    let store = InMemoryTransport::new();
    let faults = Arc::new(Mutex::new(VecDeque::new()));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let service = RelationshipServiceServer::new(TestRelationshipService {
        store: store.clone(),
        faults: Arc::clone(&faults),
        requests: Arc::clone(&requests),
    });

    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    let handle = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(service)
            .serve_with_incoming(incoming)
            .await
            .unwrap();
    });

    TestServer {
        endpoint,
        store,
        faults,
        requests,
        _handle: handle,
    }
}

async fn connect(endpoint: &str, api_key: Option<&str>) -> GrpcTransport {
    let options = ClientOptions {
        api_key: api_key.map(str::to_string),
        ..ClientOptions::default()
    };
    GrpcTransport::connect(endpoint, options).await.unwrap()
}

fn writes(n: usize) -> Vec<TupleKey> {
    (0..n)
        .map(|i| TupleKey::new(format!("user:{i}"), "viewer", "folder:reports"))
        .collect()
}

fn fast_retries() -> BatchOptions {
    BatchOptions::non_transactional()
        .with_retry_delay_seconds(0.01)
        .with_rate_limit_delay(Duration::from_millis(10))
}

#[tokio::test]
async fn chunked_writes_reach_the_server() {
    let server = start_server().await;
    let orchestrator = BatchOrchestrator::new(connect(&server.endpoint, Some(API_KEY)).await);
    let target = WriteTarget::new("store-a").with_model("model-7");
    let options = fast_retries()
        .with_max_tuples_per_chunk(10)
        .with_max_parallel_requests(3);

    let result = orchestrator
        .execute(&target, writes(35), Vec::new(), &options)
        .await
        .unwrap();

    assert!(result.is_complete_success());
    assert_eq!(result.total_chunks(), 4);
    assert_eq!(server.request_count(), 4);
    assert_eq!(server.store.tuples("store-a").len(), 35);
    let requests = server.requests.lock().unwrap();
    assert!(requests
        .iter()
        .all(|r| r.authorization_model_id.as_deref() == Some("model-7")));
    assert!(requests.iter().all(|r| r.updates.len() <= 10));
}

#[tokio::test]
async fn transactional_write_is_one_request() {
    let server = start_server().await;
    let orchestrator = BatchOrchestrator::new(connect(&server.endpoint, Some(API_KEY)).await);
    let target = WriteTarget::new("store-a");

    let result = orchestrator
        .execute(&target, writes(60), Vec::new(), &BatchOptions::default())
        .await
        .unwrap();

    assert!(result.is_complete_success());
    assert_eq!(result.total_chunks(), 1);
    assert_eq!(server.request_count(), 1);
    assert_eq!(server.requests.lock().unwrap()[0].authorization_model_id, None);
}

#[tokio::test]
async fn rejected_transaction_applies_nothing() {
    let server = start_server().await;
    let orchestrator = BatchOrchestrator::new(connect(&server.endpoint, Some(API_KEY)).await);
    let target = WriteTarget::new("store-a");
    let missing = TupleKey::new("user:ghost", "viewer", "folder:reports");

    let result = orchestrator
        .execute(&target, writes(5), vec![missing], &BatchOptions::default())
        .await
        .unwrap();

    assert!(result.is_complete_failure());
    assert!(matches!(
        result.first_error(),
        Some(ClientError::Validation(msg)) if msg.contains("does not exist")
    ));
    assert!(server.store.tuples("store-a").is_empty());
}

#[tokio::test]
async fn missing_api_key_is_fatal() {
    let server = start_server().await;
    let orchestrator = BatchOrchestrator::new(connect(&server.endpoint, None).await);
    let target = WriteTarget::new("store-a");

    let result = orchestrator
        .execute(&target, writes(3), Vec::new(), &fast_retries())
        .await
        .unwrap();

    assert!(result.is_complete_failure());
    assert_eq!(result.outcomes()[0].attempts, 1);
    assert!(matches!(
        result.first_error(),
        Some(ClientError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn unavailable_server_is_retried() {
    let server = start_server().await;
    server.inject(Status::unavailable("connection dropped"));
    server.inject(Status::internal("boom"));
    let orchestrator = BatchOrchestrator::new(connect(&server.endpoint, Some(API_KEY)).await);
    let target = WriteTarget::new("store-a");

    let result = orchestrator
        .execute(&target, writes(3), Vec::new(), &fast_retries())
        .await
        .unwrap();

    assert!(result.is_complete_success());
    assert_eq!(result.outcomes()[0].attempts, 3);
    assert_eq!(server.store.tuples("store-a").len(), 3);
}

#[tokio::test]
async fn rate_limits_and_maintenance_are_retried() {
    let server = start_server().await;
    let mut metadata = MetadataMap::new();
    metadata.insert("retry-after", "0.01".parse().unwrap());
    server.inject(Status::with_metadata(
        tonic::Code::ResourceExhausted,
        "quota exceeded",
        metadata,
    ));
    server.inject(Status::unavailable("scheduled maintenance"));
    let orchestrator = BatchOrchestrator::new(connect(&server.endpoint, Some(API_KEY)).await);
    let target = WriteTarget::new("store-a");

    let result = orchestrator
        .execute(&target, writes(2), Vec::new(), &fast_retries())
        .await
        .unwrap();

    assert!(result.is_complete_success());
    assert_eq!(result.outcomes()[0].attempts, 3);
}

#[tokio::test]
async fn oversized_retry_after_falls_back_to_rate_limit_delay() {
    let server = start_server().await;
    let mut metadata = MetadataMap::new();
    metadata.insert("retry-after", "1e20".parse().unwrap());
    server.inject(Status::with_metadata(
        tonic::Code::ResourceExhausted,
        "quota exceeded",
        metadata,
    ));
    let orchestrator = BatchOrchestrator::new(connect(&server.endpoint, Some(API_KEY)).await);
    let target = WriteTarget::new("store-a");

    let result = orchestrator
        .execute(&target, writes(2), Vec::new(), &fast_retries())
        .await
        .unwrap();

    assert!(result.is_complete_success());
    assert_eq!(result.outcomes()[0].attempts, 2);
    assert_eq!(server.store.tuples("store-a").len(), 2);
}

#[tokio::test]
async fn fail_fast_over_grpc() {
    let server = start_server().await;
    server.inject(Status::invalid_argument("schema mismatch"));
    let orchestrator = BatchOrchestrator::new(connect(&server.endpoint, Some(API_KEY)).await);
    let target = WriteTarget::new("store-a");
    let options = fast_retries()
        .with_max_tuples_per_chunk(2)
        .with_stop_on_first_error(true);

    let result = orchestrator
        .execute(&target, writes(10), Vec::new(), &options)
        .await
        .unwrap();

    assert_eq!(result.total_chunks(), 5);
    assert_eq!(result.failed_chunks(), 5);
    assert!(matches!(
        result.first_error(),
        Some(ClientError::Validation(msg)) if msg == "schema mismatch"
    ));
    assert!(result.errors()[1..].iter().all(ClientError::is_cancelled));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn connect_to_invalid_endpoint_fails() {
    let result = GrpcTransport::connect("not a uri", ClientOptions::default()).await;

    assert!(matches!(result, Err(ClientError::Connection(_))));
}

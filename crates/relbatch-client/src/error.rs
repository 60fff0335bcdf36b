use std::fmt;
use std::time::Duration;

use relbatch_core::ConfigurationError;

/// Failure of a single request to the authorization service.
///
/// Values are cloned into chunk outcomes and batch results, so the gRPC status
/// is flattened into its code and message.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    Connection(String),
    Validation(String),
    Unauthorized(String),
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },
    Maintenance(String),
    Network(String),
    Server(String),
    Timeout,
    Cancelled,
    Status {
        code: tonic::Code,
        message: String,
    },
}

impl ClientError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        ClientError::RateLimited {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Server-provided hint for how long to wait before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Connection(msg) => write!(f, "connection error: {msg}"),
            ClientError::Validation(msg) => write!(f, "validation error: {msg}"),
            ClientError::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            ClientError::RateLimited {
                message,
                retry_after: Some(after),
            } => write!(
                f,
                "rate limited: {message} (retry after {:.3}s)",
                after.as_secs_f64()
            ),
            ClientError::RateLimited { message, .. } => write!(f, "rate limited: {message}"),
            ClientError::Maintenance(msg) => write!(f, "service under maintenance: {msg}"),
            ClientError::Network(msg) => write!(f, "network error: {msg}"),
            ClientError::Server(msg) => write!(f, "server error: {msg}"),
            ClientError::Timeout => write!(f, "request timed out"),
            ClientError::Cancelled => write!(f, "cancelled after an earlier chunk failed"),
            ClientError::Status { code, message } => {
                write!(f, "grpc status {code:?}: {message}")
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            tonic::Code::InvalidArgument
            | tonic::Code::FailedPrecondition
            | tonic::Code::AlreadyExists
            | tonic::Code::NotFound
            | tonic::Code::OutOfRange => ClientError::Validation(message),
            tonic::Code::PermissionDenied | tonic::Code::Unauthenticated => {
                ClientError::Unauthorized(message)
            }
            tonic::Code::ResourceExhausted => ClientError::RateLimited {
                retry_after: retry_after_hint(&status),
                message,
            },
            tonic::Code::Unavailable if message.to_ascii_lowercase().contains("maintenance") => {
                ClientError::Maintenance(message)
            }
            tonic::Code::Unavailable => ClientError::Network(message),
            tonic::Code::DeadlineExceeded => ClientError::Timeout,
            tonic::Code::Internal | tonic::Code::Unknown | tonic::Code::Aborted => {
                ClientError::Server(message)
            }
            code => ClientError::Status { code, message },
        }
    }
}

fn retry_after_hint(status: &tonic::Status) -> Option<Duration> {
    let seconds: f64 = status
        .metadata()
        .get("retry-after")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// Errors returned by the batch orchestrator itself.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("invalid batch options: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("{failed_chunks} of {total_chunks} chunks failed, first error: {first_error}")]
    Failed {
        failed_chunks: usize,
        total_chunks: usize,
        first_error: ClientError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_maps_to_validation() {
        let err: ClientError = tonic::Status::invalid_argument("bad tuple").into();

        assert_eq!(err, ClientError::Validation("bad tuple".to_string()));
    }

    #[test]
    fn already_exists_maps_to_validation() {
        let err: ClientError = tonic::Status::already_exists("tuple exists").into();

        assert!(matches!(err, ClientError::Validation(msg) if msg == "tuple exists"));
    }

    #[test]
    fn permission_denied_maps_to_unauthorized() {
        let err: ClientError = tonic::Status::permission_denied("no access").into();

        assert!(matches!(err, ClientError::Unauthorized(msg) if msg == "no access"));
    }

    #[test]
    fn resource_exhausted_maps_to_rate_limited() {
        let err: ClientError = tonic::Status::resource_exhausted("slow down").into();

        assert_eq!(err, ClientError::rate_limited("slow down"));
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn resource_exhausted_reads_retry_after_metadata() {
        let mut status = tonic::Status::resource_exhausted("slow down");
        status
            .metadata_mut()
            .insert("retry-after", "2.5".parse().unwrap());

        let err: ClientError = status.into();

        assert_eq!(err.retry_after(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn oversized_retry_after_is_ignored() {
        let mut status = tonic::Status::resource_exhausted("slow down");
        status
            .metadata_mut()
            .insert("retry-after", "1e20".parse().unwrap());

        let err: ClientError = status.into();

        assert_eq!(err, ClientError::rate_limited("slow down"));
    }

    #[test]
    fn negative_retry_after_is_ignored() {
        let mut status = tonic::Status::resource_exhausted("slow down");
        status
            .metadata_mut()
            .insert("retry-after", "-3".parse().unwrap());

        let err: ClientError = status.into();

        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn malformed_retry_after_is_ignored() {
        let mut status = tonic::Status::resource_exhausted("slow down");
        status
            .metadata_mut()
            .insert("retry-after", "soon".parse().unwrap());

        let err: ClientError = status.into();

        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn unavailable_maps_to_network_or_maintenance() {
        let network: ClientError = tonic::Status::unavailable("connection reset").into();
        let maintenance: ClientError =
            tonic::Status::unavailable("store is in Maintenance mode").into();

        assert!(matches!(network, ClientError::Network(_)));
        assert!(matches!(maintenance, ClientError::Maintenance(_)));
    }

    #[test]
    fn deadline_exceeded_maps_to_timeout() {
        let err: ClientError = tonic::Status::deadline_exceeded("too slow").into();

        assert_eq!(err, ClientError::Timeout);
    }

    #[test]
    fn internal_maps_to_server() {
        let err: ClientError = tonic::Status::internal("server broke").into();

        assert!(matches!(err, ClientError::Server(msg) if msg == "server broke"));
    }

    #[test]
    fn unimplemented_keeps_status_code() {
        let err: ClientError = tonic::Status::unimplemented("nope").into();

        assert!(matches!(
            err,
            ClientError::Status { code: tonic::Code::Unimplemented, .. }
        ));
    }

    #[test]
    fn client_error_display_includes_message() {
        assert_eq!(
            ClientError::Validation("doc not found".to_string()).to_string(),
            "validation error: doc not found"
        );
        assert_eq!(ClientError::Timeout.to_string(), "request timed out");
        assert_eq!(
            ClientError::RateLimited {
                message: "busy".to_string(),
                retry_after: Some(Duration::from_secs(3)),
            }
            .to_string(),
            "rate limited: busy (retry after 3.000s)"
        );
    }

    #[test]
    fn batch_error_from_configuration_error() {
        let err: BatchError = ConfigurationError::InvalidParallelism(0).into();

        assert!(err.to_string().contains("max_parallel_requests"));
    }
}

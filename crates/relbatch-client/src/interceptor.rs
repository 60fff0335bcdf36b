use std::fmt;

use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;

use crate::error::ClientError;

/// Attaches a bearer token to every outgoing request.
///
/// The header value is built once, so a key that cannot be encoded is reported
/// when the transport is constructed rather than on each request.
#[derive(Clone)]
pub struct BearerInterceptor {
    authorization: Option<MetadataValue<Ascii>>,
}

impl fmt::Debug for BearerInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerInterceptor")
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl BearerInterceptor {
    pub fn new(api_key: Option<&str>) -> Result<Self, ClientError> {
        let authorization = api_key
            .map(|key| {
                format!("Bearer {key}")
                    .parse::<MetadataValue<Ascii>>()
                    .map_err(|_| {
                        ClientError::Connection("api key contains invalid header characters".into())
                    })
            })
            .transpose()?;
        Ok(Self { authorization })
    }
}

impl Interceptor for BearerInterceptor {
    fn call(
        &mut self,
        mut request: tonic::Request<()>,
    ) -> Result<tonic::Request<()>, tonic::Status> {
        if let Some(ref value) = self.authorization {
            request
                .metadata_mut()
                .insert("authorization", value.clone());
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_authorization_header() {
        let mut interceptor = BearerInterceptor::new(Some("test-key-123")).unwrap();

        let result = interceptor.call(tonic::Request::new(())).unwrap();
        let auth = result.metadata().get("authorization").unwrap();

        assert_eq!(auth.to_str().unwrap(), "Bearer test-key-123");
    }

    #[test]
    fn skips_header_without_key() {
        let mut interceptor = BearerInterceptor::new(None).unwrap();

        let result = interceptor.call(tonic::Request::new(())).unwrap();

        assert!(result.metadata().get("authorization").is_none());
    }

    #[test]
    fn rejects_key_with_control_characters() {
        let result = BearerInterceptor::new(Some("bad\nkey"));

        assert!(matches!(result, Err(ClientError::Connection(_))));
    }

    #[test]
    fn debug_redacts_key() {
        let interceptor = BearerInterceptor::new(Some("secret-key-abc")).unwrap();

        let debug_output = format!("{interceptor:?}");

        assert!(!debug_output.contains("secret-key-abc"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}

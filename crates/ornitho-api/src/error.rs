//! Error types for the ornitho API client

use std::fmt;
use std::sync::Arc;

/// Diagnostics captured from a non-2xx response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub status: u16,
    pub reason: String,
    pub path: String,
    /// Query string with credentials replaced by [`REDACTED`](crate::transport::REDACTED)
    pub query: String,
    pub request_body: Option<String>,
    pub response_body: String,
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} on /{}?{}", self.status, self.reason, self.path, self.query)?;
        if let Some(ref body) = self.request_body {
            write!(f, " (body: {})", body)?;
        }
        Ok(())
    }
}

/// Errors that can occur when interacting with the ornitho API
#[derive(Debug, Clone)]
pub enum OrnithoError {
    /// 401 - credentials were rejected
    Authentication(HttpFailure),
    /// 502
    BadGateway(HttpFailure),
    /// 503
    ServiceUnavailable(HttpFailure),
    /// 504 - narrow the request down with filters
    GatewayTimeout(HttpFailure),
    /// Any other non-2xx status
    Http(HttpFailure),
    /// Response declared an unsupported content type, or none at all
    ContentType {
        path: String,
        content_type: Option<String>,
    },
    /// A lookup expected exactly one record
    ObjectNotFound { path: String, found: usize },
    /// Declared JSON, but the body did not parse
    Decode(Arc<serde_json::Error>),
    /// Records were expected but the payload was a document
    Normalization(String),
    /// A successful response lacked something the operation needs
    UnexpectedResponse(String),
    /// reqwest failed before a response arrived
    Request(Arc<reqwest::Error>),
    /// Network failure reported by a custom backend
    Connection(String),
    /// Missing or invalid configuration
    Config(String),
    /// The entity has no identifier yet
    MissingIdentifier(&'static str),
    InvalidIdentifier(String),
    /// The entity was deleted remotely
    Deleted(String),
    Unsupported(String),
}

impl OrnithoError {
    /// HTTP status code, for errors raised from a response
    pub fn status(&self) -> Option<u16> {
        self.http_failure().map(|failure| failure.status)
    }

    /// Response diagnostics, for errors raised from a response
    pub fn http_failure(&self) -> Option<&HttpFailure> {
        match self {
            Self::Authentication(failure)
            | Self::BadGateway(failure)
            | Self::ServiceUnavailable(failure)
            | Self::GatewayTimeout(failure)
            | Self::Http(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for OrnithoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication(failure) => write!(f, "Authentication failed: {}", failure),
            Self::BadGateway(failure) => write!(f, "Bad gateway: {}", failure),
            Self::ServiceUnavailable(failure) => write!(f, "Service unavailable: {}", failure),
            Self::GatewayTimeout(failure) => write!(f, "Gateway timeout: {}", failure),
            Self::Http(failure) => write!(f, "HTTP error: {}", failure),
            Self::ContentType { path, content_type } => write!(
                f,
                "Unhandled content type {} for /{}",
                content_type.as_deref().unwrap_or("<missing>"),
                path
            ),
            Self::ObjectNotFound { path, found } => {
                write!(f, "Expected one object at /{}, found {}", path, found)
            }
            Self::Decode(err) => write!(f, "JSON decode error: {}", err),
            Self::Normalization(msg) => write!(f, "Normalization error: {}", msg),
            Self::UnexpectedResponse(msg) => write!(f, "Unexpected response: {}", msg),
            Self::Request(err) => write!(f, "Request failed: {}", err),
            Self::Connection(msg) => write!(f, "Connection error: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::MissingIdentifier(kind) => write!(f, "{} has no identifier", kind),
            Self::InvalidIdentifier(id) => write!(f, "Invalid identifier: {}", id),
            Self::Deleted(path) => write!(f, "Object at /{} was deleted", path),
            Self::Unsupported(msg) => write!(f, "Unsupported operation: {}", msg),
        }
    }
}

impl std::error::Error for OrnithoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(err) => Some(err.as_ref()),
            Self::Decode(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OrnithoError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(Arc::new(err))
    }
}

impl From<serde_json::Error> for OrnithoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(Arc::new(err))
    }
}

/// Result type for ornitho API operations
pub type Result<T> = std::result::Result<T, OrnithoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn json_error() -> OrnithoError {
        serde_json::from_str::<serde_json::Value>("{").unwrap_err().into()
    }

    fn failure(status: u16) -> HttpFailure {
        HttpFailure {
            status,
            reason: "Service Unavailable".to_string(),
            path: "observations".to_string(),
            query: "user_email=%2A%2A%2A&id_species=1".to_string(),
            request_body: None,
            response_body: String::new(),
        }
    }

    #[test]
    fn test_http_failure_display() {
        let err = OrnithoError::ServiceUnavailable(failure(503));
        assert_eq!(
            format!("{}", err),
            "Service unavailable: 503 Service Unavailable on /observations?user_email=%2A%2A%2A&id_species=1"
        );
    }

    #[test]
    fn test_http_failure_display_with_body() {
        let mut failure = failure(400);
        failure.reason = "Bad Request".to_string();
        failure.request_body = Some("{\"id_form\":1}".to_string());
        let err = OrnithoError::Http(failure);
        assert!(format!("{}", err).ends_with("(body: {\"id_form\":1})"));
    }

    #[test]
    fn test_status_only_for_response_errors() {
        assert_eq!(OrnithoError::GatewayTimeout(failure(504)).status(), Some(504));
        assert_eq!(json_error().status(), None);
    }

    #[test]
    fn test_source_chains_underlying_errors() {
        let err = json_error();
        assert!(matches!(err, OrnithoError::Decode(_)));
        assert!(err.source().is_some());

        let err: OrnithoError = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err()
            .into();
        assert!(matches!(err, OrnithoError::Request(_)));
        assert!(err.source().is_some());

        assert!(OrnithoError::Connection("reset".to_string()).source().is_none());
    }

    #[test]
    fn test_content_type_display_missing() {
        let err = OrnithoError::ContentType {
            path: "species/1".to_string(),
            content_type: None,
        };
        assert_eq!(
            format!("{}", err),
            "Unhandled content type <missing> for /species/1"
        );
    }

    #[test]
    fn test_object_not_found_display() {
        let err = OrnithoError::ObjectNotFound {
            path: "places/7".to_string(),
            found: 2,
        };
        assert_eq!(format!("{}", err), "Expected one object at /places/7, found 2");
    }

    #[test]
    fn test_error_is_debug() {
        let err = OrnithoError::MissingIdentifier("Observation");
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("MissingIdentifier"));
    }
}

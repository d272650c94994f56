use http::StatusCode;
use odatakit_batch::BatchError;
use odatakit_resource::ResourceError;
use odatakit_schema::SchemaError;
use thiserror::Error;

/// Errors raised while talking to an `OData` service.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    /// Raised by the transport collaborator (network, connection, ...)
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-2xx status
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    /// Body does not have the shape the request asked for
    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),

    #[error("cannot attach `{attached}` to a resource of type `{requested}`")]
    ReattachType { attached: String, requested: String },

    #[error("not attached to a resource")]
    Detached,

    #[error("entity has no key")]
    MissingKey,

    /// Adding or removing members needs an entity set or a navigation
    #[error("cannot add or remove members through `{0}`")]
    NotMutable(String),

    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Wrap any transport-side failure.
    #[must_use]
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport(err.into())
    }

    /// Status of an `HttpStatus` error.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

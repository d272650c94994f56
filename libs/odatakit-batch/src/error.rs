use thiserror::Error;

/// Errors raised while decoding a `$batch` response.
///
/// Envelope-level problems fail the whole decode. Per-request problems are
/// reported in that request's slot so the others are still delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BatchError {
    #[error("content type carries no multipart boundary: {0}")]
    MissingBoundary(String),

    #[error("malformed multipart body: {0}")]
    Malformed(String),

    #[error("invalid status line: {0}")]
    InvalidStatusLine(String),

    #[error("no response for request #{index}")]
    MissingResponse { index: usize },

    #[error("changeset response for request #{index}, which was sent outside a changeset")]
    UnexpectedChangeset { index: usize },
}

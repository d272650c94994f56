//! The seam to whatever actually performs HTTP.
//!
//! The client never opens connections itself. It hands a fully described
//! [`TransportRequest`] to a [`Transport`] and gets a buffered
//! [`TransportResponse`] back. Retries, credentials and timeouts live behind
//! this trait.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::Value;

use crate::error::ClientError;

/// What the caller expects the body to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseKind {
    #[default]
    Json,
    Text,
    Binary,
}

impl ResponseKind {
    /// `Accept` header value for this kind.
    #[must_use]
    pub fn accept(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Text => "text/plain",
            Self::Binary => "application/octet-stream",
        }
    }
}

/// One HTTP exchange, described without executing it.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    /// Endpoint without query string.
    pub url: String,
    /// Query parameters in wire order, not yet encoded.
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub kind: ResponseKind,
}

impl TransportRequest {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            kind: ResponseKind::default(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Raw body with its content type.
    #[must_use]
    pub fn with_body(mut self, content_type: HeaderValue, body: impl Into<Bytes>) -> Self {
        self.headers.insert(CONTENT_TYPE, content_type);
        self.body = Some(body.into());
        self
    }

    /// JSON body.
    #[must_use]
    pub fn with_json(self, body: &Value) -> Self {
        self.with_body(
            HeaderValue::from_static("application/json"),
            body.to_string(),
        )
    }

    /// Body as JSON, when there is one.
    ///
    /// # Errors
    /// Returns the parse error for a body that is not JSON.
    pub fn json(&self) -> Result<Option<Value>, serde_json::Error> {
        self.body
            .as_ref()
            .map(|body| serde_json::from_slice(body))
            .transpose()
    }

    /// Endpoint with the encoded query string appended.
    #[must_use]
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.url)
    }
}

/// Buffered response handed back by a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// JSON response with the matching content type.
    #[must_use]
    pub fn json(status: StatusCode, body: &Value) -> Self {
        Self::new(status, body.to_string()).with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// `Content-Type` header, if readable.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Performs HTTP exchanges on behalf of the client.
///
/// Implementations own connection management and retry policy. Dropping the
/// returned future cancels the exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and buffer its response.
    ///
    /// # Errors
    /// `ClientError::Transport` when the exchange could not be completed.
    /// Non-2xx statuses are returned as responses, not errors.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ClientError>;
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_url_encodes_values() {
        let request = TransportRequest::new(Method::GET, "http://localhost/People").with_query(vec![
            ("$filter".to_owned(), "FirstName eq 'Scott'".to_owned()),
            ("$top".to_owned(), "5".to_owned()),
        ]);
        assert_eq!(
            request.full_url(),
            "http://localhost/People?$filter=FirstName%20eq%20%27Scott%27&$top=5"
        );
        assert_eq!(
            TransportRequest::new(Method::GET, "http://localhost/").full_url(),
            "http://localhost/"
        );
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let request =
            TransportRequest::new(Method::POST, "http://localhost/People").with_json(&json!({ "a": 1 }));
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(request.json().unwrap(), Some(json!({ "a": 1 })));
    }

    #[test]
    fn test_response_kind_accept() {
        assert_eq!(ResponseKind::default().accept(), "application/json");
        assert_eq!(ResponseKind::Text.accept(), "text/plain");
    }
}

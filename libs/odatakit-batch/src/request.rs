use http::{HeaderMap, HeaderName, HeaderValue, Method};
use odatakit_resource::Resource;
use serde_json::Value;

/// One sub-request of a batch.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub method: Method,
    pub resource: Resource,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl BatchRequest {
    #[must_use]
    pub fn new(method: Method, resource: Resource) -> Self {
        Self {
            method,
            resource,
            body: None,
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn get(resource: Resource) -> Self {
        Self::new(Method::GET, resource)
    }

    #[must_use]
    pub fn post(resource: Resource, body: Value) -> Self {
        Self::new(Method::POST, resource).with_body(body)
    }

    #[must_use]
    pub fn put(resource: Resource, body: Value) -> Self {
        Self::new(Method::PUT, resource).with_body(body)
    }

    #[must_use]
    pub fn patch(resource: Resource, body: Value) -> Self {
        Self::new(Method::PATCH, resource).with_body(body)
    }

    #[must_use]
    pub fn delete(resource: Resource) -> Self {
        Self::new(Method::DELETE, resource)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Reads run outside changesets; everything else is grouped into one.
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.method == Method::GET
    }

    /// Whether the part carries a JSON body.
    #[must_use]
    pub fn has_body(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::PATCH)
    }

    /// Request target relative to the service root, query string included.
    #[must_use]
    pub fn target(&self) -> String {
        let query = self.resource.query_string();
        if query.is_empty() {
            self.resource.path()
        } else {
            format!("{}?{query}", self.resource.path())
        }
    }
}

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use odatakit_resource::Resource;
use odatakit_schema::Parser;
use serde_json::Value;

use crate::collection::Collection;
use crate::error::ClientError;
use crate::meta::{Meta, VALUE};
use crate::model::Model;
use crate::transport::TransportResponse;

/// A deserialized entity and its annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub value: Value,
    pub meta: Meta,
}

/// One page of an entity set.
#[derive(Debug, Clone, PartialEq)]
pub struct Entities {
    pub values: Vec<Value>,
    pub meta: Meta,
}

/// A property value, absent when the service answered with no content.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub value: Option<Value>,
    pub meta: Meta,
}

/// How a call result should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Entity,
    Entities,
    Property,
    Model,
    Collection,
    /// Ignore the body.
    None,
}

/// Result of [`crate::ODataClient::call`], in the requested shape.
#[derive(Debug, Clone)]
pub enum CallResult {
    Entity(Option<Entity>),
    Entities(Entities),
    Property(Property),
    Model(Option<Model>),
    Collection(Collection),
    None,
}

/// A successful response tied to the resource that was requested.
///
/// Bodies are deserialized through the parser of the resource type, so
/// enum names, IEEE754 strings and subtype discriminators are already
/// resolved in the values it hands out.
#[derive(Debug, Clone)]
pub struct ODataResponse {
    resource: Resource,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ODataResponse {
    /// # Errors
    /// `ClientError::HttpStatus` for any non-2xx status.
    pub fn new(resource: Resource, response: TransportResponse) -> Result<Self, ClientError> {
        if !response.status.is_success() {
            return Err(ClientError::HttpStatus {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }
        Ok(Self {
            resource,
            status: response.status,
            headers: response.headers,
            body: response.body,
        })
    }

    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// # Errors
    /// `ClientError::UnexpectedBody` if the body is not UTF-8.
    pub fn text(&self) -> Result<String, ClientError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|err| ClientError::UnexpectedBody(err.to_string()))
    }

    /// Body as JSON; `None` for an empty body.
    ///
    /// # Errors
    /// `ClientError::Json` if a non-empty body is not JSON.
    pub fn json(&self) -> Result<Option<Value>, ClientError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&self.body)?))
    }

    /// # Errors
    /// `ClientError::Json` if a non-empty body is not JSON.
    pub fn meta(&self) -> Result<Meta, ClientError> {
        let body = self.json()?.unwrap_or(Value::Null);
        Ok(Meta::from_response(&self.headers, &body))
    }

    /// Single entity; `None` for `204 No Content`.
    ///
    /// # Errors
    /// `ClientError::UnexpectedBody` when the body is not an object, or a
    /// schema error from deserialization.
    pub fn entity(&self) -> Result<Option<Entity>, ClientError> {
        let Some(body) = self.json()? else {
            return Ok(None);
        };
        if !body.is_object() {
            return Err(ClientError::UnexpectedBody("expected an entity object".to_owned()));
        }
        Ok(Some(Entity {
            meta: Meta::from_response(&self.headers, &body),
            value: self.deserialize(&body)?,
        }))
    }

    /// Entity-set page: `{"value": [...], "@odata.count": ..., "@odata.nextLink": ...}`.
    ///
    /// # Errors
    /// `ClientError::UnexpectedBody` when there is no `value` array.
    pub fn entities(&self) -> Result<Entities, ClientError> {
        let body = self.json()?.unwrap_or(Value::Null);
        let Some(items) = body.get(VALUE).and_then(Value::as_array) else {
            return Err(ClientError::UnexpectedBody("expected a `value` array".to_owned()));
        };
        let values = items
            .iter()
            .map(|item| self.deserialize(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Entities {
            values,
            meta: Meta::from_response(&self.headers, &body),
        })
    }

    /// Property value, wrapped as `{"value": ...}` or sent bare.
    ///
    /// # Errors
    /// `ClientError::Json` or a schema error from deserialization.
    pub fn property(&self) -> Result<Property, ClientError> {
        let Some(body) = self.json()? else {
            return Ok(Property {
                value: None,
                meta: Meta::from_response(&self.headers, &Value::Null),
            });
        };
        let meta = Meta::from_response(&self.headers, &body);
        let raw = body.get(VALUE).unwrap_or(&body);
        Ok(Property {
            value: Some(self.deserialize(raw)?),
            meta,
        })
    }

    /// Raw `$value` text.
    ///
    /// # Errors
    /// `ClientError::UnexpectedBody` if the body is not UTF-8.
    pub fn value(&self) -> Result<String, ClientError> {
        self.text()
    }

    fn deserialize(&self, value: &Value) -> Result<Value, ClientError> {
        let registry = self.resource.registry();
        match self.resource.parser() {
            Some(parser) => Ok(parser.deserialize(value, &registry.parse_context())?),
            None => Ok(value.clone()),
        }
    }
}

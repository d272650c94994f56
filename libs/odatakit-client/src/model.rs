//! Entities bound to the resource they came from.

use odatakit_resource::{QueryOptions, Resource};
use odatakit_schema::{Parser, StructuredParser, ValidationErrors};
use serde_json::{Map, Value};

use crate::client::ODataClient;
use crate::collection::Collection;
use crate::error::ClientError;
use crate::meta::{Meta, strip_annotations};
use crate::response::{Entities, Entity};

/// A decoded entity or complex value plus its annotations.
///
/// A model is tied to one declared type once attached: attaching it to a
/// resource of another type fails. It performs no I/O by itself; the
/// asynchronous operations take the client to talk through.
#[derive(Debug, Clone, Default)]
pub struct Model {
    attributes: Map<String, Value>,
    meta: Meta,
    resource: Option<Resource>,
}

impl Model {
    #[must_use]
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }

    /// New, unsaved entity of the resource type with declared defaults filled in.
    #[must_use]
    pub fn create(resource: Resource) -> Self {
        let attributes = resource
            .structured()
            .map(|parser| parser.defaults())
            .unwrap_or_default();
        Self {
            attributes,
            meta: Meta::default(),
            resource: Some(resource),
        }
    }

    /// Model holding an entity decoded from a response to `resource`.
    #[must_use]
    pub fn from_entity(resource: Resource, entity: &Entity) -> Self {
        Self::bound(Some(resource), &entity.value, entity.meta.clone())
    }

    pub(crate) fn bound(resource: Option<Resource>, value: &Value, meta: Meta) -> Self {
        let mut model = Self {
            resource,
            ..Self::default()
        };
        model.populate(value, meta);
        model
    }

    /// Bind to a resource.
    ///
    /// # Errors
    /// `ClientError::ReattachType` when already bound to another type.
    pub fn attach(&mut self, resource: Resource) -> Result<(), ClientError> {
        ensure_same_type(self.resource.as_ref(), &resource)?;
        self.resource = Some(resource);
        Ok(())
    }

    #[must_use]
    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.attributes
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    #[must_use]
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.meta.etag.as_deref()
    }

    /// Key of this entity; `None` while any key component is missing.
    #[must_use]
    pub fn key(&self) -> Option<Value> {
        self.parser()?
            .resolve_key(&Value::Object(self.attributes.clone()))
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.key().is_none()
    }

    /// Resource addressing exactly this entity.
    ///
    /// A model from a collection is keyed into it, keeping only the
    /// `$select`/`$expand` options of the collection query.
    ///
    /// # Errors
    /// `ClientError::Detached` without a resource, `ClientError::MissingKey`
    /// when a collection member has no key yet.
    pub fn target(&self) -> Result<Resource, ClientError> {
        let resource = self.resource.clone().ok_or(ClientError::Detached)?;
        if !resource.is_collection() {
            return Ok(resource);
        }
        let key = self.key().ok_or(ClientError::MissingKey)?;
        let mut query = QueryOptions::new();
        query.select.clone_from(&resource.query().select);
        query.expand.clone_from(&resource.query().expand);
        Ok(resource.with_query(query).key(key)?)
    }

    /// Validate the attributes against the bound type.
    #[must_use]
    pub fn validate(&self, create: bool) -> Option<ValidationErrors> {
        self.parser()?
            .validate(&Value::Object(self.attributes.clone()), create)
    }

    /// Attributes serialized for the wire.
    ///
    /// # Errors
    /// A schema error when an attribute does not fit its declared type.
    pub fn to_entity(&self) -> Result<Value, ClientError> {
        let value = Value::Object(self.attributes.clone());
        match self.parser() {
            Some(parser) => {
                let ctx = parser.registry().parse_context();
                Ok(parser.serialize(&value, &ctx)?)
            }
            None => Ok(value),
        }
    }

    /// Reload from the service.
    ///
    /// # Errors
    /// Target resolution, transport or status errors.
    pub async fn fetch(&mut self, client: &ODataClient) -> Result<(), ClientError> {
        let target = self.target()?;
        if let Some(entity) = client.get_entity(&target).await? {
            self.populate(&entity.value, entity.meta);
        }
        Ok(())
    }

    /// Create (POST to the bound collection) when new, replace (PUT with
    /// `If-Match`) otherwise. The service answer, if any, is loaded back.
    ///
    /// # Errors
    /// Target resolution, transport or status errors.
    pub async fn save(&mut self, client: &ODataClient) -> Result<(), ClientError> {
        let resource = self.resource.clone().ok_or(ClientError::Detached)?;
        let body = Value::Object(self.attributes.clone());
        let saved = if self.is_new() {
            client.create(&resource, &body).await?
        } else {
            client.update(&self.target()?, &body, self.etag()).await?
        };
        if let Some(entity) = saved {
            self.populate(&entity.value, entity.meta);
        }
        Ok(())
    }

    /// Delete with `If-Match` when an etag is known.
    ///
    /// # Errors
    /// Target resolution, transport or status errors.
    pub async fn destroy(&self, client: &ODataClient) -> Result<(), ClientError> {
        client.destroy(&self.target()?, self.etag()).await
    }

    /// Navigation property of this entity as a resource.
    ///
    /// # Errors
    /// Target resolution errors, or `ClientError::Resource` for an unknown property.
    pub fn navigation(&self, name: &str) -> Result<Resource, ClientError> {
        Ok(self.target()?.navigation_property(name)?)
    }

    /// Single-valued navigation as a model, built from expanded data when
    /// present; otherwise empty and ready to [`Model::fetch`].
    ///
    /// # Errors
    /// As for [`Model::navigation`].
    pub fn related_model(&self, name: &str) -> Result<Model, ClientError> {
        let resource = self.navigation(name)?;
        Ok(match self.attributes.get(name) {
            Some(value @ Value::Object(_)) => Self::bound(Some(resource), value, Meta::from_body(value)),
            _ => Self::bound(Some(resource), &Value::Null, Meta::default()),
        })
    }

    /// Collection-valued navigation, built from expanded data when present;
    /// otherwise empty and ready to [`Collection::fetch`].
    ///
    /// # Errors
    /// As for [`Model::navigation`].
    pub fn related_collection(&self, name: &str) -> Result<Collection, ClientError> {
        let resource = self.navigation(name)?;
        let values = self
            .attributes
            .get(name)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let entities = Entities {
            values,
            meta: Meta::default(),
        };
        Ok(Collection::from_entities(resource, entities))
    }

    /// Point a single-valued navigation at `target` through `$ref`.
    ///
    /// # Errors
    /// Target resolution, transport or status errors.
    pub async fn set_reference(
        &self,
        client: &ODataClient,
        name: &str,
        target: &Resource,
    ) -> Result<(), ClientError> {
        client
            .set_reference(&self.navigation(name)?, target, self.etag())
            .await
    }

    fn parser(&self) -> Option<StructuredParser<'_>> {
        let parser = self.resource.as_ref()?.structured()?;
        Some(match self.meta.type_name.as_deref() {
            Some(type_name) => parser.find_parser(type_name),
            None => parser,
        })
    }

    fn populate(&mut self, value: &Value, meta: Meta) {
        self.meta = meta;
        let picked = match self.parser() {
            Some(parser) => parser.pick(value, false),
            None => strip_annotations(value),
        };
        self.attributes = match picked {
            Value::Object(map) => map,
            _ => Map::new(),
        };
    }
}

/// Models and collections stay tied to the type they were first bound to.
pub(crate) fn ensure_same_type(
    attached: Option<&Resource>,
    requested: &Resource,
) -> Result<(), ClientError> {
    let (Some(attached), Some(requested_type)) =
        (attached.and_then(Resource::type_name), requested.type_name())
    else {
        return Ok(());
    };
    if attached == requested_type {
        Ok(())
    } else {
        Err(ClientError::ReattachType {
            attached: attached.to_owned(),
            requested: requested_type.to_owned(),
        })
    }
}

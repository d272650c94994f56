use odatakit_resource::{PathSegment, QueryOption, Resource, SegmentKind};
use serde_json::Value;
use tracing::debug;

use crate::client::ODataClient;
use crate::error::ClientError;
use crate::meta::Meta;
use crate::model::{Model, ensure_same_type};
use crate::response::Entities;

/// Paging bookkeeping derived from the last populate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagingState {
    /// Total records reported by the server, else the number received.
    pub records: Option<u64>,
    /// Page size: the `$skip` of the next link, else the number received.
    pub size: Option<u64>,
    pub page: Option<u64>,
    pub pages: Option<u64>,
}

/// Ordered models bound to a collection resource.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    models: Vec<Model>,
    state: PagingState,
    meta: Meta,
    resource: Option<Resource>,
}

impl Collection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection populated from a page fetched through `resource`.
    #[must_use]
    pub fn from_entities(resource: Resource, entities: Entities) -> Self {
        let mut collection = Self {
            resource: Some(resource),
            ..Self::default()
        };
        collection.populate(&entities.values, entities.meta);
        collection
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

    /// Independent copy of the bound resource.
    ///
    /// # Errors
    /// `ClientError::Detached` when not bound.
    pub fn target(&self) -> Result<Resource, ClientError> {
        self.resource.clone().ok_or(ClientError::Detached)
    }

    #[must_use]
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.models.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    #[must_use]
    pub fn state(&self) -> PagingState {
        self.state
    }

    #[must_use]
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Replace the models and recompute paging from the annotations.
    pub fn populate(&mut self, values: &[Value], meta: Meta) {
        let received = u64::try_from(values.len()).unwrap_or(u64::MAX);
        let records = meta.count.unwrap_or(received);
        let size = meta.skip.unwrap_or(received);
        self.state.records = Some(records);
        self.state.size = Some(size);
        self.state.pages = Some(if records > 0 && size > 0 {
            records.div_ceil(size)
        } else {
            1
        });
        self.models = values
            .iter()
            .map(|value| Model::bound(self.resource.clone(), value, Meta::from_body(value)))
            .collect();
        self.meta = meta;
    }

    /// Change a query option of the bound resource.
    ///
    /// Options that change which records match (filter, search, orderby,
    /// apply and aliases) invalidate the paging state.
    ///
    /// # Errors
    /// `ClientError::Detached` when not bound.
    pub fn set_option(&mut self, option: QueryOption) -> Result<(), ClientError> {
        let resource = self.resource.as_mut().ok_or(ClientError::Detached)?;
        if option.name().resets_paging() {
            self.state = PagingState::default();
        }
        resource.set_option(option);
        Ok(())
    }

    /// Every model serialized for the wire.
    ///
    /// # Errors
    /// A schema error when an attribute does not fit its declared type.
    pub fn to_entities(&self) -> Result<Vec<Value>, ClientError> {
        self.models.iter().map(Model::to_entity).collect()
    }

    /// Load the page the bound resource addresses.
    ///
    /// # Errors
    /// Transport, status or body errors.
    pub async fn fetch(&mut self, client: &ODataClient) -> Result<(), ClientError> {
        let entities = client.get_entities(&self.target()?).await?;
        self.populate(&entities.values, entities.meta);
        Ok(())
    }

    /// Load every page, following the server's paging links.
    ///
    /// # Errors
    /// Transport, status or body errors of any page.
    pub async fn all(&mut self, client: &ODataClient) -> Result<(), ClientError> {
        if self.state.page.is_none() {
            self.state.page = Some(1);
        }
        let values = client.all(&self.target()?).await?;
        self.populate(&values, Meta::default());
        Ok(())
    }

    /// Add a member: a `$ref` link on a navigation collection, a save on an
    /// entity set.
    ///
    /// # Errors
    /// `ClientError::NotMutable` for other resources, plus transport errors.
    pub async fn add(&self, client: &ODataClient, model: &mut Model) -> Result<(), ClientError> {
        let resource = self.target()?;
        match membership(&resource)? {
            Membership::Reference => client.add_reference(&resource, &model.target()?).await,
            Membership::Entity => {
                if model.resource().is_none() {
                    model.attach(resource)?;
                }
                model.save(client).await
            }
        }
    }

    /// Remove a member: a `$ref` unlink on a navigation collection, a delete
    /// on an entity set.
    ///
    /// # Errors
    /// `ClientError::NotMutable` for other resources, plus transport errors.
    pub async fn remove(&self, client: &ODataClient, model: &Model) -> Result<(), ClientError> {
        let resource = self.target()?;
        match membership(&resource)? {
            Membership::Reference => client.remove_reference(&resource, &model.target()?).await,
            Membership::Entity => model.destroy(client).await,
        }
    }

    /// Server-side `$count` of the bound resource.
    ///
    /// # Errors
    /// Transport, status or body errors.
    pub async fn count(&self, client: &ODataClient) -> Result<u64, ClientError> {
        client.count(&self.target()?).await
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Model;
    type IntoIter = std::slice::Iter<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

enum Membership {
    Reference,
    Entity,
}

fn membership(resource: &Resource) -> Result<Membership, ClientError> {
    let kind = resource.tail().map(PathSegment::kind);
    debug!(path = %resource.path(), ?kind, "collection membership change");
    match kind {
        Some(SegmentKind::NavigationProperty) => Ok(Membership::Reference),
        Some(SegmentKind::EntitySet) => Ok(Membership::Entity),
        _ => Err(ClientError::NotMutable(resource.path())),
    }
}

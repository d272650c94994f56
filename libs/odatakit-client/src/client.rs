use std::fmt;
use std::sync::Arc;

use futures_core::Stream;
use http::header::{ACCEPT, CONTENT_TYPE, IF_MATCH};
use http::{HeaderName, HeaderValue, Method};
use odatakit_batch::{Batch, SubResult};
use odatakit_resource::{PathSegment, QueryOptions, Resource, SegmentKind};
use odatakit_schema::{Api, Parser, Settings};
use serde_json::Value;
use tracing::debug;

use crate::collection::Collection;
use crate::error::ClientError;
use crate::model::Model;
use crate::pager::{ItemsPager, PagesPager, next_page};
use crate::response::{CallResult, Entities, Entity, ODataResponse, Property, ResponseShape};
use crate::transport::{ResponseKind, Transport, TransportRequest};

const ODATA_VERSION: &str = "odata-version";
const MULTIPART_MIXED: &str = "multipart/mixed";

/// Entry point for talking to one or more configured services.
///
/// Cheap to clone: settings and transport are shared.
#[derive(Clone)]
pub struct ODataClient {
    settings: Arc<Settings>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ODataClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ODataClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ODataClient {
    #[must_use]
    pub fn new(settings: Settings, transport: Arc<dyn Transport>) -> Self {
        Self {
            settings: Arc::new(settings),
            transport,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn default_api(&self) -> &Arc<Api> {
        self.settings.default_api()
    }

    /// # Errors
    /// A schema error when no API has that name.
    pub fn api(&self, name: &str) -> Result<&Arc<Api>, ClientError> {
        Ok(self.settings.api_by_name(name)?)
    }

    /// Entity set of the API declaring it, else of the default API.
    #[must_use]
    pub fn entity_set(&self, name: &str) -> Resource {
        let api = self.api_where(|api| api.registry().entity_set(name).is_some());
        Resource::entity_set(api, name)
    }

    #[must_use]
    pub fn singleton(&self, name: &str) -> Resource {
        let api = self.api_where(|api| api.registry().singleton(name).is_some());
        Resource::singleton(api, name)
    }

    /// Unbound function.
    ///
    /// # Errors
    /// A resource error when no function of that name is declared.
    pub fn function(&self, name: &str) -> Result<Resource, ClientError> {
        let api = self.api_where(|api| api.registry().callable(name).is_ok());
        Ok(Resource::function_import(api, name)?)
    }

    /// Unbound action.
    ///
    /// # Errors
    /// A resource error when no action of that name is declared.
    pub fn action(&self, name: &str) -> Result<Resource, ClientError> {
        let api = self.api_where(|api| api.registry().callable(name).is_ok());
        Ok(Resource::action_import(api, name)?)
    }

    #[must_use]
    pub fn metadata(&self) -> Resource {
        Resource::metadata(Arc::clone(self.default_api()))
    }

    #[must_use]
    pub fn batch(&self) -> Batch {
        Batch::new()
    }

    /// # Errors
    /// Transport, status or body errors. `Ok(None)` for `204 No Content`.
    pub async fn get_entity(&self, resource: &Resource) -> Result<Option<Entity>, ClientError> {
        let request = build_request(Method::GET, resource, ResponseKind::Json)?;
        self.execute(resource, request).await?.entity()
    }

    /// One page of a collection.
    ///
    /// # Errors
    /// Transport, status or body errors.
    pub async fn get_entities(&self, resource: &Resource) -> Result<Entities, ClientError> {
        let request = build_request(Method::GET, resource, ResponseKind::Json)?;
        self.execute(resource, request).await?.entities()
    }

    /// # Errors
    /// Transport, status or body errors.
    pub async fn get_property(&self, resource: &Resource) -> Result<Property, ClientError> {
        let request = build_request(Method::GET, resource, ResponseKind::Json)?;
        self.execute(resource, request).await?.property()
    }

    /// Raw text of a `$value` resource.
    ///
    /// # Errors
    /// Transport, status or body errors.
    pub async fn get_value(&self, resource: &Resource) -> Result<String, ClientError> {
        let request = build_request(Method::GET, resource, ResponseKind::Text)?;
        self.execute(resource, request).await?.value()
    }

    /// Server-side count of a collection under its `$filter` and `$search`.
    ///
    /// # Errors
    /// Transport or status errors, `ClientError::UnexpectedBody` when the
    /// answer is not a number.
    pub async fn count(&self, resource: &Resource) -> Result<u64, ClientError> {
        let mut query = QueryOptions::new();
        query.filter.clone_from(&resource.query().filter);
        query.search.clone_from(&resource.query().search);
        let target = resource.clone().with_query(query).count()?;
        let text = self.get_value(&target).await?;
        text.trim()
            .parse()
            .map_err(|_| ClientError::UnexpectedBody(format!("not a count: `{text}`")))
    }

    /// POST a new entity to a collection.
    ///
    /// # Errors
    /// Schema errors while serializing, transport, status or body errors.
    pub async fn create(
        &self,
        resource: &Resource,
        body: &Value,
    ) -> Result<Option<Entity>, ClientError> {
        self.send_entity(Method::POST, resource, body, None).await
    }

    /// Replace an entity (PUT).
    ///
    /// # Errors
    /// As for [`ODataClient::create`]; `412` surfaces as `ClientError::HttpStatus`.
    pub async fn update(
        &self,
        resource: &Resource,
        body: &Value,
        etag: Option<&str>,
    ) -> Result<Option<Entity>, ClientError> {
        self.send_entity(Method::PUT, resource, body, etag).await
    }

    /// Merge changes into an entity (PATCH).
    ///
    /// # Errors
    /// As for [`ODataClient::update`].
    pub async fn modify(
        &self,
        resource: &Resource,
        body: &Value,
        etag: Option<&str>,
    ) -> Result<Option<Entity>, ClientError> {
        self.send_entity(Method::PATCH, resource, body, etag).await
    }

    /// # Errors
    /// Transport or status errors.
    pub async fn destroy(&self, resource: &Resource, etag: Option<&str>) -> Result<(), ClientError> {
        let request = build_request(Method::DELETE, resource, ResponseKind::Json)?;
        let request = with_if_match(request, etag)?;
        self.execute(resource, request).await?;
        Ok(())
    }

    /// Every entity of a collection, following next links page by page.
    ///
    /// # Errors
    /// The first error of any page.
    pub async fn all(&self, resource: &Resource) -> Result<Vec<Value>, ClientError> {
        let mut values = Vec::new();
        let mut pages = 0_u64;
        let mut next = Some(resource.clone());
        while let Some(current) = next {
            let page = self.get_entities(&current).await?;
            pages += 1;
            next = next_page(resource, &page.meta);
            values.extend(page.values);
        }
        debug!(path = %resource.path(), pages, items = values.len(), "fetched all pages");
        Ok(values)
    }

    /// Lazy stream of pages.
    #[must_use]
    pub fn pages(
        &self,
        resource: &Resource,
    ) -> impl Stream<Item = Result<Entities, ClientError>> + Send + use<> {
        let client = self.clone();
        PagesPager::new(resource.clone(), move |page: Resource| {
            let client = client.clone();
            async move { client.get_entities(&page).await }
        })
    }

    /// Lazy stream of single entities across pages.
    #[must_use]
    pub fn items(
        &self,
        resource: &Resource,
    ) -> impl Stream<Item = Result<Value, ClientError>> + Send + use<> {
        ItemsPager::new(self.pages(resource))
    }

    /// Invoke a function (GET) or an action (POST with its parameters as
    /// body) and read the answer in the requested shape.
    ///
    /// Models and collections of a type with a declared entity set are bound
    /// to that set, so they can be saved or refetched afterwards.
    ///
    /// # Errors
    /// Transport, status or body errors.
    pub async fn call(
        &self,
        resource: &Resource,
        shape: ResponseShape,
    ) -> Result<CallResult, ClientError> {
        let tail = resource.tail();
        let request = if tail.is_some_and(|s| s.kind() == SegmentKind::Action) {
            let params = tail
                .and_then(PathSegment::parameters)
                .cloned()
                .unwrap_or_default();
            build_request(Method::POST, resource, ResponseKind::Json)?
                .with_json(&Value::Object(params))
        } else {
            build_request(Method::GET, resource, ResponseKind::Json)?
        };
        let response = self.execute(resource, request).await?;
        Ok(match shape {
            ResponseShape::Entity => CallResult::Entity(response.entity()?),
            ResponseShape::Entities => CallResult::Entities(response.entities()?),
            ResponseShape::Property => CallResult::Property(response.property()?),
            ResponseShape::Model => CallResult::Model(
                response
                    .entity()?
                    .map(|entity| Model::from_entity(home_of(resource), &entity)),
            ),
            ResponseShape::Collection => CallResult::Collection(Collection::from_entities(
                home_of(resource),
                response.entities()?,
            )),
            ResponseShape::None => CallResult::None,
        })
    }

    /// Link `target` into the collection-valued navigation `navigation`.
    ///
    /// # Errors
    /// Resource, transport or status errors.
    pub async fn add_reference(
        &self,
        navigation: &Resource,
        target: &Resource,
    ) -> Result<(), ClientError> {
        let resource = navigation.clone().reference()?;
        let request = build_request(Method::POST, &resource, ResponseKind::Json)?
            .with_json(&target.reference_body());
        self.execute(&resource, request).await?;
        Ok(())
    }

    /// Unlink `target` from the collection-valued navigation `navigation`.
    ///
    /// # Errors
    /// Resource, transport or status errors.
    pub async fn remove_reference(
        &self,
        navigation: &Resource,
        target: &Resource,
    ) -> Result<(), ClientError> {
        let resource = navigation.clone().reference_removal(target)?;
        let request = build_request(Method::DELETE, &resource, ResponseKind::Json)?;
        self.execute(&resource, request).await?;
        Ok(())
    }

    /// Point the single-valued navigation `navigation` at `target`.
    ///
    /// # Errors
    /// Resource, transport or status errors.
    pub async fn set_reference(
        &self,
        navigation: &Resource,
        target: &Resource,
        etag: Option<&str>,
    ) -> Result<(), ClientError> {
        let resource = navigation.clone().reference()?;
        let request = build_request(Method::PUT, &resource, ResponseKind::Json)?
            .with_json(&target.reference_body());
        self.execute(&resource, with_if_match(request, etag)?).await?;
        Ok(())
    }

    /// Send every queued request in one `$batch` round trip.
    ///
    /// Results come back in queue order. An empty batch sends nothing.
    ///
    /// # Errors
    /// Transport or status errors of the envelope, and envelope-level decode
    /// errors. Failures of single sub-requests are reported in their slot.
    pub async fn execute_batch(&self, batch: &Batch) -> Result<Vec<SubResult>, ClientError> {
        let Some(first) = batch.requests().first() else {
            return Ok(Vec::new());
        };
        let resource = Resource::batch(Arc::clone(first.resource.api()));
        let encoded = batch.encode();
        let request = TransportRequest::new(Method::POST, resource.endpoint_url())
            .with_header(HeaderName::from_static(ODATA_VERSION), odata_version(&resource)?)
            .with_header(ACCEPT, HeaderValue::from_static(MULTIPART_MIXED))
            .with_kind(ResponseKind::Text)
            .with_body(
                HeaderValue::from_str(&encoded.content_type())?,
                encoded.body().to_owned(),
            );
        let response = self.execute(&resource, request).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ClientError::UnexpectedBody("batch response without content type".to_owned())
            })?;
        Ok(encoded.decode(content_type, &response.text()?)?)
    }

    fn api_where(&self, declares: impl Fn(&Api) -> bool) -> Arc<Api> {
        let api = self
            .settings
            .apis()
            .iter()
            .find(|api| declares(api))
            .unwrap_or_else(|| self.settings.default_api());
        Arc::clone(api)
    }

    async fn send_entity(
        &self,
        method: Method,
        resource: &Resource,
        body: &Value,
        etag: Option<&str>,
    ) -> Result<Option<Entity>, ClientError> {
        let payload = serialize_body(resource, body)?;
        let request = build_request(method, resource, ResponseKind::Json)?
            .with_json(&payload);
        self.execute(resource, with_if_match(request, etag)?)
            .await?
            .entity()
    }

    async fn execute(
        &self,
        resource: &Resource,
        request: TransportRequest,
    ) -> Result<ODataResponse, ClientError> {
        let method = request.method.clone();
        let url = request.full_url();
        let response = self.transport.send(request).await?;
        debug!(%method, %url, status = response.status.as_u16(), "odata request");
        ODataResponse::new(resource.clone(), response)
    }
}

fn build_request(
    method: Method,
    resource: &Resource,
    kind: ResponseKind,
) -> Result<TransportRequest, ClientError> {
    Ok(TransportRequest::new(method, resource.endpoint_url())
        .with_query(resource.params())
        .with_header(HeaderName::from_static(ODATA_VERSION), odata_version(resource)?)
        .with_header(ACCEPT, HeaderValue::from_static(kind.accept()))
        .with_kind(kind))
}

fn odata_version(resource: &Resource) -> Result<HeaderValue, ClientError> {
    Ok(HeaderValue::from_str(&resource.api().options().odata_version)?)
}

fn with_if_match(
    request: TransportRequest,
    etag: Option<&str>,
) -> Result<TransportRequest, ClientError> {
    match etag {
        Some(etag) => Ok(request.with_header(IF_MATCH, HeaderValue::from_str(etag)?)),
        None => Ok(request),
    }
}

fn serialize_body(resource: &Resource, body: &Value) -> Result<Value, ClientError> {
    match resource.parser() {
        Some(parser) => Ok(parser.serialize(body, &resource.registry().parse_context())?),
        None => Ok(body.clone()),
    }
}

/// Entity set holding the type a call returns, when one is declared.
fn home_of(resource: &Resource) -> Resource {
    let set = resource
        .type_name()
        .and_then(|t| resource.registry().entity_set_for_type(t));
    match set {
        Some(set) => Resource::entity_set(Arc::clone(resource.api()), &set.name),
        None => resource.clone(),
    }
}

use std::fmt;
use std::sync::Arc;

use odatakit_schema::{AnyParser, Api, Callable, StructuredParser, TypeRegistry};
use serde_json::{Value, json};

use crate::error::ResourceError;
use crate::literal::literal;
use crate::query::{QueryOption, QueryOptions};
use crate::segment::{PathSegment, SegmentKind as K};

/// Address of something on an `OData` service: path segments plus query options.
///
/// A resource is a plain value. Methods taking `&mut self` change it in place;
/// methods taking `self` consume it and hand back the extended resource. To
/// branch, `clone()` first: clones never share segments or options.
#[derive(Clone)]
pub struct Resource {
    api: Arc<Api>,
    segments: Vec<PathSegment>,
    query: QueryOptions,
}

impl Resource {
    /// The service root itself.
    #[must_use]
    pub fn root(api: Arc<Api>) -> Self {
        Self {
            api,
            segments: Vec::new(),
            query: QueryOptions::default(),
        }
    }

    /// Entity set bound to the entity type its container declares, if any.
    #[must_use]
    pub fn entity_set(api: Arc<Api>, name: &str) -> Self {
        let type_name = api
            .registry()
            .entity_set(name)
            .map(|s| s.entity_type.clone());
        Self::rooted(
            api,
            PathSegment::new(K::EntitySet, Some(name.to_owned()), type_name).with_collection(true),
        )
    }

    #[must_use]
    pub fn singleton(api: Arc<Api>, name: &str) -> Self {
        let type_name = api.registry().singleton(name).map(|s| s.type_name.clone());
        Self::rooted(
            api,
            PathSegment::new(K::Singleton, Some(name.to_owned()), type_name),
        )
    }

    #[must_use]
    pub fn metadata(api: Arc<Api>) -> Self {
        Self::rooted(api, PathSegment::new(K::Metadata, None, None))
    }

    #[must_use]
    pub fn batch(api: Arc<Api>) -> Self {
        Self::rooted(api, PathSegment::new(K::Batch, None, None))
    }

    /// Unbound function addressed from the service root.
    ///
    /// # Errors
    /// Fails when no function of that name is declared.
    pub fn function_import(api: Arc<Api>, name: &str) -> Result<Self, ResourceError> {
        let segment = operation_segment(api.registry().callable(name)?, K::Function)?;
        Ok(Self::rooted(api, segment))
    }

    /// Unbound action addressed from the service root.
    ///
    /// # Errors
    /// Fails when no action of that name is declared.
    pub fn action_import(api: Arc<Api>, name: &str) -> Result<Self, ResourceError> {
        let segment = operation_segment(api.registry().callable(name)?, K::Action)?;
        Ok(Self::rooted(api, segment))
    }

    fn rooted(api: Arc<Api>, segment: PathSegment) -> Self {
        let mut resource = Self::root(api);
        resource.segments.push(segment);
        resource
    }

    #[must_use]
    pub fn api(&self) -> &Arc<Api> {
        &self.api
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        self.api.registry()
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[must_use]
    pub fn tail(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Last segment of `kind`, for reading its segment-local options.
    #[must_use]
    pub fn segment(&self, kind: K) -> Option<&PathSegment> {
        self.segments.iter().rev().find(|s| s.kind() == kind)
    }

    pub fn segment_mut(&mut self, kind: K) -> Option<&mut PathSegment> {
        self.segments.iter_mut().rev().find(|s| s.kind() == kind)
    }

    /// Type addressed by the whole path.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.tail().and_then(PathSegment::type_name)
    }

    /// Parser of the addressed type, when it is a structured type.
    #[must_use]
    pub fn structured(&self) -> Option<StructuredParser<'_>> {
        self.type_name()
            .and_then(|t| self.api.registry().structured(t).ok())
    }

    /// Parser of the addressed type, whatever its kind.
    #[must_use]
    pub fn parser(&self) -> Option<AnyParser<'_>> {
        self.type_name()
            .and_then(|t| self.api.registry().find_parser(t))
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.tail().is_some_and(PathSegment::is_collection)
    }

    /// Append a segment, rejecting kinds that cannot follow the current tail.
    ///
    /// A key pushed onto an already keyed path replaces the previous key.
    ///
    /// # Errors
    /// `ResourceError::IllegalSegment` when the kind is not a legal successor.
    pub fn push_segment(&mut self, segment: PathSegment) -> Result<(), ResourceError> {
        let prev = self.segments.last().map(PathSegment::kind);
        if segment.kind() == K::Key && prev == Some(K::Key) {
            self.segments.pop();
        } else if !segment.kind().can_follow(prev) {
            return Err(ResourceError::IllegalSegment {
                kind: segment.kind(),
                after: prev,
            });
        }
        self.segments.push(segment);
        Ok(())
    }

    /// Address one entity of the collection.
    ///
    /// Objects are reduced to the key through the bound type, so a full entity
    /// can be passed as well as a bare key or a composite key object.
    ///
    /// # Errors
    /// `ResourceError::IllegalSegment` when the path cannot take a key,
    /// `ResourceError::IncompleteKey` when an object lacks a key component.
    pub fn key(mut self, key: impl Into<Value>) -> Result<Self, ResourceError> {
        let key = key.into();
        let resolved = match self.structured() {
            Some(parser) if key.is_object() => Some(
                parser
                    .resolve_key(&key)
                    .ok_or_else(|| ResourceError::IncompleteKey(parser.qualified_name()))?,
            ),
            _ => None,
        };
        let type_name = self.type_name().map(ToOwned::to_owned);
        let mut segment = PathSegment::new(K::Key, None, type_name);
        segment.set_key(Some(resolved.unwrap_or(key)));
        self.push_segment(segment)?;
        Ok(self)
    }

    /// # Errors
    /// `ResourceError::Unbound` without a structured type,
    /// `ResourceError::UnknownProperty` when the type has no such field.
    pub fn navigation_property(mut self, name: &str) -> Result<Self, ResourceError> {
        let segment = self.member_segment(name, K::NavigationProperty)?;
        self.push_segment(segment)?;
        Ok(self)
    }

    /// # Errors
    /// As for [`Resource::navigation_property`].
    pub fn property(mut self, name: &str) -> Result<Self, ResourceError> {
        let segment = self.member_segment(name, K::Property)?;
        self.push_segment(segment)?;
        Ok(self)
    }

    /// Bound function call on the current path.
    ///
    /// # Errors
    /// Fails when no function of that name is declared or it cannot follow the tail.
    pub fn function(self, name: &str) -> Result<Self, ResourceError> {
        self.operation(name, K::Function)
    }

    /// Bound action call on the current path.
    ///
    /// # Errors
    /// Fails when no action of that name is declared or it cannot follow the tail.
    pub fn action(self, name: &str) -> Result<Self, ResourceError> {
        self.operation(name, K::Action)
    }

    /// `$count` of the current collection.
    ///
    /// # Errors
    /// `ResourceError::IllegalSegment` after a terminal segment.
    pub fn count(mut self) -> Result<Self, ResourceError> {
        self.push_segment(PathSegment::new(K::Count, None, Some("Edm.Int32".to_owned())))?;
        Ok(self)
    }

    /// Raw `$value` of the current property or media entity.
    ///
    /// # Errors
    /// `ResourceError::IllegalSegment` after a terminal segment.
    pub fn value(mut self) -> Result<Self, ResourceError> {
        let type_name = self.type_name().map(ToOwned::to_owned);
        self.push_segment(PathSegment::new(K::Value, None, type_name))?;
        Ok(self)
    }

    /// `$ref` of the current entity or navigation.
    ///
    /// # Errors
    /// `ResourceError::Unbound` when the path has no type.
    pub fn reference(mut self) -> Result<Self, ResourceError> {
        let type_name = self.type_name().ok_or(ResourceError::Unbound)?.to_owned();
        let collection = self.is_collection();
        self.push_segment(
            PathSegment::new(K::Ref, None, Some(type_name)).with_collection(collection),
        )?;
        Ok(self)
    }

    /// Body that links this entity through a `$ref` request.
    #[must_use]
    pub fn reference_body(&self) -> Value {
        json!({ "@odata.id": self.endpoint_url() })
    }

    /// `$ref` request removing `target` from a collection-valued navigation.
    ///
    /// # Errors
    /// As for [`Resource::reference`].
    pub fn reference_removal(self, target: &Resource) -> Result<Self, ResourceError> {
        let mut resource = self.reference()?;
        resource
            .query
            .set(QueryOption::Custom("$id".to_owned(), Some(target.endpoint_url())));
        Ok(resource)
    }

    /// Narrow the tail segment to a derived type: `People/Demo.Employee`.
    ///
    /// # Errors
    /// `ResourceError::MissingSegment` on an empty path, or a schema error
    /// when the type is unknown.
    pub fn cast(mut self, type_name: &str) -> Result<Self, ResourceError> {
        let qualified = self.api.registry().structured(type_name)?.qualified_name();
        let tail = self
            .segments
            .last_mut()
            .ok_or(ResourceError::MissingSegment)?;
        tail.set_cast(Some(qualified));
        Ok(self)
    }

    /// Attach call parameters to the tail function or action, serialized
    /// through the declared parameter types.
    ///
    /// # Errors
    /// `ResourceError::NoParameters` when the tail is not an operation, or a
    /// schema error when a parameter cannot be serialized.
    pub fn with_parameters(mut self, params: &Value) -> Result<Self, ResourceError> {
        let tail = self.tail().ok_or(ResourceError::MissingSegment)?;
        if !matches!(tail.kind(), K::Function | K::Action) {
            return Err(ResourceError::NoParameters(tail.kind()));
        }
        let registry = self.api.registry();
        let name = tail.name().unwrap_or_default();
        let binding = self.binding_type(self.segments.len() - 1);
        let serialized = registry
            .callable_for(name, binding)?
            .serialize_parameters(registry, params, &registry.parse_context())?;
        if let Some(tail) = self.segments.last_mut() {
            tail.set_parameters(Some(serialized));
        }
        Ok(self)
    }

    /// Declared operation behind the tail segment.
    #[must_use]
    pub fn callable(&self) -> Option<&Callable> {
        let tail = self.tail()?;
        if !matches!(tail.kind(), K::Function | K::Action) {
            return None;
        }
        let binding = self.binding_type(self.segments.len() - 1);
        self.api.registry().callable_for(tail.name()?, binding).ok()
    }

    /// Type an operation at `index` is bound to: the preceding segment's cast
    /// or type.
    fn binding_type(&self, index: usize) -> Option<&str> {
        let previous = self.segments.get(index.checked_sub(1)?)?;
        previous.cast().or_else(|| previous.type_name())
    }

    #[must_use]
    pub fn query(&self) -> &QueryOptions {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut QueryOptions {
        &mut self.query
    }

    /// Set or, with `None`, remove a query option in place.
    pub fn set_option(&mut self, option: QueryOption) {
        self.query.set(option);
    }

    #[must_use]
    pub fn with_option(mut self, option: QueryOption) -> Self {
        self.set_option(option);
        self
    }

    /// Replace every query option.
    #[must_use]
    pub fn with_query(mut self, query: QueryOptions) -> Self {
        self.query = query;
        self
    }

    /// Path relative to the service root, e.g. `People('russell')/Friends`.
    #[must_use]
    pub fn path(&self) -> String {
        let registry = self.api.registry();
        let mut out = String::new();
        for (index, segment) in self.segments.iter().enumerate() {
            let kind = segment.kind();
            if kind == K::Key {
                out.push('(');
                out.push_str(&render_key(registry, segment));
                out.push(')');
            } else {
                if !out.is_empty() {
                    out.push('/');
                }
                match kind.system_name() {
                    Some(name) => out.push_str(name),
                    None => out.push_str(segment.name().unwrap_or_default()),
                }
                if kind == K::Function {
                    out.push('(');
                    let binding = self.binding_type(index);
                    out.push_str(&render_parameters(registry, segment, binding));
                    out.push(')');
                }
            }
            if let Some(cast) = segment.cast() {
                out.push('/');
                out.push_str(cast);
            }
        }
        out
    }

    /// Service root joined with [`Resource::path`].
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.api.service_root_url(), self.path())
    }

    /// Effective query parameters in wire order.
    ///
    /// `$count=true` is added for collections when the API asks for counts
    /// and the caller did not set `$count` explicitly.
    #[must_use]
    pub fn params(&self) -> Vec<(String, String)> {
        self.effective_query().params()
    }

    #[must_use]
    pub fn query_string(&self) -> String {
        self.effective_query().query_string()
    }

    /// Endpoint URL with the encoded query string appended.
    #[must_use]
    pub fn url(&self) -> String {
        let query = self.query_string();
        if query.is_empty() {
            self.endpoint_url()
        } else {
            format!("{}?{query}", self.endpoint_url())
        }
    }

    fn effective_query(&self) -> QueryOptions {
        let mut query = self.query.clone();
        if query.count.is_none() && self.api.options().with_count && self.is_collection() {
            query.count = Some(true);
        }
        query
    }

    fn member_segment(&self, name: &str, kind: K) -> Result<PathSegment, ResourceError> {
        let parser = self.structured().ok_or(ResourceError::Unbound)?;
        let field = parser
            .find_field(name)
            .ok_or_else(|| ResourceError::UnknownProperty {
                type_name: parser.qualified_name(),
                property: name.to_owned(),
            })?;
        Ok(
            PathSegment::new(kind, Some(name.to_owned()), Some(field.type_name.clone()))
                .with_collection(field.collection),
        )
    }

    fn operation(mut self, name: &str, kind: K) -> Result<Self, ResourceError> {
        let binding = self.binding_type(self.segments.len());
        let segment = operation_segment(self.api.registry().callable_for(name, binding)?, kind)?;
        self.push_segment(segment)?;
        Ok(self)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("api", &self.api.name())
            .field("segments", &self.segments)
            .field("query", &self.query)
            .finish()
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.api, &other.api)
            && self.segments == other.segments
            && self.query == other.query
    }
}

fn operation_segment(callable: &Callable, kind: K) -> Result<PathSegment, ResourceError> {
    if callable.is_action() != (kind == K::Action) {
        return Err(ResourceError::OperationKind {
            name: callable.qualified_name(),
            kind,
        });
    }
    // Bound operations are addressed by qualified name, imports by their own name.
    let name = if callable.bound {
        callable.qualified_name()
    } else {
        callable.name.clone()
    };
    let (type_name, collection) = callable
        .return_type
        .as_ref()
        .map_or((None, false), |r| (Some(r.type_name.clone()), r.collection));
    Ok(PathSegment::new(kind, Some(name), type_name).with_collection(collection))
}

fn render_key(registry: &TypeRegistry, segment: &PathSegment) -> String {
    let Some(key) = segment.key() else {
        return String::new();
    };
    let keys = segment
        .type_name()
        .and_then(|t| registry.structured(t).ok())
        .map(|p| p.keys())
        .unwrap_or_default();
    match key {
        Value::Object(map) if keys.is_empty() => map
            .iter()
            .map(|(name, value)| format!("{name}={}", literal(value, None)))
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(map) => keys
            .iter()
            .filter_map(|field| {
                let value = map.get(&field.name)?;
                let parser = registry.field_parser(field).ok();
                Some(format!("{}={}", field.name, literal(value, parser)))
            })
            .collect::<Vec<_>>()
            .join(","),
        scalar => {
            let parser = match keys.as_slice() {
                [only] => registry.field_parser(only).ok(),
                _ => None,
            };
            literal(scalar, parser)
        }
    }
}

fn render_parameters(
    registry: &TypeRegistry,
    segment: &PathSegment,
    binding: Option<&str>,
) -> String {
    let Some(params) = segment.parameters() else {
        return String::new();
    };
    let callable = segment
        .name()
        .and_then(|n| registry.callable_for(n, binding).ok());
    params
        .iter()
        .map(|(name, value)| {
            let parser = callable
                .and_then(|c| c.parameters.iter().find(|p| &p.name == name))
                .and_then(|field| registry.field_parser(field).ok());
            format!("{name}={}", literal(value, parser))
        })
        .collect::<Vec<_>>()
        .join(",")
}

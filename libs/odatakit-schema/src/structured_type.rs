//! Entity and complex types.
//!
//! Types live in the [`TypeRegistry`] arena and refer to each other by id. All
//! behavior that needs to walk the inheritance forest goes through the
//! [`StructuredParser`] handle, which pairs a type id with its registry.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::config::{AnnotationConfig, StructuredTypeConfig};
use crate::enum_type::is_qualified;
use crate::error::SchemaError;
use crate::field::{Field, FieldParser};
use crate::options::ParseContext;
use crate::parser::Parser;
use crate::registry::{StructuredId, TypeRegistry};

/// Embedded type discriminator carried by polymorphic payloads.
pub const TYPE_ANNOTATION: &str = "@odata.type";
pub const ETAG_ANNOTATION: &str = "@odata.etag";

/// Field path to violated rule tags (`required`, `maxlength`, `mismatch`).
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone)]
pub struct StructuredType {
    pub name: String,
    pub namespace: String,
    pub alias: Option<String>,
    pub base: Option<String>,
    pub open: bool,
    pub fields: Vec<Field>,
    pub annotations: Vec<AnnotationConfig>,
    pub(crate) parent: Option<StructuredId>,
    pub(crate) children: Vec<StructuredId>,
}

impl StructuredType {
    /// # Errors
    /// Returns `SchemaError::DuplicateField` if two fields share a name.
    pub fn from_config(
        config: &StructuredTypeConfig,
        namespace: &str,
        alias: Option<&str>,
    ) -> Result<Self, SchemaError> {
        let mut fields: Vec<Field> = Vec::with_capacity(config.fields.len());
        for field in &config.fields {
            if fields.iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    type_name: format!("{namespace}.{}", config.name),
                    field: field.name.clone(),
                });
            }
            fields.push(Field::from_config(field));
        }
        Ok(Self {
            name: config.name.clone(),
            namespace: namespace.to_owned(),
            alias: alias.map(ToOwned::to_owned),
            base: config.base.clone(),
            open: config.open,
            fields,
            annotations: config.annotations.clone(),
            parent: None,
            children: Vec::new(),
        })
    }

    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    #[must_use]
    pub fn is_type_of(&self, name: &str) -> bool {
        is_qualified(name, &self.namespace, self.alias.as_deref(), &self.name)
    }
}

/// Handle to a structured type inside a configured registry.
#[derive(Clone, Copy)]
pub struct StructuredParser<'a> {
    registry: &'a TypeRegistry,
    id: StructuredId,
}

impl fmt::Debug for StructuredParser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredParser")
            .field("type", &self.ty().qualified_name())
            .finish()
    }
}

impl<'a> StructuredParser<'a> {
    pub(crate) fn new(registry: &'a TypeRegistry, id: StructuredId) -> Self {
        Self { registry, id }
    }

    #[must_use]
    pub fn id(&self) -> StructuredId {
        self.id
    }

    #[must_use]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    #[must_use]
    pub fn ty(&self) -> &'a StructuredType {
        self.registry.structured_type(self.id)
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.ty().name
    }

    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.ty().qualified_name()
    }

    #[must_use]
    pub fn is_type_of(&self, name: &str) -> bool {
        self.ty().is_type_of(name)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ty().open
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.ty().parent.map(|id| Self::new(self.registry, id))
    }

    pub fn children(&self) -> impl Iterator<Item = StructuredParser<'a>> + 'a {
        let registry = self.registry;
        self.ty()
            .children
            .iter()
            .map(move |id| StructuredParser::new(registry, *id))
    }

    /// Depth-first search of this type and its subtypes.
    #[must_use]
    pub fn find<P>(&self, predicate: P) -> Option<Self>
    where
        P: Fn(&StructuredParser<'a>) -> bool + Copy,
    {
        if predicate(self) {
            return Some(*self);
        }
        self.children().find_map(|child| child.find(predicate))
    }

    /// The parser for `type_name` within this subtree, or `self` when none matches.
    #[must_use]
    pub fn find_parser(&self, type_name: &str) -> Self {
        self.find(|p| p.is_type_of(type_name)).unwrap_or(*self)
    }

    /// Key fields, parent keys first. Empty before configure.
    #[must_use]
    pub fn keys(&self) -> Vec<&'a Field> {
        if !self.registry.is_configured() {
            return Vec::new();
        }
        let mut keys = self.parent().map(|p| p.keys()).unwrap_or_default();
        keys.extend(self.ty().fields.iter().filter(|f| f.key));
        keys
    }

    #[must_use]
    pub fn is_complex_type(&self) -> bool {
        self.keys().is_empty()
    }

    /// Fields in declaration order, inherited ones first when requested.
    #[must_use]
    pub fn fields(&self, include_parents: bool, include_navigation: bool) -> Vec<&'a Field> {
        let mut fields = match self.parent() {
            Some(parent) if include_parents => parent.fields(true, include_navigation),
            _ => Vec::new(),
        };
        fields.extend(
            self.ty()
                .fields
                .iter()
                .filter(|f| include_navigation || !f.navigation),
        );
        fields
    }

    /// Looks up a field by name on this type or any ancestor.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&'a Field> {
        self.ty()
            .fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.parent().and_then(|p| p.find_field(name)))
    }

    #[must_use]
    pub fn field_type(&self, name: &str) -> Option<&'a str> {
        self.find_field(name).map(|f| f.type_name.as_str())
    }

    /// Extract the key from an arbitrary object.
    ///
    /// A single key collapses to its scalar value; composite keys produce a
    /// name to value object. Returns `None` if any key component is missing.
    #[must_use]
    pub fn resolve_key(&self, value: &Value) -> Option<Value> {
        let keys = self.keys();
        if keys.is_empty() {
            return None;
        }
        let mut resolved = Map::new();
        for key in &keys {
            resolved.insert(key.name.clone(), key.resolve(value)?.clone());
        }
        if resolved.len() == 1 {
            return resolved.into_iter().next().map(|(_, v)| v);
        }
        Some(Value::Object(resolved))
    }

    /// Keep only fields known to this type (and the etag annotation if asked).
    #[must_use]
    pub fn pick(&self, value: &Value, include_etag: bool) -> Value {
        let Some(obj) = value.as_object() else {
            return value.clone();
        };
        let known = self.fields(true, true);
        let picked: Map<String, Value> = obj
            .iter()
            .filter(|(k, _)| {
                known.iter().any(|f| &f.name == *k) || (include_etag && *k == ETAG_ANNOTATION)
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(picked)
    }

    /// Declared defaults, including nested complex defaults.
    ///
    /// Collection-valued complex fields get no default, and a complex type
    /// reached again through its own fields is not expanded a second time.
    #[must_use]
    pub fn defaults(&self) -> Map<String, Value> {
        self.defaults_within(&mut Vec::new())
    }

    fn defaults_within(&self, expanding: &mut Vec<StructuredId>) -> Map<String, Value> {
        expanding.push(self.id);
        let mut out = self
            .parent()
            .map(|p| p.defaults_within(expanding))
            .unwrap_or_default();
        for field in &self.ty().fields {
            if let Some(default) = &field.default {
                out.insert(field.name.clone(), default.clone());
                continue;
            }
            if field.collection {
                continue;
            }
            if let Some(nested) = self
                .complex_of(field)
                .filter(|nested| !expanding.contains(&nested.id))
            {
                let nested = nested.defaults_within(expanding);
                if !nested.is_empty() {
                    out.insert(field.name.clone(), Value::Object(nested));
                }
            }
        }
        expanding.pop();
        out
    }

    /// Validate attributes; `create` exempts key fields from `required`.
    ///
    /// Returns `None` when nothing is violated at any level.
    #[must_use]
    pub fn validate(&self, attrs: &Value, create: bool) -> Option<ValidationErrors> {
        let mut errors = self
            .parent()
            .and_then(|p| p.validate(attrs, create))
            .unwrap_or_default();
        for field in &self.ty().fields {
            let value = attrs.get(&field.name).unwrap_or(&Value::Null);
            self.validate_field(field, value, create, &mut errors);
        }
        if errors.is_empty() { None } else { Some(errors) }
    }

    fn validate_field(&self, field: &Field, value: &Value, create: bool, errors: &mut ValidationErrors) {
        if let Some(nested) = self.complex_of(field) {
            match value {
                Value::Object(_) => {
                    if let Some(nested_errors) = nested.validate(value, create) {
                        for (path, tags) in nested_errors {
                            errors.insert(format!("{}.{path}", field.name), tags);
                        }
                    }
                    return;
                }
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        if let Some(nested_errors) = nested.validate(item, create) {
                            for (path, tags) in nested_errors {
                                errors.insert(format!("{}[{i}].{path}", field.name), tags);
                            }
                        }
                    }
                    return;
                }
                _ => {}
            }
        }
        if let (Some(FieldParser::Enum(id)), false) = (field.parser, value.is_null()) {
            if let Some(tags) = self.registry.enum_by_id(id).validate(value) {
                errors.insert(field.name.clone(), tags);
            }
            return;
        }
        let mut tags = Vec::new();
        if !field.nullable && value.is_null() && !(field.key && create) {
            tags.push("required".to_owned());
        }
        if let (Some(max), Some(s)) = (field.max_length, value.as_str())
            && s.chars().count() > max
        {
            tags.push("maxlength".to_owned());
        }
        if !tags.is_empty() {
            errors.insert(field.name.clone(), tags);
        }
    }

    fn complex_of(&self, field: &Field) -> Option<StructuredParser<'a>> {
        match field.parser {
            Some(FieldParser::Structured(id)) => {
                let nested = StructuredParser::new(self.registry, id);
                nested.is_complex_type().then_some(nested)
            }
            _ => None,
        }
    }

    /// Pick the subtype named by the payload's type discriminator.
    fn dispatch(&self, obj: &Map<String, Value>) -> Self {
        let Some(annotated) = obj.get(TYPE_ANNOTATION).and_then(Value::as_str) else {
            return *self;
        };
        let annotated = annotated.trim_start_matches('#');
        if self.is_type_of(annotated) {
            return *self;
        }
        match self.find(|p| p.is_type_of(annotated)) {
            Some(found) => found,
            None => {
                warn!(
                    declared = %self.qualified_name(),
                    annotated,
                    "type discriminator matches no subtype, using declared type"
                );
                *self
            }
        }
    }

    fn ensure_configured(&self) -> Result<(), SchemaError> {
        if self.registry.is_configured() {
            Ok(())
        } else {
            Err(SchemaError::NotConfigured(self.qualified_name()))
        }
    }

    fn deserialize_object(
        &self,
        obj: &Map<String, Value>,
        ctx: &ParseContext<'_>,
    ) -> Result<Map<String, Value>, SchemaError> {
        let mut out = match self.parent() {
            Some(parent) => parent.deserialize_object(obj, ctx)?,
            None => obj.clone(),
        };
        for field in &self.ty().fields {
            if let Some(value) = obj.get(&field.name).filter(|v| !v.is_null()) {
                let parser = self.registry.field_parser(field)?;
                out.insert(
                    field.name.clone(),
                    parser.deserialize(value, &ctx.with_field(field))?,
                );
            }
        }
        Ok(out)
    }

    fn serialize_object(
        &self,
        obj: &Map<String, Value>,
        ctx: &ParseContext<'_>,
    ) -> Result<Map<String, Value>, SchemaError> {
        let mut out = match self.parent() {
            Some(parent) => parent.serialize_object(obj, ctx)?,
            None => obj.clone(),
        };
        for field in &self.ty().fields {
            if let Some(value) = obj.get(&field.name).filter(|v| !v.is_null()) {
                let parser = self.registry.field_parser(field)?;
                out.insert(
                    field.name.clone(),
                    parser.serialize(value, &ctx.with_field(field))?,
                );
            }
        }
        Ok(out)
    }
}

impl Parser for StructuredParser<'_> {
    fn deserialize(&self, value: &Value, ctx: &ParseContext<'_>) -> Result<Value, SchemaError> {
        self.ensure_configured()?;
        match value {
            Value::Object(obj) => self
                .dispatch(obj)
                .deserialize_object(obj, ctx)
                .map(Value::Object),
            Value::Array(items) => items
                .iter()
                .map(|v| self.deserialize(v, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Ok(value.clone()),
        }
    }

    fn serialize(&self, value: &Value, ctx: &ParseContext<'_>) -> Result<Value, SchemaError> {
        self.ensure_configured()?;
        match value {
            Value::Object(obj) => self
                .dispatch(obj)
                .serialize_object(obj, ctx)
                .map(Value::Object),
            Value::Array(items) => items
                .iter()
                .map(|v| self.serialize(v, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Ok(value.clone()),
        }
    }
}

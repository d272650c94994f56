use serde_json::Value;

use crate::config::{AnnotationConfig, FieldConfig};
use crate::edm::EdmType;
use crate::registry::{EnumId, StructuredId, TypeRegistry};

/// Parser a field resolved to during `configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldParser {
    Edm(EdmType),
    Enum(EnumId),
    Structured(StructuredId),
}

/// A property of a structured type, or a parameter of a callable.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct Field {
    pub name: String,
    pub type_name: String,
    pub key: bool,
    pub collection: bool,
    pub nullable: bool,
    pub navigation: bool,
    pub default: Option<Value>,
    pub max_length: Option<usize>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub reference: Option<String>,
    pub annotations: Vec<AnnotationConfig>,
    pub(crate) parser: Option<FieldParser>,
}

impl Field {
    #[must_use]
    pub fn from_config(config: &FieldConfig) -> Self {
        let (type_name, collection) = split_collection(&config.type_name);
        Self {
            name: config.name.clone(),
            type_name: type_name.to_owned(),
            key: config.key,
            collection: config.collection || collection,
            nullable: config.nullable && !config.key,
            navigation: config.navigation,
            default: config.default.clone(),
            max_length: config.max_length,
            precision: config.precision,
            scale: config.scale,
            reference: config.reference.clone(),
            annotations: config.annotations.clone(),
            parser: None,
        }
    }

    /// `None` until the owning registry has been configured.
    #[must_use]
    pub fn parser(&self) -> Option<FieldParser> {
        self.parser
    }

    #[must_use]
    pub fn is_edm_type(&self) -> bool {
        self.type_name.starts_with("Edm.")
    }

    #[must_use]
    pub fn is_enum_type(&self) -> bool {
        matches!(self.parser, Some(FieldParser::Enum(_)))
    }

    #[must_use]
    pub fn is_structured_type(&self) -> bool {
        matches!(self.parser, Some(FieldParser::Structured(_)))
    }

    /// Structured and keyless.
    #[must_use]
    pub fn is_complex_type(&self, registry: &TypeRegistry) -> bool {
        match self.parser {
            Some(FieldParser::Structured(id)) => registry.structured_by_id(id).is_complex_type(),
            _ => false,
        }
    }

    #[must_use]
    pub fn find_annotation(&self, term: &str) -> Option<&AnnotationConfig> {
        self.annotations.iter().find(|a| a.term == term)
    }

    /// Extract this field's value from an arbitrary object.
    ///
    /// Follows `ref` when set (segments separated by `/` or `.`), otherwise the
    /// field name.
    #[must_use]
    pub fn resolve<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        let path = self.reference.as_deref().unwrap_or(&self.name);
        path.split(['/', '.'])
            .filter(|s| !s.is_empty())
            .try_fold(value, |acc, segment| acc.get(segment))
            .filter(|v| !v.is_null())
    }
}

/// `Collection(Demo.Item)` -> (`Demo.Item`, true).
#[must_use]
pub fn split_collection(type_name: &str) -> (&str, bool) {
    type_name
        .strip_prefix("Collection(")
        .and_then(|rest| rest.strip_suffix(')'))
        .map_or((type_name, false), |inner| (inner, true))
}

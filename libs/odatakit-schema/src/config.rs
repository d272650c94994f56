//! CSDL configuration tree.
//!
//! Metadata arrives as an already-parsed tree of plain serde structs. The tree is
//! usually loaded from YAML with environment overrides layered on top:
//!
//! ```yaml
//! apis:
//!   - name: trippin
//!     service_root_url: "https://services.odata.org/TripPinRESTierService/"
//!     options:
//!       with_count: true
//!     schemas:
//!       - namespace: Trippin
//!         entities:
//!           - name: Person
//!             fields:
//!               - { name: UserName, type: Edm.String, key: true, nullable: false }
//! ```
//!
//! Environment variables prefixed with `ODATAKIT__` override file values, using
//! `__` as the nesting separator (`ODATAKIT__APIS__0__SERVICE_ROOT_URL=...`).

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::SchemaError;

/// Environment prefix used by [`SettingsConfig::load`] and [`ApiConfig::load`].
pub const ENV_PREFIX: &str = "ODATAKIT__";

/// Root of a configuration file holding one or more APIs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default)]
    pub apis: Vec<ApiConfig>,
}

impl SettingsConfig {
    /// Extract the settings tree from an arbitrary figment.
    ///
    /// # Errors
    /// Returns `SchemaError::Config` if the figment cannot be extracted.
    pub fn from_figment(figment: &Figment) -> Result<Self, SchemaError> {
        figment.extract().map_err(SchemaError::from)
    }

    /// Load a YAML file and layer `ODATAKIT__` environment overrides on top.
    ///
    /// # Errors
    /// Returns `SchemaError::Config` if the file is missing or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file_exact(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }
}

/// One OData service: its root URL, shared options and schemas.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub service_root_url: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub options: ApiOptions,
    #[serde(default)]
    pub schemas: Vec<SchemaConfig>,
}

impl ApiConfig {
    /// Create a bare API configuration for the given service root.
    #[must_use]
    pub fn new(service_root_url: impl Into<String>) -> Self {
        Self {
            service_root_url: service_root_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: SchemaConfig) -> Self {
        self.schemas.push(schema);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ApiOptions) -> Self {
        self.options = options;
        self
    }

    /// Extract a single API configuration from an arbitrary figment.
    ///
    /// # Errors
    /// Returns `SchemaError::Config` if the figment cannot be extracted.
    pub fn from_figment(figment: &Figment) -> Result<Self, SchemaError> {
        figment.extract().map_err(SchemaError::from)
    }

    /// Load a single API from a YAML file with `ODATAKIT__` overrides.
    ///
    /// # Errors
    /// Returns `SchemaError::Config` if the file is missing or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let figment = Figment::new()
            .merge(Yaml::file_exact(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }
}

/// Options shared by every parser and request of an API.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiOptions {
    /// Keep enum member names after deserialization instead of integer values.
    pub string_as_enum: bool,
    /// `Edm.Int64` and `Edm.Decimal` travel as JSON strings.
    pub ieee754_compatible: bool,
    /// Ask for `$count=true` on every collection request.
    pub with_count: bool,
    /// Page size requested through `$top` when auto-paginating, if any.
    pub max_page_size: Option<u64>,
    pub odata_version: String,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            string_as_enum: false,
            ieee754_compatible: false,
            with_count: false,
            max_page_size: None,
            odata_version: "4.0".to_owned(),
        }
    }
}

/// A CSDL schema: a namespace holding types and callables.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub namespace: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub enums: Vec<EnumTypeConfig>,
    #[serde(default)]
    pub entities: Vec<StructuredTypeConfig>,
    #[serde(default)]
    pub callables: Vec<CallableConfig>,
    #[serde(default)]
    pub containers: Vec<EntityContainerConfig>,
}

impl SchemaConfig {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn with_enum(mut self, config: EnumTypeConfig) -> Self {
        self.enums.push(config);
        self
    }

    #[must_use]
    pub fn with_entity(mut self, config: StructuredTypeConfig) -> Self {
        self.entities.push(config);
        self
    }

    #[must_use]
    pub fn with_callable(mut self, config: CallableConfig) -> Self {
        self.callables.push(config);
        self
    }

    #[must_use]
    pub fn with_container(mut self, config: EntityContainerConfig) -> Self {
        self.containers.push(config);
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnnotationConfig {
    pub term: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EnumTypeConfig {
    pub name: String,
    #[serde(default)]
    pub flags: bool,
    #[serde(default)]
    pub members: Vec<EnumMemberConfig>,
    #[serde(default)]
    pub annotations: Vec<AnnotationConfig>,
}

impl EnumTypeConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn flags(mut self) -> Self {
        self.flags = true;
        self
    }

    #[must_use]
    pub fn member(mut self, name: impl Into<String>, value: i64) -> Self {
        self.members.push(EnumMemberConfig {
            name: name.into(),
            value,
        });
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnumMemberConfig {
    pub name: String,
    pub value: i64,
}

/// An entity type or complex type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StructuredTypeConfig {
    pub name: String,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub annotations: Vec<AnnotationConfig>,
}

impl StructuredTypeConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub collection: bool,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub navigation: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub annotations: Vec<AnnotationConfig>,
}

impl FieldConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            key: false,
            collection: false,
            nullable: true,
            navigation: false,
            default: None,
            max_length: None,
            precision: None,
            scale: None,
            reference: None,
            annotations: Vec::new(),
        }
    }

    /// Mark as key; key fields are never nullable.
    #[must_use]
    pub fn key(mut self) -> Self {
        self.key = true;
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    #[must_use]
    pub fn navigation(mut self) -> Self {
        self.navigation = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    #[must_use]
    pub fn with_ref(mut self, path: impl Into<String>) -> Self {
        self.reference = Some(path.into());
        self
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    #[default]
    Function,
    Action,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReturnTypeConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub collection: bool,
}

/// A function or action, bound or unbound.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CallableConfig {
    pub name: String,
    #[serde(default)]
    pub kind: CallableKind,
    #[serde(default)]
    pub bound: bool,
    #[serde(default)]
    pub composable: bool,
    #[serde(default)]
    pub parameters: Vec<FieldConfig>,
    #[serde(default)]
    pub return_type: Option<ReturnTypeConfig>,
}

impl CallableConfig {
    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CallableKind::Function,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn action(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CallableKind::Action,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn bound(mut self) -> Self {
        self.bound = true;
        self
    }

    #[must_use]
    pub fn parameter(mut self, field: FieldConfig) -> Self {
        self.parameters.push(field);
        self
    }

    #[must_use]
    pub fn returns(mut self, type_name: impl Into<String>, collection: bool) -> Self {
        self.return_type = Some(ReturnTypeConfig {
            type_name: type_name.into(),
            collection,
        });
        self
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityContainerConfig {
    pub name: String,
    #[serde(default)]
    pub entity_sets: Vec<EntitySetConfig>,
    #[serde(default)]
    pub singletons: Vec<SingletonConfig>,
}

impl EntityContainerConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn entity_set(mut self, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.entity_sets.push(EntitySetConfig {
            name: name.into(),
            entity_type: entity_type.into(),
        });
        self
    }

    #[must_use]
    pub fn singleton(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.singletons.push(SingletonConfig {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntitySetConfig {
    pub name: String,
    pub entity_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SingletonConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! # `odatakit-schema` - CSDL type model for `OData` v4
//!
//! Turns a declarative metadata tree into a configured type registry:
//!
//! - **Configuration** (`config` module) - serde structs loaded through figment
//! - **Enum types** (`enum_type` module) - name/value mapping, flags
//! - **Structured types** (`structured_type` module) - inheritance-aware
//!   (de)serialization, polymorphic dispatch, validation, defaults and keys
//! - **JSON Schema** (`json_schema` module) - draft-07 documents per type
//! - **Settings** (`api` module) - lookups across several APIs
//!
//! ## Example
//!
//! ```rust,ignore
//! use odatakit_schema::{ApiConfig, Parser, Settings};
//!
//! let settings = Settings::new(&[ApiConfig::load("trippin.yaml")?])?;
//! let person = settings.structured_type_for_type("Trippin.Person")?;
//! let ctx = person.registry().parse_context();
//! let native = person.deserialize(&payload, &ctx)?;
//! ```

pub mod api;
pub mod callable;
pub mod config;
pub mod container;
pub mod edm;
pub mod enum_type;
pub mod error;
pub mod field;
pub mod json_schema;
pub mod options;
pub mod parser;
pub mod registry;
pub mod structured_type;

pub use api::{Api, Settings};
pub use callable::{Callable, ReturnType};
pub use config::{
    ApiConfig, ApiOptions, CallableConfig, CallableKind, EntityContainerConfig, EnumTypeConfig,
    FieldConfig, SchemaConfig, SettingsConfig, StructuredTypeConfig,
};
pub use container::{EntityContainer, EntitySet, Singleton};
pub use edm::EdmType;
pub use enum_type::EnumType;
pub use error::SchemaError;
pub use field::{Field, FieldParser};
pub use json_schema::JsonSchemaOptions;
pub use options::ParseContext;
pub use parser::{AnyParser, Parser};
pub use registry::{StructuredId, TypeRegistry};
pub use structured_type::{
    ETAG_ANNOTATION, StructuredParser, StructuredType, TYPE_ANNOTATION, ValidationErrors,
};

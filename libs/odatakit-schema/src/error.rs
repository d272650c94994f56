use thiserror::Error;

/// Errors raised while building, configuring or using the type registry.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("type name `{name}` is ambiguous, candidates: {}", .candidates.join(", "))]
    AmbiguousType {
        name: String,
        candidates: Vec<String>,
    },

    #[error("type `{0}` is declared twice")]
    DuplicateType(String),

    #[error("field `{field}` is declared twice on `{type_name}`")]
    DuplicateField { type_name: String, field: String },

    #[error("inheritance cycle detected at `{0}`")]
    InheritanceCycle(String),

    #[error("parser for `{0}` used before configure")]
    NotConfigured(String),

    #[error("`{value}` is not a member of enum `{enum_name}`")]
    InvalidEnumMember { enum_name: String, value: String },

    #[error("`{0}` is not a structured type")]
    NotStructured(String),

    #[error("no API configured")]
    NoApis,

    #[error("multiple APIs configured and at least one has no name")]
    UnnamedApis,

    #[error("more than one API is marked as default")]
    MultipleDefaultApis,

    #[error("API not found: {0}")]
    ApiNotFound(String),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("configuration error: {0}")]
    Config(#[source] Box<figment::Error>),
}

impl From<figment::Error> for SchemaError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

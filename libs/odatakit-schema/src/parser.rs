use serde_json::Value;

use crate::edm::EdmType;
use crate::enum_type::EnumType;
use crate::error::SchemaError;
use crate::options::ParseContext;
use crate::structured_type::StructuredParser;

/// Converts values between their wire and native JSON representations.
pub trait Parser {
    /// Wire to native.
    ///
    /// # Errors
    /// Returns `SchemaError` when the value cannot be mapped for this type.
    fn deserialize(&self, value: &Value, ctx: &ParseContext<'_>) -> Result<Value, SchemaError>;

    /// Native to wire.
    ///
    /// # Errors
    /// Returns `SchemaError` when the value cannot be mapped for this type.
    fn serialize(&self, value: &Value, ctx: &ParseContext<'_>) -> Result<Value, SchemaError>;
}

/// Resolved parser for a declared type name.
#[derive(Debug, Clone, Copy)]
pub enum AnyParser<'a> {
    Edm(EdmType),
    Enum(&'a EnumType),
    Structured(StructuredParser<'a>),
}

impl<'a> AnyParser<'a> {
    #[must_use]
    pub fn as_structured(&self) -> Option<StructuredParser<'a>> {
        match self {
            Self::Structured(p) => Some(*p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_enum(&self) -> Option<&'a EnumType> {
        match self {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_edm(&self) -> Option<EdmType> {
        match self {
            Self::Edm(t) => Some(*t),
            _ => None,
        }
    }
}

impl Parser for AnyParser<'_> {
    fn deserialize(&self, value: &Value, ctx: &ParseContext<'_>) -> Result<Value, SchemaError> {
        match self {
            Self::Edm(edm) => Ok(match value {
                Value::Array(items) => {
                    Value::Array(items.iter().map(|v| edm.deserialize(v, ctx)).collect())
                }
                _ => edm.deserialize(value, ctx),
            }),
            Self::Enum(e) => e.deserialize(value, ctx),
            Self::Structured(s) => s.deserialize(value, ctx),
        }
    }

    fn serialize(&self, value: &Value, ctx: &ParseContext<'_>) -> Result<Value, SchemaError> {
        match self {
            Self::Edm(edm) => Ok(match value {
                Value::Array(items) => {
                    Value::Array(items.iter().map(|v| edm.serialize(v, ctx)).collect())
                }
                _ => edm.serialize(value, ctx),
            }),
            Self::Enum(e) => e.serialize(value, ctx),
            Self::Structured(s) => s.serialize(value, ctx),
        }
    }
}

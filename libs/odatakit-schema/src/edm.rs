//! Primitive `Edm.*` types.

use serde_json::{Map, Number, Value, json};
use std::fmt;

use crate::options::ParseContext;

/// Regex used for `Edm.Guid` in generated JSON schemas.
pub const GUID_PATTERN: &str =
    "^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdmType {
    Binary,
    Boolean,
    Byte,
    Date,
    DateTimeOffset,
    Decimal,
    Double,
    Duration,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    Stream,
    String,
    TimeOfDay,
    Untyped,
    Geography,
    Geometry,
}

impl EdmType {
    /// Parse a qualified `Edm.*` name. Returns `None` for anything else.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let short = name.strip_prefix("Edm.")?;
        let ty = match short {
            "Binary" => Self::Binary,
            "Boolean" => Self::Boolean,
            "Byte" => Self::Byte,
            "Date" => Self::Date,
            "DateTimeOffset" => Self::DateTimeOffset,
            "Decimal" => Self::Decimal,
            "Double" => Self::Double,
            "Duration" => Self::Duration,
            "Guid" => Self::Guid,
            "Int16" => Self::Int16,
            "Int32" => Self::Int32,
            "Int64" => Self::Int64,
            "SByte" => Self::SByte,
            "Single" => Self::Single,
            "Stream" => Self::Stream,
            "String" => Self::String,
            "TimeOfDay" => Self::TimeOfDay,
            "Untyped" | "PrimitiveType" | "ComplexType" | "EntityType" => Self::Untyped,
            s if s.starts_with("Geography") => Self::Geography,
            s if s.starts_with("Geometry") => Self::Geometry,
            _ => return None,
        };
        Some(ty)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "Edm.Binary",
            Self::Boolean => "Edm.Boolean",
            Self::Byte => "Edm.Byte",
            Self::Date => "Edm.Date",
            Self::DateTimeOffset => "Edm.DateTimeOffset",
            Self::Decimal => "Edm.Decimal",
            Self::Double => "Edm.Double",
            Self::Duration => "Edm.Duration",
            Self::Guid => "Edm.Guid",
            Self::Int16 => "Edm.Int16",
            Self::Int32 => "Edm.Int32",
            Self::Int64 => "Edm.Int64",
            Self::SByte => "Edm.SByte",
            Self::Single => "Edm.Single",
            Self::Stream => "Edm.Stream",
            Self::String => "Edm.String",
            Self::TimeOfDay => "Edm.TimeOfDay",
            Self::Untyped => "Edm.Untyped",
            Self::Geography => "Edm.Geography",
            Self::Geometry => "Edm.Geometry",
        }
    }

    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::SByte | Self::Int16 | Self::Int32 | Self::Int64
        )
    }

    /// Types carried as JSON strings when `IEEE754Compatible=true`.
    #[must_use]
    pub fn is_ieee754_sensitive(self) -> bool {
        matches!(self, Self::Int64 | Self::Decimal)
    }

    /// Types that render as quoted-free literals in key predicates.
    #[must_use]
    pub fn is_unquoted_literal(self) -> bool {
        self.is_integer()
            || matches!(
                self,
                Self::Boolean
                    | Self::Decimal
                    | Self::Double
                    | Self::Single
                    | Self::Guid
                    | Self::Date
                    | Self::DateTimeOffset
                    | Self::TimeOfDay
            )
    }

    /// Wire to native conversion.
    ///
    /// Values are passed through unchanged except for IEEE754-sensitive types
    /// arriving as strings, which become JSON numbers. A null consults the owning
    /// field and yields its default when the field is not nullable.
    #[must_use]
    pub fn deserialize(self, value: &Value, ctx: &ParseContext<'_>) -> Value {
        match value {
            Value::Null => ctx.null_fallback(),
            Value::String(s) if self.is_ieee754_sensitive() && ctx.options.ieee754_compatible => s
                .parse::<Number>()
                .map_or_else(|_| value.clone(), Value::Number),
            _ => value.clone(),
        }
    }

    /// Native to wire conversion, the inverse of [`EdmType::deserialize`].
    #[must_use]
    pub fn serialize(self, value: &Value, ctx: &ParseContext<'_>) -> Value {
        match value {
            Value::Null => ctx.null_fallback(),
            Value::Number(n) if self.is_ieee754_sensitive() && ctx.options.ieee754_compatible => {
                Value::String(n.to_string())
            }
            _ => value.clone(),
        }
    }

    /// Base JSON schema fragment for this primitive.
    #[must_use]
    pub fn json_schema(self, max_length: Option<usize>) -> Map<String, Value> {
        let fragment = match self {
            Self::String => match max_length {
                Some(max) => json!({ "type": "string", "maxLength": max }),
                None => json!({ "type": "string" }),
            },
            Self::Date => json!({ "type": "string", "format": "date" }),
            Self::TimeOfDay => json!({ "type": "string", "format": "time" }),
            Self::DateTimeOffset => json!({ "type": "string", "format": "date-time" }),
            Self::Duration => json!({ "type": "string", "format": "duration" }),
            Self::Guid => json!({ "type": "string", "pattern": GUID_PATTERN }),
            Self::Binary | Self::Stream => {
                json!({ "type": "string", "contentEncoding": "base64" })
            }
            Self::Byte | Self::SByte | Self::Int16 | Self::Int32 | Self::Int64 => {
                json!({ "type": "integer" })
            }
            Self::Decimal | Self::Double | Self::Single => json!({ "type": "number" }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Untyped | Self::Geography | Self::Geometry => json!({ "type": "object" }),
        };
        match fragment {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl fmt::Display for EdmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

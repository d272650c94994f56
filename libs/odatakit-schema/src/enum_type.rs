//! Enum types: bidirectional mapping between member names and integer values.
//!
//! On the wire an enum value is its member name (`"Red"`), or for flag enums a
//! comma separated list of names (`"Red, Blue"`). Natively it is the integer value
//! unless the API runs with `string_as_enum`, in which case names are kept.

use serde_json::{Value, json};
use tracing::warn;

use crate::config::{AnnotationConfig, EnumMemberConfig, EnumTypeConfig};
use crate::error::SchemaError;
use crate::options::ParseContext;
use crate::parser::Parser;

#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub namespace: String,
    pub alias: Option<String>,
    pub flags: bool,
    pub members: Vec<EnumMemberConfig>,
    pub annotations: Vec<AnnotationConfig>,
}

impl EnumType {
    #[must_use]
    pub fn from_config(config: &EnumTypeConfig, namespace: &str, alias: Option<&str>) -> Self {
        Self {
            name: config.name.clone(),
            namespace: namespace.to_owned(),
            alias: alias.map(ToOwned::to_owned),
            flags: config.flags,
            members: config.members.clone(),
            annotations: config.annotations.clone(),
        }
    }

    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    #[must_use]
    pub fn is_type_of(&self, name: &str) -> bool {
        is_qualified(name, &self.namespace, self.alias.as_deref(), &self.name)
    }

    #[must_use]
    pub fn members(&self) -> &[EnumMemberConfig] {
        &self.members
    }

    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.members
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.value)
    }

    #[must_use]
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.value == value)
            .map(|m| m.name.as_str())
    }

    /// Decompose a flags value into member names, in declaration order.
    ///
    /// A zero value maps to the zero member when one is declared.
    #[must_use]
    pub fn names_of(&self, bits: i64) -> Vec<&str> {
        if bits == 0 {
            return self.name_of(0).into_iter().collect();
        }
        self.members
            .iter()
            .filter(|m| m.value != 0 && bits & m.value == m.value)
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Parse a wire string (`"A"` or `"A, B"`) into its integer value.
    ///
    /// # Errors
    /// Returns `SchemaError::InvalidEnumMember` for unknown names, or for several
    /// names on a non-flags enum.
    pub fn parse_names(&self, names: &str) -> Result<i64, SchemaError> {
        let parts: Vec<&str> = names
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() || (!self.flags && parts.len() > 1) {
            return Err(self.invalid(names));
        }
        parts.iter().try_fold(0_i64, |acc, part| {
            self.value_of(part)
                .map(|v| acc | v)
                .ok_or_else(|| self.invalid(part))
        })
    }

    /// Render an integer value as its wire name(s).
    ///
    /// # Errors
    /// Returns `SchemaError::InvalidEnumMember` when the value has no exact
    /// member decomposition.
    pub fn format_value(&self, value: i64) -> Result<String, SchemaError> {
        if self.flags {
            let names = self.names_of(value);
            let covered = names
                .iter()
                .filter_map(|n| self.value_of(n))
                .fold(0_i64, |acc, v| acc | v);
            if names.is_empty() || covered != value {
                return Err(self.invalid(&value.to_string()));
            }
            Ok(names.join(", "))
        } else {
            self.name_of(value)
                .map(ToOwned::to_owned)
                .ok_or_else(|| self.invalid(&value.to_string()))
        }
    }

    /// `None` when the value is a member (or a valid flags combination).
    #[must_use]
    pub fn validate(&self, value: &Value) -> Option<Vec<String>> {
        let ok = match value {
            Value::Null => true,
            Value::Number(n) => n.as_i64().is_some_and(|v| self.format_value(v).is_ok()),
            Value::String(s) => self.parse_names(s).is_ok(),
            Value::Array(items) => items.iter().all(|v| self.validate(v).is_none()),
            _ => false,
        };
        if ok {
            None
        } else {
            Some(vec!["mismatch".to_owned()])
        }
    }

    #[must_use]
    pub fn json_schema(&self) -> Value {
        let names: Vec<&str> = self.members.iter().map(|m| m.name.as_str()).collect();
        json!({
            "title": self.name,
            "type": "string",
            "enum": names,
        })
    }

    fn invalid(&self, value: &str) -> SchemaError {
        SchemaError::InvalidEnumMember {
            enum_name: self.qualified_name(),
            value: value.to_owned(),
        }
    }
}

impl Parser for EnumType {
    /// Member names become their numeric value (kept as names under
    /// `string_as_enum`). A name the type does not declare is logged and
    /// passed through unchanged.
    fn deserialize(&self, value: &Value, ctx: &ParseContext<'_>) -> Result<Value, SchemaError> {
        match value {
            Value::Null => Ok(ctx.null_fallback()),
            Value::String(s) => match self.parse_names(s) {
                Ok(_) if ctx.options.string_as_enum => Ok(value.clone()),
                Ok(parsed) => Ok(Value::from(parsed)),
                Err(err) => {
                    warn!(error = %err, "passing unknown enum value through");
                    Ok(value.clone())
                }
            },
            Value::Array(items) => items
                .iter()
                .map(|v| self.deserialize(v, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Ok(value.clone()),
        }
    }

    fn serialize(&self, value: &Value, ctx: &ParseContext<'_>) -> Result<Value, SchemaError> {
        match value {
            Value::Null => Ok(ctx.null_fallback()),
            Value::Number(n) => {
                let raw = n.as_i64().ok_or_else(|| self.invalid(&n.to_string()))?;
                self.format_value(raw).map(Value::String)
            }
            Value::Array(items) => items
                .iter()
                .map(|v| self.serialize(v, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Ok(value.clone()),
        }
    }
}

pub(crate) fn is_qualified(candidate: &str, namespace: &str, alias: Option<&str>, name: &str) -> bool {
    let matches = |prefix: &str| {
        candidate
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('.'))
            == Some(name)
    };
    matches(namespace) || alias.is_some_and(matches)
}

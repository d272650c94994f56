//! `OData` literal rendering for key predicates and function parameters.

use odatakit_schema::{AnyParser, EnumType};
use serde_json::Value;

/// Render `value` as a URL literal, using `parser` (when known) to decide quoting.
///
/// Strings are single-quoted with embedded quotes doubled unless the declared
/// primitive type takes an unquoted literal (integers carried as strings, guids,
/// dates). Enum members render as `Namespace.Type'Member'`. Objects and arrays
/// render as JSON text.
#[must_use]
pub fn literal(value: &Value, parser: Option<AnyParser<'_>>) -> String {
    match (value, parser) {
        (Value::Null, _) => "null".to_owned(),
        (Value::Bool(b), _) => b.to_string(),
        (Value::String(s), Some(AnyParser::Enum(ty))) => enum_literal(ty, s),
        (Value::Number(n), Some(AnyParser::Enum(ty))) => n
            .as_i64()
            .and_then(|v| ty.format_value(v).ok())
            .map_or_else(|| n.to_string(), |name| enum_literal(ty, &name)),
        (Value::Number(n), _) => n.to_string(),
        (Value::String(s), Some(AnyParser::Edm(edm))) if edm.is_unquoted_literal() => s.clone(),
        (Value::String(s), _) => quote(s),
        (Value::Array(_) | Value::Object(_), _) => value.to_string(),
    }
}

/// Single-quote a string literal, doubling embedded quotes.
#[must_use]
pub fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn enum_literal(ty: &EnumType, name: &str) -> String {
    format!("{}{}", ty.qualified_name(), quote(name))
}

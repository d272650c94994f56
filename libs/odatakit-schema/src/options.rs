use serde_json::Value;

use crate::config::ApiOptions;
use crate::field::Field;

/// Options threaded through every (de)serialize call.
///
/// Leaf parsers (primitives and enums) see the field that owns the value, so
/// field-level concerns such as nullability and defaults can be honored there.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub options: &'a ApiOptions,
    pub field: Option<&'a Field>,
}

impl<'a> ParseContext<'a> {
    #[must_use]
    pub fn new(options: &'a ApiOptions) -> Self {
        Self {
            options,
            field: None,
        }
    }

    #[must_use]
    pub fn with_field<'b>(&self, field: &'b Field) -> ParseContext<'b>
    where
        'a: 'b,
    {
        ParseContext {
            options: self.options,
            field: Some(field),
        }
    }

    /// Value a leaf parser produces for a JSON `null`.
    #[must_use]
    pub fn null_fallback(&self) -> Value {
        match self.field {
            Some(field) if !field.nullable => field.default.clone().unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

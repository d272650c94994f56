use serde_json::{Map, Value};

use crate::config::{CallableConfig, CallableKind};
use crate::enum_type::is_qualified;
use crate::error::SchemaError;
use crate::field::{Field, FieldParser, split_collection};
use crate::options::ParseContext;
use crate::parser::Parser;
use crate::registry::TypeRegistry;

#[derive(Debug, Clone)]
pub struct ReturnType {
    pub type_name: String,
    pub collection: bool,
    pub(crate) parser: Option<FieldParser>,
}

/// A function or action.
#[derive(Debug, Clone)]
pub struct Callable {
    pub name: String,
    pub namespace: String,
    pub alias: Option<String>,
    pub kind: CallableKind,
    pub bound: bool,
    pub composable: bool,
    pub parameters: Vec<Field>,
    pub return_type: Option<ReturnType>,
}

impl Callable {
    #[must_use]
    pub fn from_config(config: &CallableConfig, namespace: &str, alias: Option<&str>) -> Self {
        Self {
            name: config.name.clone(),
            namespace: namespace.to_owned(),
            alias: alias.map(ToOwned::to_owned),
            kind: config.kind,
            bound: config.bound,
            composable: config.composable,
            parameters: config.parameters.iter().map(Field::from_config).collect(),
            return_type: config.return_type.as_ref().map(|r| {
                let (type_name, collection) = split_collection(&r.type_name);
                ReturnType {
                    type_name: type_name.to_owned(),
                    collection: r.collection || collection,
                    parser: None,
                }
            }),
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
    pub fn is_action(&self) -> bool {
        self.kind == CallableKind::Action
    }

    /// The first parameter of a bound callable.
    #[must_use]
    pub fn binding_parameter(&self) -> Option<&Field> {
        if self.bound {
            self.parameters.first()
        } else {
            None
        }
    }

    /// Parameters the caller supplies (the binding parameter excluded).
    pub fn call_parameters(&self) -> impl Iterator<Item = &Field> {
        self.parameters.iter().skip(usize::from(self.bound))
    }

    /// Serialize call parameters; unknown parameters pass through unchanged.
    ///
    /// # Errors
    /// Returns `SchemaError` if a parameter cannot be serialized.
    pub fn serialize_parameters(
        &self,
        registry: &TypeRegistry,
        params: &Value,
        ctx: &ParseContext<'_>,
    ) -> Result<Map<String, Value>, SchemaError> {
        let Some(obj) = params.as_object() else {
            return Ok(Map::new());
        };
        let mut out = obj.clone();
        for field in self.call_parameters() {
            if let Some(value) = obj.get(&field.name).filter(|v| !v.is_null()) {
                let parser = registry.field_parser(field)?;
                out.insert(field.name.clone(), parser.serialize(value, &ctx.with_field(field))?);
            }
        }
        Ok(out)
    }

    /// Deserialize a returned payload through the declared return type.
    ///
    /// # Errors
    /// Returns `SchemaError` if the value does not fit the return type.
    pub fn deserialize_return(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        ctx: &ParseContext<'_>,
    ) -> Result<Value, SchemaError> {
        match self.return_type.as_ref().and_then(|r| r.parser) {
            Some(parser) => registry.resolve_parser(parser).deserialize(value, ctx),
            None => Ok(value.clone()),
        }
    }
}

//! JSON Schema (draft-07) emission for structured types.

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::field::{Field, FieldParser};
use crate::registry::StructuredId;
use crate::structured_type::StructuredParser;

pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Post-processes the schema generated for one field.
pub type CustomSchemaFn = Arc<dyn Fn(Value, &Field) -> Value + Send + Sync>;

/// Controls which fields appear and how.
///
/// Navigation fields are left out unless named in `expand`; `select`, when
/// set, restricts the output to the listed fields.
#[derive(Clone, Default)]
pub struct JsonSchemaOptions {
    pub select: Option<Vec<String>>,
    pub expand: BTreeMap<String, JsonSchemaOptions>,
    pub custom: BTreeMap<String, CustomSchemaFn>,
}

impl fmt::Debug for JsonSchemaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaOptions")
            .field("select", &self.select)
            .field("expand", &self.expand)
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl JsonSchemaOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn expand(mut self, field: impl Into<String>, options: JsonSchemaOptions) -> Self {
        self.expand.insert(field.into(), options);
        self
    }

    #[must_use]
    pub fn custom<F>(mut self, field: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Value, &Field) -> Value + Send + Sync + 'static,
    {
        self.custom.insert(field.into(), Arc::new(transform));
        self
    }

    /// No selection, expansion or transform: the schema depends only on the type.
    fn is_plain(&self) -> bool {
        self.select.is_none() && self.expand.is_empty() && self.custom.is_empty()
    }

    fn includes(&self, field: &Field) -> bool {
        (!field.navigation || self.expand.contains_key(&field.name))
            && self
                .select
                .as_ref()
                .is_none_or(|s| s.iter().any(|n| n == &field.name))
    }
}

/// State of one schema emission: the types currently being inlined with plain
/// options, the ones found to refer back to themselves, and their shared
/// definitions. Types inlined under explicit options are not tracked since
/// the options tree bounds their depth.
#[derive(Default)]
struct SchemaWalk {
    root: Option<StructuredId>,
    emitting: Vec<StructuredId>,
    recursive: Vec<StructuredId>,
    definitions: Map<String, Value>,
}

impl SchemaWalk {
    fn reference(&mut self, parser: &StructuredParser<'_>) -> Value {
        if !self.recursive.contains(&parser.id()) {
            self.recursive.push(parser.id());
        }
        if self.root == Some(parser.id()) {
            json!({ "$ref": "#" })
        } else {
            json!({ "$ref": format!("#/definitions/{}", parser.qualified_name()) })
        }
    }
}

impl StructuredParser<'_> {
    /// Draft-07 schema for this type, inherited fields first.
    ///
    /// A structured type nested inside itself is emitted once, under
    /// `definitions` (or as the document itself), and referenced with `$ref`.
    #[must_use]
    pub fn json_schema(&self, options: &JsonSchemaOptions) -> Value {
        let mut walk = SchemaWalk {
            root: options.is_plain().then_some(self.id()),
            ..SchemaWalk::default()
        };
        let mut schema = Map::new();
        schema.insert("$schema".to_owned(), json!(DRAFT_07));
        schema.extend(self.object_schema(options, &mut walk));
        if !walk.definitions.is_empty() {
            schema.insert("definitions".to_owned(), Value::Object(walk.definitions));
        }
        Value::Object(schema)
    }

    fn object_schema(&self, options: &JsonSchemaOptions, walk: &mut SchemaWalk) -> Map<String, Value> {
        let tracked = options.is_plain();
        if tracked {
            walk.emitting.push(self.id());
        }
        let fields: Vec<&Field> = self
            .fields(true, true)
            .into_iter()
            .filter(|f| options.includes(f))
            .collect();

        let mut properties = Map::new();
        for field in &fields {
            let mut schema = self.field_schema(field, options.expand.get(&field.name), walk);
            if let Some(transform) = options.custom.get(&field.name) {
                schema = transform(schema, *field);
            }
            properties.insert(field.name.clone(), schema);
        }
        let required: Vec<&str> = fields
            .iter()
            .filter(|f| !f.nullable)
            .map(|f| f.name.as_str())
            .collect();
        if tracked {
            walk.emitting.pop();
        }

        as_map(json!({
            "$id": self.qualified_name(),
            "title": self.name(),
            "type": "object",
            "properties": properties,
            "required": required,
        }))
    }

    fn field_schema(
        &self,
        field: &Field,
        expand: Option<&JsonSchemaOptions>,
        walk: &mut SchemaWalk,
    ) -> Value {
        let registry = self.registry();
        let plain = JsonSchemaOptions::default();
        let nested_options = expand.unwrap_or(&plain);
        let mut schema = match field.parser {
            Some(FieldParser::Edm(edm)) => edm.json_schema(field.max_length),
            Some(FieldParser::Enum(id)) => as_map(registry.enum_by_id(id).json_schema()),
            Some(FieldParser::Structured(id))
                if nested_options.is_plain() && walk.emitting.contains(&id) =>
            {
                as_map(walk.reference(&registry.structured_by_id(id)))
            }
            Some(FieldParser::Structured(id)) => {
                let nested = registry.structured_by_id(id);
                let inline = nested.object_schema(nested_options, walk);
                let shared = nested_options.is_plain()
                    && walk.root != Some(id)
                    && walk.recursive.contains(&id);
                if shared {
                    walk.definitions
                        .insert(nested.qualified_name(), Value::Object(inline));
                    as_map(walk.reference(&nested))
                } else {
                    inline
                }
            }
            None => as_map(json!({ "type": "object" })),
        };

        if let Some(default) = field.default.as_ref().filter(|d| !d.is_null()) {
            schema.insert("default".to_owned(), default.clone());
        }
        if field.nullable
            && let Some(ty) = schema.get("type").cloned()
        {
            schema.insert("type".to_owned(), json!([ty, "null"]));
        }
        if field.collection {
            return json!({
                "type": "array",
                "items": Value::Object(schema),
                "additionalItems": false,
            });
        }
        Value::Object(schema)
    }
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

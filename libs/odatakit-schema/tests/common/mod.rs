#![allow(dead_code)]

use odatakit_schema::{
    ApiConfig, ApiOptions, EntityContainerConfig, EnumTypeConfig, FieldConfig, SchemaConfig,
    StructuredTypeConfig,
};
use serde_json::json;

pub fn demo_schema() -> SchemaConfig {
    SchemaConfig::new("Demo")
        .with_alias("self")
        .with_enum(
            EnumTypeConfig::new("Color")
                .flags()
                .member("None", 0)
                .member("Red", 1)
                .member("Green", 2)
                .member("Blue", 4),
        )
        .with_entity(
            StructuredTypeConfig::new("Address")
                .field(FieldConfig::new("Street", "Edm.String").required().with_max_length(20))
                .field(FieldConfig::new("City", "Edm.String").with_default(json!("Springfield"))),
        )
        .with_entity(
            StructuredTypeConfig::new("Person")
                .field(FieldConfig::new("UserName", "Edm.String").key())
                .field(FieldConfig::new("FirstName", "Edm.String").required().with_max_length(10))
                .field(FieldConfig::new("Age", "Edm.Int32").with_default(json!(18)))
                .field(FieldConfig::new("Token", "Edm.Guid").required())
                .field(FieldConfig::new("Session", "Edm.Guid"))
                .field(FieldConfig::new("Address", "Demo.Address"))
                .field(FieldConfig::new("Emails", "Collection(Edm.String)"))
                .field(FieldConfig::new("Favorite", "self.Color"))
                .field(FieldConfig::new("Friends", "Demo.Person").collection().navigation()),
        )
        .with_entity(
            StructuredTypeConfig::new("Employee")
                .with_base("Demo.Person")
                .field(FieldConfig::new("Salary", "Edm.Int64")),
        )
        .with_entity(
            StructuredTypeConfig::new("Manager")
                .with_base("self.Employee")
                .field(FieldConfig::new("Budget", "Edm.Decimal")),
        )
        .with_entity(
            StructuredTypeConfig::new("OrderLine")
                .field(FieldConfig::new("OrderId", "Edm.Int32").key().with_ref("Order/Id"))
                .field(FieldConfig::new("Line", "Edm.Int32").key())
                .field(FieldConfig::new("Quantity", "Edm.Int32")),
        )
        .with_container(
            EntityContainerConfig::new("Container")
                .entity_set("People", "Demo.Person")
                .entity_set("Lines", "Demo.OrderLine")
                .singleton("Me", "Demo.Person"),
        )
}

pub fn demo_api(options: ApiOptions) -> ApiConfig {
    ApiConfig::new("http://localhost/demo")
        .with_name("demo")
        .with_options(options)
        .with_schema(demo_schema())
}

#![allow(dead_code)]

use std::sync::Arc;

use odatakit_resource::Resource;
use odatakit_schema::{
    Api, ApiConfig, EntityContainerConfig, FieldConfig, SchemaConfig, Settings,
    StructuredTypeConfig,
};

pub fn shop_api() -> Arc<Api> {
    let schema = SchemaConfig::new("Shop")
        .with_entity(
            StructuredTypeConfig::new("Product")
                .field(FieldConfig::new("Id", "Edm.Int32").key())
                .field(FieldConfig::new("Name", "Edm.String")),
        )
        .with_container(EntityContainerConfig::new("Container").entity_set("Products", "Shop.Product"));
    let settings = Settings::new(&[ApiConfig::new("http://localhost/shop").with_schema(schema)]).unwrap();
    settings.default_api().clone()
}

pub fn products() -> Resource {
    Resource::entity_set(shop_api(), "Products")
}

pub fn product(id: i32) -> Resource {
    products().key(id).unwrap()
}

/// Join lines with CRLF, terminating the last one too.
pub fn crlf(lines: &[&str]) -> String {
    lines.iter().map(|line| format!("{line}\r\n")).collect()
}

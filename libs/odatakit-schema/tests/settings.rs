//! Multi-API settings, lookups and configuration loading.

mod common;

use std::io::Write;

use odatakit_schema::{
    ApiConfig, ApiOptions, CallableConfig, FieldConfig, Parser, SchemaConfig, SchemaError,
    Settings, SettingsConfig, StructuredTypeConfig,
};
use serde_json::json;

fn catalog_api() -> ApiConfig {
    ApiConfig::new("http://localhost/catalog/")
        .with_name("catalog")
        .with_schema(
            SchemaConfig::new("Catalog")
                .with_entity(
                    StructuredTypeConfig::new("Product")
                        .field(FieldConfig::new("Id", "Edm.Int32").key())
                        .field(FieldConfig::new("Price", "Edm.Decimal")),
                )
                .with_entity(StructuredTypeConfig::new("Person"))
                .with_callable(
                    CallableConfig::function("MostExpensive").returns("Catalog.Product", false),
                )
                .with_callable(
                    CallableConfig::action("Discount")
                        .bound()
                        .parameter(FieldConfig::new("bindingParameter", "Catalog.Product"))
                        .parameter(FieldConfig::new("Percent", "Edm.Decimal")),
                ),
        )
}

#[test]
fn test_single_unnamed_api_is_default() {
    let settings = Settings::new(&[ApiConfig::new("http://localhost/svc")
        .with_schema(common::demo_schema())])
    .unwrap();
    assert_eq!(settings.default_api().service_root_url(), "http://localhost/svc/");
    assert_eq!(settings.default_api().name(), None);
}

#[test]
fn test_rules_for_several_apis() {
    assert!(matches!(Settings::new(&[]), Err(SchemaError::NoApis)));

    let unnamed = [
        common::demo_api(ApiOptions::default()),
        ApiConfig::new("http://localhost/other"),
    ];
    assert!(matches!(
        Settings::new(&unnamed),
        Err(SchemaError::UnnamedApis)
    ));

    let mut first = common::demo_api(ApiOptions::default());
    first.default = true;
    let mut second = catalog_api();
    second.default = true;
    assert!(matches!(
        Settings::new(&[first, second]),
        Err(SchemaError::MultipleDefaultApis)
    ));
}

#[test]
fn test_default_is_marked_or_first() {
    let settings =
        Settings::new(&[common::demo_api(ApiOptions::default()), catalog_api()]).unwrap();
    assert_eq!(settings.default_api().name(), Some("demo"));

    let mut catalog = catalog_api();
    catalog.default = true;
    let settings = Settings::new(&[common::demo_api(ApiOptions::default()), catalog]).unwrap();
    assert_eq!(settings.default_api().name(), Some("catalog"));
    assert!(settings.default_api().is_default());
}

#[test]
fn test_lookups_across_apis() {
    let settings =
        Settings::new(&[common::demo_api(ApiOptions::default()), catalog_api()]).unwrap();

    assert_eq!(
        settings.api_for_type("Catalog.Product").unwrap().name(),
        Some("catalog")
    );
    assert_eq!(
        settings.api_for_type("self.Person").unwrap().name(),
        Some("demo")
    );
    assert!(matches!(
        settings.api_for_type("Nope.Thing"),
        Err(SchemaError::ApiNotFound(_))
    ));
    assert_eq!(settings.api_by_name("catalog").unwrap().name(), Some("catalog"));
    assert!(settings.api_by_name("missing").is_err());

    let product = settings.structured_type_for_type("Catalog.Product").unwrap();
    assert_eq!(product.keys().len(), 1);
    assert_eq!(
        settings.enum_type_for_type("Demo.Color").unwrap().value_of("Blue"),
        Some(4)
    );
    assert_eq!(
        settings.entity_set_for_type("Demo.Person").unwrap().name,
        "People"
    );
    assert!(settings.parser_for_type("Edm.String").is_some());
    assert!(settings.parser_for_type("Catalog.Product").is_some());
    assert!(settings.parser_for_type("Catalog.Nope").is_none());
    assert_eq!(
        settings
            .find_for_types(&["Nope.A", "Catalog.Product"])
            .and_then(|a| a.name()),
        Some("catalog")
    );
}

#[test]
fn test_by_name_lookups_detect_ambiguity() {
    let settings =
        Settings::new(&[common::demo_api(ApiOptions::default()), catalog_api()]).unwrap();

    assert_eq!(
        settings.structured_type_by_name("Product").unwrap().qualified_name(),
        "Catalog.Product"
    );
    let err = settings.structured_type_by_name("Person").unwrap_err();
    assert!(matches!(err, SchemaError::AmbiguousType { .. }));
    assert!(matches!(
        settings.enum_type_by_name("Shade"),
        Err(SchemaError::UnknownType(_))
    ));
    assert_eq!(settings.entity_set_by_name("Lines").unwrap().entity_type, "Demo.OrderLine");
}

#[test]
fn test_callables() {
    let settings = Settings::new(&[catalog_api()]).unwrap();
    let discount = settings.callable_for_type("Catalog.Discount").unwrap();
    assert!(discount.is_action());
    assert_eq!(
        discount.binding_parameter().map(|p| p.name.as_str()),
        Some("bindingParameter")
    );
    let names: Vec<&str> = discount.call_parameters().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Percent"]);

    let most = settings.callable_by_name("MostExpensive").unwrap();
    let registry = settings.default_api().registry();
    let value = most
        .deserialize_return(registry, &json!({ "Id": 1, "Price": 9.5 }), &registry.parse_context())
        .unwrap();
    assert_eq!(value["Id"], json!(1));
}

#[test]
fn test_callable_parameters_serialize_through_types() {
    let api = ApiConfig::new("http://localhost/catalog/")
        .with_options(ApiOptions {
            ieee754_compatible: true,
            ..ApiOptions::default()
        })
        .with_schema(catalog_api().schemas.remove(0));
    let settings = Settings::new(&[api]).unwrap();
    let discount = settings.callable_by_name("Discount").unwrap();
    let registry = settings.default_api().registry();
    let params = discount
        .serialize_parameters(registry, &json!({ "Percent": 12.5 }), &registry.parse_context())
        .unwrap();
    assert_eq!(params["Percent"], json!("12.5"));
}

#[test]
fn test_structured_parser_from_settings_round_trips() {
    let settings = Settings::new(&[common::demo_api(ApiOptions::default())]).unwrap();
    let person = settings.structured_type_for_type("Demo.Person").unwrap();
    let ctx = person.registry().parse_context();
    let native = person.deserialize(&json!({ "Favorite": "Blue" }), &ctx).unwrap();
    assert_eq!(person.serialize(&native, &ctx).unwrap(), json!({ "Favorite": "Blue" }));
}

#[test]
fn test_settings_load_from_yaml() {
    let yaml = r#"
apis:
  - name: shop
    service_root_url: "http://localhost/shop"
    options:
      with_count: true
    schemas:
      - namespace: Shop
        enums:
          - name: Status
            members:
              - { name: Open, value: 0 }
              - { name: Closed, value: 1 }
        entities:
          - name: Order
            fields:
              - { name: Id, type: Edm.Int32, key: true }
              - { name: Status, type: Shop.Status }
        containers:
          - name: Default
            entity_sets:
              - { name: Orders, entity_type: Shop.Order }
"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let config = SettingsConfig::load(file.path()).unwrap();
    let settings = Settings::from_config(&config).unwrap();
    let shop = settings.api_by_name("shop").unwrap();
    assert!(shop.options().with_count);
    assert_eq!(shop.registry().entity_set("Orders").unwrap().entity_type, "Shop.Order");

    let order = settings.structured_type_for_type("Shop.Order").unwrap();
    let native = order
        .deserialize(&json!({ "Id": 1, "Status": "Closed" }), &order.registry().parse_context())
        .unwrap();
    assert_eq!(native["Status"], json!(1));
}

#![allow(dead_code)]

use std::sync::Arc;

use odatakit_schema::{
    Api, ApiConfig, ApiOptions, CallableConfig, EntityContainerConfig, EnumTypeConfig,
    FieldConfig, SchemaConfig, Settings, StructuredTypeConfig,
};

pub fn trip_schema() -> SchemaConfig {
    SchemaConfig::new("Trip")
        .with_enum(
            EnumTypeConfig::new("Gender")
                .member("Male", 0)
                .member("Female", 1),
        )
        .with_entity(
            StructuredTypeConfig::new("Location")
                .field(FieldConfig::new("City", "Edm.String")),
        )
        .with_entity(
            StructuredTypeConfig::new("Person")
                .field(FieldConfig::new("UserName", "Edm.String").key())
                .field(FieldConfig::new("FirstName", "Edm.String").required())
                .field(FieldConfig::new("Gender", "Trip.Gender"))
                .field(FieldConfig::new("HomeAddress", "Trip.Location"))
                .field(FieldConfig::new("Friends", "Trip.Person").collection().navigation())
                .field(FieldConfig::new("BestFriend", "Trip.Person").navigation())
                .field(FieldConfig::new("Trips", "Trip.Journey").collection().navigation()),
        )
        .with_entity(
            StructuredTypeConfig::new("Employee")
                .with_base("Trip.Person")
                .field(FieldConfig::new("Cost", "Edm.Int64")),
        )
        .with_entity(
            StructuredTypeConfig::new("Journey")
                .field(FieldConfig::new("JourneyId", "Edm.Int32").key())
                .field(FieldConfig::new("Budget", "Edm.Decimal")),
        )
        .with_entity(
            StructuredTypeConfig::new("Document")
                .field(FieldConfig::new("Id", "Edm.Guid").key())
                .field(FieldConfig::new("Title", "Edm.String")),
        )
        .with_entity(
            StructuredTypeConfig::new("Leg")
                .field(FieldConfig::new("JourneyId", "Edm.Int32").key().with_ref("Journey/JourneyId"))
                .field(FieldConfig::new("Seq", "Edm.Int32").key())
                .field(FieldConfig::new("From", "Edm.String")),
        )
        .with_callable(
            CallableConfig::function("GetNearestAirport")
                .parameter(FieldConfig::new("lat", "Edm.Double"))
                .parameter(FieldConfig::new("lon", "Edm.Double"))
                .returns("Trip.Location", false),
        )
        .with_callable(
            CallableConfig::function("GetFriendsTrips")
                .bound()
                .parameter(FieldConfig::new("person", "Trip.Person"))
                .parameter(FieldConfig::new("userName", "Edm.String"))
                .returns("Trip.Journey", true),
        )
        .with_callable(
            CallableConfig::function("ByGender")
                .parameter(FieldConfig::new("gender", "Trip.Gender"))
                .returns("Trip.Person", true),
        )
        .with_callable(
            CallableConfig::action("ShareTrip")
                .bound()
                .parameter(FieldConfig::new("person", "Trip.Person"))
                .parameter(FieldConfig::new("userName", "Edm.String"))
                .parameter(FieldConfig::new("journeyId", "Edm.Int32")),
        )
        .with_callable(CallableConfig::action("ResetDataSource"))
        .with_container(
            EntityContainerConfig::new("Container")
                .entity_set("People", "Trip.Person")
                .entity_set("Documents", "Trip.Document")
                .entity_set("Legs", "Trip.Leg")
                .singleton("Me", "Trip.Person"),
        )
}

pub fn trip_api(options: ApiOptions) -> Arc<Api> {
    let settings = Settings::new(&[ApiConfig::new("http://localhost/trip")
        .with_options(options)
        .with_schema(trip_schema())])
    .unwrap();
    settings.default_api().clone()
}

pub fn api() -> Arc<Api> {
    trip_api(ApiOptions::default())
}

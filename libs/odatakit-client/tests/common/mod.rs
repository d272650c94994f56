#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::StatusCode;
use odatakit_client::{ClientError, ODataClient, Transport, TransportRequest, TransportResponse};
use odatakit_schema::{
    ApiConfig, CallableConfig, EntityContainerConfig, FieldConfig, SchemaConfig, Settings,
    StructuredTypeConfig,
};
use serde_json::Value;

/// Replays scripted responses in order and records every request it sees.
#[derive(Default)]
pub struct FakeTransport {
    requests: Mutex<Vec<TransportRequest>>,
    responses: Mutex<VecDeque<TransportResponse>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: TransportResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_json(&self, status: StatusCode, body: &Value) {
        self.push(TransportResponse::json(status, body));
    }

    pub fn push_empty(&self, status: StatusCode) {
        self.push(TransportResponse::new(status, ""));
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request(&self, index: usize) -> TransportRequest {
        self.requests()[index].clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ClientError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::transport("no scripted response left"))
    }
}

pub fn trip_schema() -> SchemaConfig {
    SchemaConfig::new("Trip")
        .with_entity(
            StructuredTypeConfig::new("Person")
                .field(FieldConfig::new("UserName", "Edm.String").key())
                .field(FieldConfig::new("FirstName", "Edm.String").required())
                .field(FieldConfig::new("Age", "Edm.Int32").with_default(Value::from(18)))
                .field(FieldConfig::new("Friends", "Trip.Person").collection().navigation())
                .field(FieldConfig::new("BestFriend", "Trip.Person").navigation()),
        )
        .with_entity(
            StructuredTypeConfig::new("Airport")
                .field(FieldConfig::new("Code", "Edm.String").key())
                .field(FieldConfig::new("Name", "Edm.String")),
        )
        .with_callable(
            CallableConfig::function("NearestAirport")
                .parameter(FieldConfig::new("lat", "Edm.Double"))
                .parameter(FieldConfig::new("lon", "Edm.Double"))
                .returns("Trip.Airport", false),
        )
        .with_callable(CallableConfig::function("Adults").returns("Trip.Person", true))
        .with_callable(
            CallableConfig::action("Rename")
                .parameter(FieldConfig::new("from", "Edm.String"))
                .parameter(FieldConfig::new("to", "Edm.String")),
        )
        .with_container(
            EntityContainerConfig::new("Container")
                .entity_set("People", "Trip.Person")
                .entity_set("Airports", "Trip.Airport")
                .singleton("Me", "Trip.Person"),
        )
}

pub fn client() -> (ODataClient, Arc<FakeTransport>) {
    let settings =
        Settings::new(&[ApiConfig::new("http://localhost/trip").with_schema(trip_schema())])
            .unwrap();
    let transport = FakeTransport::new();
    (ODataClient::new(settings, transport.clone()), transport)
}

/// `(name, value)` lookup in a recorded query.
pub fn query_value(request: &TransportRequest, name: &str) -> Option<String> {
    request
        .query
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.clone())
}

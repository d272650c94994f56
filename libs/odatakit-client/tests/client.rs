//! Client operations against a scripted transport.

mod common;

use common::{client, query_value};
use futures_util::StreamExt;
use http::header::{ACCEPT, CONTENT_TYPE, IF_MATCH};
use http::{HeaderValue, Method, StatusCode};
use odatakit_batch::BatchRequest;
use odatakit_client::{
    CallResult, ClientError, Collection, Entities, Entity, Meta, Model, ResponseShape, TransportResponse,
};
use odatakit_resource::QueryOption;
use serde_json::{Value, json};

fn people_page(range: std::ops::Range<u32>) -> Vec<Value> {
    range
        .map(|i| json!({ "UserName": format!("u{i}"), "FirstName": format!("F{i}") }))
        .collect()
}

fn person(user_name: &str) -> Entity {
    Entity {
        value: json!({ "UserName": user_name, "FirstName": user_name.to_uppercase() }),
        meta: Meta::default(),
    }
}

#[tokio::test]
async fn test_get_entity_sends_protocol_headers() {
    let (client, transport) = client();
    transport.push_json(
        StatusCode::OK,
        &json!({
            "@odata.etag": "W/\"1\"",
            "UserName": "russell",
            "FirstName": "Russell"
        }),
    );

    let resource = client.entity_set("People").key("russell").unwrap();
    let entity = client.get_entity(&resource).await.unwrap().unwrap();
    assert_eq!(entity.value["FirstName"], "Russell");
    assert_eq!(entity.meta.etag.as_deref(), Some("W/\"1\""));

    let sent = transport.request(0);
    assert_eq!(sent.method, Method::GET);
    assert_eq!(sent.url, "http://localhost/trip/People('russell')");
    assert_eq!(sent.headers["odata-version"], "4.0");
    assert_eq!(sent.headers[ACCEPT], "application/json");
    assert!(sent.body.is_none());
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (client, transport) = client();
    transport.push_json(
        StatusCode::NOT_FOUND,
        &json!({ "error": { "code": "", "message": "not found" } }),
    );

    let resource = client.entity_set("People").key("nobody").unwrap();
    let err = client.get_entity(&resource).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_save_creates_then_replaces_with_etag() {
    let (client, transport) = client();
    let mut model = Model::create(client.entity_set("People"));
    assert_eq!(model.get("Age"), Some(&json!(18)));
    assert!(model.is_new());

    model.set("FirstName", json!("Kim"));
    transport.push_json(
        StatusCode::CREATED,
        &json!({
            "@odata.etag": "W/\"1\"",
            "UserName": "kim",
            "FirstName": "Kim",
            "Age": 18
        }),
    );
    model.save(&client).await.unwrap();
    assert_eq!(model.key(), Some(json!("kim")));
    assert_eq!(model.etag(), Some("W/\"1\""));

    let created = transport.request(0);
    assert_eq!(created.method, Method::POST);
    assert_eq!(created.url, "http://localhost/trip/People");
    assert_eq!(created.headers[CONTENT_TYPE], "application/json");
    let body = created.json().unwrap().unwrap();
    assert_eq!(body["FirstName"], "Kim");
    assert_eq!(body["Age"], 18);

    model.set("FirstName", json!("Kimberly"));
    transport.push_empty(StatusCode::NO_CONTENT);
    model.save(&client).await.unwrap();
    assert_eq!(model.get("FirstName"), Some(&json!("Kimberly")));

    let replaced = transport.request(1);
    assert_eq!(replaced.method, Method::PUT);
    assert_eq!(replaced.url, "http://localhost/trip/People('kim')");
    assert_eq!(replaced.headers[IF_MATCH], "W/\"1\"");

    transport.push_empty(StatusCode::NO_CONTENT);
    model.destroy(&client).await.unwrap();
    let deleted = transport.request(2);
    assert_eq!(deleted.method, Method::DELETE);
    assert_eq!(deleted.url, "http://localhost/trip/People('kim')");
    assert_eq!(deleted.headers[IF_MATCH], "W/\"1\"");
}

#[tokio::test]
async fn test_modify_sends_patch() {
    let (client, transport) = client();
    transport.push_empty(StatusCode::NO_CONTENT);

    let resource = client.entity_set("People").key("kim").unwrap();
    let answer = client
        .modify(&resource, &json!({ "FirstName": "K" }), None)
        .await
        .unwrap();
    assert!(answer.is_none());

    let sent = transport.request(0);
    assert_eq!(sent.method, Method::PATCH);
    assert!(!sent.headers.contains_key(IF_MATCH));
}

#[tokio::test]
async fn test_fetch_derives_paging_state() {
    let (client, transport) = client();
    transport.push_json(
        StatusCode::OK,
        &json!({
            "@odata.count": 37,
            "@odata.nextLink": "http://localhost/trip/People?$top=10&$skip=10",
            "value": people_page(0..10)
        }),
    );

    let mut people = Collection::new();
    people.attach(client.entity_set("People")).unwrap();
    people.set_option(QueryOption::Top(Some(10))).unwrap();
    people.fetch(&client).await.unwrap();

    let state = people.state();
    assert_eq!(state.records, Some(37));
    assert_eq!(state.size, Some(10));
    assert_eq!(state.pages, Some(4));
    assert_eq!(people.len(), 10);
    assert_eq!(query_value(&transport.request(0), "$top").as_deref(), Some("10"));

    // Members are keyed into the set they were read from.
    let first = people.iter().next().unwrap();
    assert_eq!(first.target().unwrap().path(), "People('u0')");

    people
        .set_option(QueryOption::Search(Some("russell".to_owned())))
        .unwrap();
    assert_eq!(people.state().pages, None);
}

#[tokio::test]
async fn test_all_follows_next_links() {
    let (client, transport) = client();
    transport.push_json(
        StatusCode::OK,
        &json!({
            "@odata.nextLink": "People?$skip=10",
            "value": people_page(0..10)
        }),
    );
    transport.push_json(StatusCode::OK, &json!({ "value": people_page(10..12) }));

    let mut people = Collection::new();
    people.attach(client.entity_set("People")).unwrap();
    people.all(&client).await.unwrap();

    assert_eq!(people.len(), 12);
    assert_eq!(people.state().page, Some(1));
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(query_value(&requests[0], "$skip"), None);
    assert_eq!(query_value(&requests[1], "$skip").as_deref(), Some("10"));
}

#[tokio::test]
async fn test_items_stream_across_skiptoken_pages() {
    let (client, transport) = client();
    transport.push_json(
        StatusCode::OK,
        &json!({
            "@odata.nextLink": "http://localhost/trip/People?$skiptoken=t1",
            "value": people_page(0..2)
        }),
    );
    transport.push_json(StatusCode::OK, &json!({ "value": people_page(2..3) }));

    let items: Vec<_> = client.items(&client.entity_set("People")).collect().await;
    let names: Vec<_> = items
        .into_iter()
        .map(|item| item.unwrap()["UserName"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, ["u0", "u1", "u2"]);
    assert_eq!(
        query_value(&transport.request(1), "$skiptoken").as_deref(),
        Some("t1")
    );
}

#[tokio::test]
async fn test_pages_stream_stops_after_error() {
    let (client, transport) = client();
    transport.push_json(
        StatusCode::OK,
        &json!({
            "@odata.nextLink": "People?$skip=2",
            "value": people_page(0..2)
        }),
    );
    transport.push_empty(StatusCode::INTERNAL_SERVER_ERROR);

    let mut pages = Box::pin(client.pages(&client.entity_set("People")));
    assert_eq!(pages.next().await.unwrap().unwrap().values.len(), 2);
    let err = pages.next().await.unwrap().unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(pages.next().await.is_none());
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_count_keeps_only_filter_and_search() {
    let (client, transport) = client();
    transport.push(TransportResponse::new(StatusCode::OK, "42"));

    let people = client
        .entity_set("People")
        .with_option(QueryOption::Top(Some(5)))
        .with_option(QueryOption::Filter(Some("Age gt 30".into())));
    assert_eq!(client.count(&people).await.unwrap(), 42);

    let sent = transport.request(0);
    assert_eq!(sent.url, "http://localhost/trip/People/$count");
    assert_eq!(query_value(&sent, "$filter").as_deref(), Some("Age gt 30"));
    assert_eq!(query_value(&sent, "$top"), None);
    assert_eq!(sent.headers[ACCEPT], "text/plain");
}

#[tokio::test]
async fn test_function_call_is_a_get() {
    let (client, transport) = client();
    transport.push_json(StatusCode::OK, &json!({ "Code": "SEA", "Name": "Seattle" }));

    let nearest = client
        .function("NearestAirport")
        .unwrap()
        .with_parameters(&json!({ "lat": 47.5, "lon": -122.3 }))
        .unwrap();
    let result = client.call(&nearest, ResponseShape::Model).await.unwrap();
    let CallResult::Model(Some(airport)) = result else {
        panic!("expected a model");
    };
    assert_eq!(airport.get("Name"), Some(&json!("Seattle")));
    assert_eq!(airport.target().unwrap().path(), "Airports('SEA')");

    let sent = transport.request(0);
    assert_eq!(sent.method, Method::GET);
    assert!(sent.url.starts_with("http://localhost/trip/NearestAirport("));
    assert!(sent.url.contains("lat="));
    assert!(sent.body.is_none());
}

#[tokio::test]
async fn test_collection_result_binds_to_entity_set() {
    let (client, transport) = client();
    transport.push_json(StatusCode::OK, &json!({ "value": people_page(0..2) }));

    let adults = client.function("Adults").unwrap();
    let CallResult::Collection(people) = client.call(&adults, ResponseShape::Collection).await.unwrap()
    else {
        panic!("expected a collection");
    };
    assert_eq!(people.len(), 2);
    assert_eq!(people.target().unwrap().path(), "People");
}

#[tokio::test]
async fn test_action_call_posts_parameters() {
    let (client, transport) = client();
    transport.push_empty(StatusCode::NO_CONTENT);

    let rename = client
        .action("Rename")
        .unwrap()
        .with_parameters(&json!({ "from": "a", "to": "b" }))
        .unwrap();
    let result = client.call(&rename, ResponseShape::None).await.unwrap();
    assert!(matches!(result, CallResult::None));

    let sent = transport.request(0);
    assert_eq!(sent.method, Method::POST);
    assert_eq!(sent.url, "http://localhost/trip/Rename");
    assert_eq!(sent.json().unwrap(), Some(json!({ "from": "a", "to": "b" })));
}

#[tokio::test]
async fn test_navigation_collection_links_through_ref() {
    let (client, transport) = client();
    let russell = Model::from_entity(client.entity_set("People"), &person("russell"));
    let scott = Model::from_entity(client.entity_set("People"), &person("scott"));

    let friends = russell.related_collection("Friends").unwrap();
    assert_eq!(friends.target().unwrap().path(), "People('russell')/Friends");

    transport.push_empty(StatusCode::NO_CONTENT);
    let mut member = scott.clone();
    friends.add(&client, &mut member).await.unwrap();
    let linked = transport.request(0);
    assert_eq!(linked.method, Method::POST);
    assert_eq!(linked.url, "http://localhost/trip/People('russell')/Friends/$ref");
    assert_eq!(
        linked.json().unwrap(),
        Some(json!({ "@odata.id": "http://localhost/trip/People('scott')" }))
    );

    transport.push_empty(StatusCode::NO_CONTENT);
    friends.remove(&client, &scott).await.unwrap();
    let unlinked = transport.request(1);
    assert_eq!(unlinked.method, Method::DELETE);
    assert_eq!(unlinked.url, "http://localhost/trip/People('russell')/Friends/$ref");
    assert_eq!(
        query_value(&unlinked, "$id").as_deref(),
        Some("http://localhost/trip/People('scott')")
    );

    transport.push_empty(StatusCode::NO_CONTENT);
    russell
        .set_reference(&client, "BestFriend", &scott.target().unwrap())
        .await
        .unwrap();
    let pointed = transport.request(2);
    assert_eq!(pointed.method, Method::PUT);
    assert_eq!(pointed.url, "http://localhost/trip/People('russell')/BestFriend/$ref");
}

#[tokio::test]
async fn test_entity_set_membership_saves_and_deletes() {
    let (client, transport) = client();
    let people = Collection::from_entities(
        client.entity_set("People"),
        Entities {
            values: Vec::new(),
            meta: Meta::default(),
        },
    );

    let mut newcomer = Model::new(serde_json::Map::new());
    newcomer.set("FirstName", json!("Ann"));
    transport.push_json(StatusCode::CREATED, &json!({ "UserName": "ann", "FirstName": "Ann" }));
    people.add(&client, &mut newcomer).await.unwrap();
    assert_eq!(transport.request(0).method, Method::POST);
    assert_eq!(newcomer.key(), Some(json!("ann")));

    transport.push_empty(StatusCode::NO_CONTENT);
    people.remove(&client, &newcomer).await.unwrap();
    let deleted = transport.request(1);
    assert_eq!(deleted.method, Method::DELETE);
    assert_eq!(deleted.url, "http://localhost/trip/People('ann')");

    let mut me = Collection::new();
    me.attach(client.singleton("Me")).unwrap();
    let err = me.add(&client, &mut newcomer).await.unwrap_err();
    assert!(matches!(err, ClientError::NotMutable(_)));
}

#[test]
fn test_model_keeps_its_type() {
    let (client, _transport) = client();
    let mut model = Model::from_entity(client.entity_set("People"), &person("russell"));
    let err = model.attach(client.entity_set("Airports")).unwrap_err();
    assert!(matches!(
        err,
        ClientError::ReattachType { ref attached, ref requested }
            if attached == "Trip.Person" && requested == "Trip.Airport"
    ));
    model.attach(client.entity_set("People")).unwrap();
}

#[tokio::test]
async fn test_batch_round_trip() {
    let (client, transport) = client();
    let people = client.entity_set("People");
    let batch = client
        .batch()
        .with(BatchRequest::get(people.clone().key("russell").unwrap()))
        .with(BatchRequest::post(people, json!({ "FirstName": "Ann" })));

    let body = [
        "--batchresponse_1",
        "Content-Type: application/http",
        "",
        "HTTP/1.1 200 OK",
        "Content-Type: application/json",
        "",
        r#"{"UserName":"russell"}"#,
        "--batchresponse_1",
        "Content-Type: multipart/mixed; boundary=changesetresponse_1",
        "",
        "--changesetresponse_1",
        "Content-Type: application/http",
        "Content-ID: 1",
        "",
        "HTTP/1.1 201 Created",
        "Content-Type: application/json",
        "",
        r#"{"UserName":"ann"}"#,
        "--changesetresponse_1--",
        "--batchresponse_1--",
        "",
    ]
    .join("\r\n");
    transport.push(
        TransportResponse::new(StatusCode::OK, body).with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/mixed; boundary=batchresponse_1"),
        ),
    );

    let results = client.execute_batch(&batch).await.unwrap();
    assert_eq!(results.len(), 2);
    let read = results[0].as_ref().unwrap();
    assert_eq!(read.status, StatusCode::OK);
    let created = results[1].as_ref().unwrap();
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json().unwrap(), Some(json!({ "UserName": "ann" })));

    let sent = transport.request(0);
    assert_eq!(sent.method, Method::POST);
    assert_eq!(sent.url, "http://localhost/trip/$batch");
    assert_eq!(sent.headers["odata-version"], "4.0");
    assert_eq!(sent.headers[ACCEPT], "multipart/mixed");
    let content_type = sent.headers[CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("multipart/mixed"));
    assert!(content_type.contains(batch.boundary()));
}

#[tokio::test]
async fn test_empty_batch_sends_nothing() {
    let (client, transport) = client();
    let results = client.execute_batch(&client.batch()).await.unwrap();
    assert!(results.is_empty());
    assert!(transport.requests().is_empty());
}

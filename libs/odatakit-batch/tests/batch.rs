//! Wire layout of encoded batches and decoding of batch responses.

mod common;

use common::{crlf, product, products};
use http::header::IF_MATCH;
use http::{HeaderValue, StatusCode};
use odatakit_batch::{Batch, BatchError, BatchRequest, ChangesetMember, EncodedBatch, PartGroup};
use serde_json::json;

fn mixed_queue() -> EncodedBatch {
    Batch::new()
        .with(BatchRequest::get(product(1)))
        .with(BatchRequest::post(products(), json!({ "Id": 2, "Name": "b" })))
        .with(BatchRequest::post(products(), json!({ "Id": 3, "Name": "c" })))
        .with(BatchRequest::get(product(4)))
        .encode()
}

fn changeset_boundary(encoded: &EncodedBatch) -> String {
    encoded
        .groups()
        .iter()
        .find_map(|group| match group {
            PartGroup::Changeset { boundary, .. } => Some(boundary.clone()),
            PartGroup::Single { .. } => None,
        })
        .unwrap()
}

#[test]
fn test_writes_between_reads_share_one_changeset() {
    let encoded = mixed_queue();
    let batch = encoded.boundary().to_owned();
    let changeset = changeset_boundary(&encoded);
    assert!(changeset.starts_with("changeset_"));

    assert_eq!(
        encoded.groups(),
        &[
            PartGroup::Single { index: 0 },
            PartGroup::Changeset {
                boundary: changeset.clone(),
                members: vec![
                    ChangesetMember { index: 1, content_id: 1 },
                    ChangesetMember { index: 2, content_id: 2 },
                ],
            },
            PartGroup::Single { index: 3 },
        ]
    );
    assert_eq!(encoded.content_id_of(2), Some(2));
    assert_eq!(encoded.content_id_of(3), None);

    let open = format!("--{batch}");
    let close = format!("--{batch}--");
    let cs_open = format!("--{changeset}");
    let cs_close = format!("--{changeset}--");
    let cs_type = format!("Content-Type: multipart/mixed;boundary={changeset}");
    let expected = crlf(&[
        &open,
        "Content-Type: application/http",
        "Content-Transfer-Encoding: binary",
        "",
        "GET Products(1) HTTP/1.1",
        "",
        "",
        &open,
        &cs_type,
        "",
        &cs_open,
        "Content-Type: application/http",
        "Content-Transfer-Encoding: binary",
        "Content-ID: 1",
        "",
        "POST Products HTTP/1.1",
        "Content-Type: application/json",
        "",
        r#"{"Id":2,"Name":"b"}"#,
        &cs_open,
        "Content-Type: application/http",
        "Content-Transfer-Encoding: binary",
        "Content-ID: 2",
        "",
        "POST Products HTTP/1.1",
        "Content-Type: application/json",
        "",
        r#"{"Id":3,"Name":"c"}"#,
        &cs_close,
        &open,
        "Content-Type: application/http",
        "Content-Transfer-Encoding: binary",
        "",
        "GET Products(4) HTTP/1.1",
        "",
        "",
        &close,
    ]);
    assert_eq!(encoded.body(), expected);
}

#[test]
fn test_put_and_delete_parts() {
    let encoded = Batch::new()
        .with(BatchRequest::put(product(1), json!({ "Id": 1, "Name": "a" })))
        .with(
            BatchRequest::delete(product(2)).with_header(IF_MATCH, HeaderValue::from_static("*")),
        )
        .encode();
    let body = encoded.body();
    assert!(body.contains(&crlf(&[
        "Content-ID: 1",
        "",
        "PUT Products(1) HTTP/1.1",
        "Content-Type: application/json",
        "",
        r#"{"Id":1,"Name":"a"}"#,
    ])));
    assert!(body.contains(&crlf(&[
        "Content-ID: 2",
        "",
        "DELETE Products(2) HTTP/1.1",
        "if-match: *",
        "",
        "",
    ])));
    assert_eq!(encoded.groups().len(), 1);
    assert!(body.ends_with(&format!("--{}--\r\n", encoded.boundary())));
}

#[test]
fn test_query_travels_with_target() {
    let filtered = products().with_option(odatakit_resource::QueryOption::Top(Some(2)));
    let encoded = Batch::new().with(BatchRequest::get(filtered)).encode();
    assert!(encoded.body().contains("GET Products?$top=2 HTTP/1.1\r\n"));
}

#[test]
fn test_empty_queue() {
    let batch = Batch::new();
    assert!(batch.is_empty());
    let encoded = batch.encode();
    assert_eq!(encoded.body(), "");
    assert_eq!(
        encoded.decode(&encoded.content_type(), "").unwrap_err(),
        BatchError::Malformed(format!("missing closing delimiter for `{}`", encoded.boundary()))
    );
}

const RESPONSE_TYPE: &str = "multipart/mixed; boundary=batchresponse_1";

fn http_part(content_id: Option<u32>, status_line: &str, body: &str) -> String {
    let mut lines = vec![
        "Content-Type: application/http".to_owned(),
        "Content-Transfer-Encoding: binary".to_owned(),
    ];
    if let Some(id) = content_id {
        lines.push(format!("Content-ID: {id}"));
    }
    lines.push(String::new());
    lines.push(status_line.to_owned());
    if !body.is_empty() {
        lines.push("Content-Type: application/json".to_owned());
    }
    lines.push(String::new());
    lines.push(body.to_owned());
    lines.join("\r\n")
}

fn envelope(parts: &[String]) -> String {
    let mut lines = Vec::new();
    for part in parts {
        lines.push("--batchresponse_1".to_owned());
        lines.push(part.clone());
    }
    lines.push("--batchresponse_1--".to_owned());
    lines.push(String::new());
    lines.join("\r\n")
}

fn changeset(parts: &[String]) -> String {
    let mut lines = vec![
        "Content-Type: multipart/mixed; boundary=changesetresponse_1".to_owned(),
        String::new(),
    ];
    for part in parts {
        lines.push("--changesetresponse_1".to_owned());
        lines.push(part.clone());
    }
    lines.push("--changesetresponse_1--".to_owned());
    lines.join("\r\n")
}

#[test]
fn test_failed_changeset_member_does_not_hide_others() {
    let encoded = mixed_queue();
    let body = envelope(&[
        http_part(None, "HTTP/1.1 200 OK", r#"{"Id":1,"Name":"a"}"#),
        changeset(&[
            http_part(Some(2), "HTTP/1.1 400 Bad Request", r#"{"error":{"code":"dup"}}"#),
            http_part(Some(1), "HTTP/1.1 201 Created", r#"{"Id":2,"Name":"b"}"#),
        ]),
        http_part(None, "HTTP/1.1 404 Not Found", ""),
    ]);

    let results = encoded.decode(RESPONSE_TYPE, &body).unwrap();
    assert_eq!(results.len(), 4);

    let first = results[0].as_ref().unwrap();
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.json().unwrap(), Some(json!({ "Id": 1, "Name": "a" })));

    let created = results[1].as_ref().unwrap();
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.content_id, Some(1));

    let rejected = results[2].as_ref().unwrap();
    assert!(!rejected.is_success());
    assert_eq!(rejected.json().unwrap(), Some(json!({ "error": { "code": "dup" } })));

    let missing = results[3].as_ref().unwrap();
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json().unwrap(), None);
}

#[test]
fn test_whole_changeset_failure_reaches_every_member() {
    let encoded = mixed_queue();
    let body = envelope(&[
        http_part(None, "HTTP/1.1 200 OK", "{}"),
        http_part(None, "HTTP/1.1 500 Internal Server Error", r#"{"error":{}}"#),
        http_part(None, "HTTP/1.1 200 OK", "{}"),
    ]);
    let results = encoded.decode(RESPONSE_TYPE, &body).unwrap();
    for index in [1, 2] {
        assert_eq!(
            results[index].as_ref().unwrap().status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
    assert!(results[3].as_ref().unwrap().is_success());
}

#[test]
fn test_missing_parts_are_reported_per_request() {
    let encoded = mixed_queue();
    let body = envelope(&[http_part(None, "HTTP/1.1 200 OK", "{}")]);
    let results = encoded.decode(RESPONSE_TYPE, &body).unwrap();
    assert!(results[0].is_ok());
    for (index, result) in results.iter().enumerate().skip(1) {
        assert_eq!(result, &Err(BatchError::MissingResponse { index }));
    }
}

#[test]
fn test_changeset_in_place_of_read() {
    let encoded = Batch::new().with(BatchRequest::get(product(1))).encode();
    let body = envelope(&[changeset(&[http_part(Some(1), "HTTP/1.1 200 OK", "{}")])]);
    let results = encoded.decode(RESPONSE_TYPE, &body).unwrap();
    assert_eq!(results, vec![Err(BatchError::UnexpectedChangeset { index: 0 })]);
}

#[test]
fn test_missing_boundary_fails_the_envelope() {
    let encoded = mixed_queue();
    assert_eq!(
        encoded.decode("application/json", "{}").unwrap_err(),
        BatchError::MissingBoundary("application/json".to_owned())
    );
}

#[test]
fn test_bad_status_line_stays_in_its_slot() {
    let encoded = Batch::new()
        .with(BatchRequest::get(product(1)))
        .with(BatchRequest::get(product(2)))
        .encode();
    let body = envelope(&[
        http_part(None, "HTP 200", "{}"),
        http_part(None, "HTTP/1.1 200 OK", "{}"),
    ]);
    let results = encoded.decode(RESPONSE_TYPE, &body).unwrap();
    assert_eq!(results[0], Err(BatchError::InvalidStatusLine("HTP 200".to_owned())));
    assert!(results[1].is_ok());
}

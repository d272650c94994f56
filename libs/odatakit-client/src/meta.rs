//! Response annotations: the `@odata.*` control information of a payload plus
//! the headers that carry the same facts.

use http::HeaderMap;
use http::header::ETAG;
use serde_json::{Map, Value};
use url::Url;

pub const ODATA_ETAG: &str = "@odata.etag";
pub const ODATA_ID: &str = "@odata.id";
pub const ODATA_CONTEXT: &str = "@odata.context";
pub const ODATA_TYPE: &str = "@odata.type";
pub const ODATA_COUNT: &str = "@odata.count";
pub const ODATA_NEXT_LINK: &str = "@odata.nextLink";
pub const ODATA_DELTA_LINK: &str = "@odata.deltaLink";
pub const VALUE: &str = "value";

const SKIP: &str = "$skip";
const SKIPTOKEN: &str = "$skiptoken";

/// Annotations of one response or one embedded entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub etag: Option<String>,
    pub id: Option<String>,
    pub context: Option<String>,
    /// Qualified type name without the leading `#`.
    pub type_name: Option<String>,
    pub count: Option<u64>,
    pub next_link: Option<String>,
    /// `$skip` carried by the next link.
    pub skip: Option<u64>,
    /// `$skiptoken` carried by the next link.
    pub skiptoken: Option<String>,
    pub delta_link: Option<String>,
}

impl Meta {
    /// Annotations embedded in a payload object. Non-objects carry none.
    #[must_use]
    pub fn from_body(body: &Value) -> Self {
        let Some(obj) = body.as_object() else {
            return Self::default();
        };
        let text = |name: &str| obj.get(name).and_then(Value::as_str).map(ToOwned::to_owned);
        let next_link = text(ODATA_NEXT_LINK);
        let (skip, skiptoken) = next_link.as_deref().map(paging_of).unwrap_or_default();
        Self {
            etag: text(ODATA_ETAG),
            id: text(ODATA_ID),
            context: text(ODATA_CONTEXT),
            type_name: text(ODATA_TYPE).map(|t| t.trim_start_matches('#').to_owned()),
            count: obj.get(ODATA_COUNT).and_then(count_of),
            next_link,
            skip,
            skiptoken,
            delta_link: text(ODATA_DELTA_LINK),
        }
    }

    /// Body annotations with the `ETag` header as fallback for the entity tag.
    #[must_use]
    pub fn from_response(headers: &HeaderMap, body: &Value) -> Self {
        let mut meta = Self::from_body(body);
        if meta.etag.is_none() {
            meta.etag = headers
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned);
        }
        meta
    }

    /// Whether the server announced another page.
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.skip.is_some() || self.skiptoken.is_some()
    }
}

/// Copy of an object without its `@`-prefixed control information.
#[must_use]
pub fn strip_annotations(value: &Value) -> Value {
    match value.as_object() {
        Some(obj) => Value::Object(
            obj.iter()
                .filter(|(k, _)| !is_annotation(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        ),
        None => value.clone(),
    }
}

fn is_annotation(name: &str) -> bool {
    name.starts_with('@') || name.contains("@odata.")
}

/// Counts arrive as numbers, or as strings when IEEE754 compatibility is on.
fn count_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// `$skip` and `$skiptoken` of a next link, which may be relative.
fn paging_of(link: &str) -> (Option<u64>, Option<String>) {
    let parsed = Url::parse(link).or_else(|_| {
        Url::parse("http://localhost/").and_then(|base| base.join(link))
    });
    let Ok(url) = parsed else {
        return (None, None);
    };
    let mut skip = None;
    let mut skiptoken = None;
    for (name, value) in url.query_pairs() {
        match &*name {
            SKIP => skip = value.parse().ok(),
            SKIPTOKEN => skiptoken = Some(value.into_owned()),
            _ => {}
        }
    }
    (skip, skiptoken)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_entity_set_annotations() {
        let meta = Meta::from_body(&json!({
            "@odata.context": "http://localhost/$metadata#People",
            "@odata.count": 37,
            "@odata.nextLink": "http://localhost/People?%24skip=10",
            "value": []
        }));
        assert_eq!(meta.count, Some(37));
        assert_eq!(meta.skip, Some(10));
        assert!(meta.skiptoken.is_none());
        assert!(meta.has_next_page());
        assert_eq!(meta.context.as_deref(), Some("http://localhost/$metadata#People"));
    }

    #[test]
    fn test_relative_next_link_with_skiptoken() {
        let meta = Meta::from_body(&json!({
            "@odata.count": "12",
            "@odata.nextLink": "People?$skiptoken=abc%3D%3D&$top=5"
        }));
        assert_eq!(meta.count, Some(12));
        assert_eq!(meta.skiptoken.as_deref(), Some("abc=="));
        assert!(meta.skip.is_none());
    }

    #[test]
    fn test_entity_annotations_and_etag_header() {
        let body = json!({
            "@odata.type": "#Trip.Employee",
            "@odata.id": "http://localhost/People('a')",
            "UserName": "a"
        });
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_static("W/\"1\""));
        let meta = Meta::from_response(&headers, &body);
        assert_eq!(meta.type_name.as_deref(), Some("Trip.Employee"));
        assert_eq!(meta.etag.as_deref(), Some("W/\"1\""));
        assert!(!meta.has_next_page());

        let embedded = Meta::from_response(&headers, &json!({ "@odata.etag": "W/\"2\"" }));
        assert_eq!(embedded.etag.as_deref(), Some("W/\"2\""));
    }

    #[test]
    fn test_strip_annotations() {
        let value = json!({
            "@odata.etag": "x",
            "Friends@odata.navigationLink": "People('a')/Friends",
            "UserName": "a"
        });
        assert_eq!(strip_annotations(&value), json!({ "UserName": "a" }));
        assert_eq!(strip_annotations(&json!(5)), json!(5));
    }
}

//! Splitting a `$batch` response back into per-request results.

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use mime::Mime;
use serde_json::Value;
use tracing::{debug, warn};

use crate::encode::{ChangesetMember, EncodedBatch, PartGroup};
use crate::error::BatchError;

const CONTENT_ID: &str = "content-id";

/// One decoded sub-response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubResponse {
    pub content_id: Option<u32>,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl SubResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body parsed as JSON; `None` when the body is empty.
    ///
    /// # Errors
    /// Returns the parse error for a non-empty body that is not JSON.
    pub fn json(&self) -> Result<Option<Value>, serde_json::Error> {
        let body = self.body.trim();
        if body.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(body).map(Some)
    }
}

pub type SubResult = Result<SubResponse, BatchError>;

/// Top-level part of a batch response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    Single(SubResult),
    Changeset(Vec<SubResult>),
}

/// Boundary parameter of a `multipart/*` content type.
///
/// # Errors
/// `BatchError::MissingBoundary` for non-multipart types or a missing parameter.
pub fn boundary_of(content_type: &str) -> Result<String, BatchError> {
    let missing = || BatchError::MissingBoundary(content_type.to_owned());
    let parsed: Mime = content_type.parse().map_err(|_| missing())?;
    if parsed.type_() != mime::MULTIPART {
        return Err(missing());
    }
    parsed
        .get_param(mime::BOUNDARY)
        .map(|b| b.as_str().to_owned())
        .ok_or_else(missing)
}

/// Split a multipart body into its raw parts.
///
/// # Errors
/// `BatchError::Malformed` when the opening or closing delimiter is absent.
pub fn split_parts<'a>(body: &'a str, boundary: &str) -> Result<Vec<&'a str>, BatchError> {
    let delimiter = format!("--{boundary}");
    let mut chunks = body.split(delimiter.as_str());
    chunks.next();
    let mut parts = Vec::new();
    for chunk in chunks {
        if chunk.starts_with("--") {
            return Ok(parts);
        }
        parts.push(trim_line_breaks(chunk));
    }
    Err(BatchError::Malformed(format!(
        "missing closing delimiter for `{boundary}`"
    )))
}

/// Parse every top-level part of a batch response body.
///
/// # Errors
/// Envelope errors only; problems inside one part are reported in that part.
pub fn parse_response(content_type: &str, body: &str) -> Result<Vec<ResponsePart>, BatchError> {
    let boundary = boundary_of(content_type)?;
    let parts = split_parts(body, &boundary)?;
    debug!(parts = parts.len(), "batch response split");
    Ok(parts.into_iter().map(parse_part).collect())
}

fn parse_part(raw: &str) -> ResponsePart {
    let (head, rest) = split_head(raw);
    let headers = match parse_headers(head) {
        Ok(headers) => headers,
        Err(err) => return ResponsePart::Single(Err(err)),
    };
    let content_type = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type.starts_with(crate::encode::MULTIPART_MIXED) {
        let nested = boundary_of(content_type).and_then(|boundary| split_parts(rest, &boundary));
        return match nested {
            Ok(parts) => ResponsePart::Changeset(
                parts
                    .into_iter()
                    .map(|part| {
                        let (head, rest) = split_head(part);
                        parse_headers(head).and_then(|h| parse_http(&h, rest))
                    })
                    .collect(),
            ),
            Err(err) => ResponsePart::Single(Err(err)),
        };
    }
    ResponsePart::Single(parse_http(&headers, rest))
}

fn parse_http(part_headers: &HeaderMap, message: &str) -> SubResult {
    let content_id = part_headers
        .get(CONTENT_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    let (head, body) = split_head(message);
    let mut lines = head.lines();
    let status_line = lines.next().unwrap_or_default();
    let status = parse_status(status_line)?;
    let headers = parse_headers(&lines.collect::<Vec<_>>().join("\n"))?;
    Ok(SubResponse {
        content_id,
        status,
        headers,
        body: body.to_owned(),
    })
}

fn parse_status(line: &str) -> Result<StatusCode, BatchError> {
    let invalid = || BatchError::InvalidStatusLine(line.to_owned());
    let mut words = line.split_whitespace();
    let version = words.next().ok_or_else(invalid)?;
    if !version.starts_with("HTTP/") {
        return Err(invalid());
    }
    let code = words.next().ok_or_else(invalid)?;
    StatusCode::from_bytes(code.as_bytes()).map_err(|_| invalid())
}

fn parse_headers(head: &str) -> Result<HeaderMap, BatchError> {
    let mut headers = HeaderMap::new();
    for line in head.lines().filter(|l| !l.trim().is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| BatchError::Malformed(format!("header line `{line}`")))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| BatchError::Malformed(format!("header name `{name}`")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| BatchError::Malformed(format!("header value for `{name}`")))?;
        headers.append(name, value);
    }
    Ok(headers)
}

/// Split at the first blank line into header block and remainder.
fn split_head(text: &str) -> (&str, &str) {
    if let Some((head, rest)) = text.split_once("\r\n\r\n") {
        return (head, rest);
    }
    text.split_once("\n\n").unwrap_or((text, ""))
}

fn trim_line_breaks(chunk: &str) -> &str {
    let chunk = chunk
        .strip_prefix("\r\n")
        .or_else(|| chunk.strip_prefix('\n'))
        .unwrap_or(chunk);
    chunk
        .strip_suffix("\r\n")
        .or_else(|| chunk.strip_suffix('\n'))
        .unwrap_or(chunk)
}

impl EncodedBatch {
    /// Decode the response to this batch into one result per request, in
    /// request order.
    ///
    /// Sub-responses inside a changeset are matched by Content-ID, falling back
    /// to position. A single response where a changeset was expected is the
    /// server reporting the whole changeset failed, so it is delivered to every
    /// member. Failures never hide the results of other requests.
    ///
    /// # Errors
    /// Only when the envelope itself cannot be read.
    pub fn decode(&self, content_type: &str, body: &str) -> Result<Vec<SubResult>, BatchError> {
        let mut slots: Vec<Option<SubResult>> = vec![None; self.request_count()];
        let mut parts = parse_response(content_type, body)?.into_iter();
        for group in self.groups() {
            let Some(part) = parts.next() else {
                break;
            };
            match (group, part) {
                (PartGroup::Single { index }, ResponsePart::Single(result)) => {
                    fill(&mut slots, *index, result);
                }
                (PartGroup::Single { index }, ResponsePart::Changeset(_)) => {
                    let unexpected = BatchError::UnexpectedChangeset { index: *index };
                    fill(&mut slots, *index, Err(unexpected));
                }
                (PartGroup::Changeset { members, .. }, ResponsePart::Single(result)) => {
                    for member in members {
                        fill(&mut slots, member.index, result.clone());
                    }
                }
                (PartGroup::Changeset { members, .. }, ResponsePart::Changeset(results)) => {
                    assign_changeset(members, results, &mut slots);
                }
            }
        }
        let extra = parts.count();
        if extra > 0 {
            warn!(extra, "batch response has more parts than requests");
        }
        Ok(slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.unwrap_or(Err(BatchError::MissingResponse { index })))
            .collect())
    }
}

fn assign_changeset(
    members: &[ChangesetMember],
    results: Vec<SubResult>,
    slots: &mut [Option<SubResult>],
) {
    for (position, result) in results.into_iter().enumerate() {
        let by_id = result
            .as_ref()
            .ok()
            .and_then(|r| r.content_id)
            .and_then(|id| members.iter().find(|m| m.content_id == id));
        let member = by_id.or_else(|| members.get(position));
        match member {
            Some(member) if slots.get(member.index).is_some_and(Option::is_none) => {
                fill(slots, member.index, result);
            }
            _ => warn!(position, "changeset sub-response matches no request"),
        }
    }
}

fn fill(slots: &mut [Option<SubResult>], index: usize, result: SubResult) {
    if let Some(slot) = slots.get_mut(index) {
        *slot = Some(result);
    }
}

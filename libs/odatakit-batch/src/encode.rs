//! `multipart/mixed` encoding of a request queue.

use http::header::CONTENT_TYPE;
use tracing::debug;
use uuid::Uuid;

use crate::request::BatchRequest;

pub const CRLF: &str = "\r\n";
pub const BATCH_PREFIX: &str = "batch_";
pub const CHANGESET_PREFIX: &str = "changeset_";
pub const MULTIPART_MIXED: &str = "multipart/mixed";

/// A changeset member: request position and the Content-ID it was sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangesetMember {
    pub index: usize,
    pub content_id: u32,
}

/// How requests were laid out on the wire, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartGroup {
    /// A read sent directly inside the batch boundary.
    Single { index: usize },
    /// Consecutive writes wrapped in one changeset.
    Changeset {
        boundary: String,
        members: Vec<ChangesetMember>,
    },
}

/// Ordered queue of sub-requests sharing one batch boundary.
///
/// Not meant for concurrent population: push from one place, then encode.
#[derive(Debug, Clone)]
pub struct Batch {
    boundary: String,
    requests: Vec<BatchRequest>,
}

impl Default for Batch {
    fn default() -> Self {
        Self::new()
    }
}

impl Batch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            boundary: format!("{BATCH_PREFIX}{}", Uuid::new_v4()),
            requests: Vec::new(),
        }
    }

    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `multipart/mixed;boundary=batch_...`
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("{MULTIPART_MIXED};boundary={}", self.boundary)
    }

    pub fn push(&mut self, request: BatchRequest) {
        self.requests.push(request);
    }

    #[must_use]
    pub fn with(mut self, request: BatchRequest) -> Self {
        self.push(request);
        self
    }

    #[must_use]
    pub fn requests(&self) -> &[BatchRequest] {
        &self.requests
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Encode the queue. An empty queue yields an empty body.
    ///
    /// Writes are grouped into changesets, a read closes any open changeset,
    /// and Content-IDs count up from 1 across the whole batch.
    #[must_use]
    pub fn encode(&self) -> EncodedBatch {
        let mut encoder = Encoder::new(&self.boundary);
        for (index, request) in self.requests.iter().enumerate() {
            encoder.request(index, request);
        }
        encoder.finish(self.requests.len())
    }
}

/// Wire body plus the layout needed to match responses back to requests.
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    boundary: String,
    body: String,
    groups: Vec<PartGroup>,
    request_count: usize,
}

impl EncodedBatch {
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    #[must_use]
    pub fn content_type(&self) -> String {
        format!("{MULTIPART_MIXED};boundary={}", self.boundary)
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn groups(&self) -> &[PartGroup] {
        &self.groups
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count
    }

    #[must_use]
    pub fn content_id_of(&self, index: usize) -> Option<u32> {
        self.groups.iter().find_map(|group| match group {
            PartGroup::Changeset { members, .. } => members
                .iter()
                .find(|m| m.index == index)
                .map(|m| m.content_id),
            PartGroup::Single { .. } => None,
        })
    }
}

struct Encoder<'b> {
    batch_boundary: &'b str,
    changeset: Option<String>,
    next_content_id: u32,
    out: String,
    groups: Vec<PartGroup>,
}

impl<'b> Encoder<'b> {
    fn new(batch_boundary: &'b str) -> Self {
        Self {
            batch_boundary,
            changeset: None,
            next_content_id: 1,
            out: String::new(),
            groups: Vec::new(),
        }
    }

    fn line(&mut self, parts: &[&str]) {
        for part in parts {
            self.out.push_str(part);
        }
        self.out.push_str(CRLF);
    }

    fn close_changeset(&mut self) {
        if let Some(boundary) = self.changeset.take() {
            self.line(&["--", &boundary, "--"]);
        }
    }

    fn open_changeset(&mut self) -> String {
        let boundary = format!("{CHANGESET_PREFIX}{}", Uuid::new_v4());
        self.line(&["Content-Type: ", MULTIPART_MIXED, ";boundary=", &boundary]);
        self.line(&[]);
        self.groups.push(PartGroup::Changeset {
            boundary: boundary.clone(),
            members: Vec::new(),
        });
        self.changeset = Some(boundary.clone());
        boundary
    }

    fn request(&mut self, index: usize, request: &BatchRequest) {
        if request.is_read() {
            self.close_changeset();
        }
        if self.changeset.is_none() {
            self.line(&["--", self.batch_boundary]);
        }

        let content_id = if request.is_read() {
            self.groups.push(PartGroup::Single { index });
            None
        } else {
            let boundary = match self.changeset.clone() {
                Some(open) => open,
                None => self.open_changeset(),
            };
            self.line(&["--", &boundary]);
            let content_id = self.next_content_id;
            self.next_content_id += 1;
            if let Some(PartGroup::Changeset { members, .. }) = self.groups.last_mut() {
                members.push(ChangesetMember { index, content_id });
            }
            Some(content_id)
        };

        self.line(&["Content-Type: application/http"]);
        self.line(&["Content-Transfer-Encoding: binary"]);
        if let Some(id) = content_id {
            self.line(&["Content-ID: ", &id.to_string()]);
        }
        self.line(&[]);

        let method = request.method.to_string();
        self.line(&[&method, " ", &request.target(), " HTTP/1.1"]);
        if request.has_body() && !request.headers.contains_key(CONTENT_TYPE) {
            self.line(&["Content-Type: ", mime::APPLICATION_JSON.as_ref()]);
        }
        for (name, value) in &request.headers {
            self.line(&[name.as_str(), ": ", &String::from_utf8_lossy(value.as_bytes())]);
        }
        self.line(&[]);

        if request.has_body() {
            let body = request.body.as_ref().map(ToString::to_string).unwrap_or_default();
            self.line(&[&body]);
        } else {
            self.line(&[]);
        }
    }

    fn finish(mut self, request_count: usize) -> EncodedBatch {
        if !self.groups.is_empty() {
            self.close_changeset();
            self.line(&["--", self.batch_boundary, "--"]);
        }
        let changesets = self
            .groups
            .iter()
            .filter(|g| matches!(g, PartGroup::Changeset { .. }))
            .count();
        debug!(requests = request_count, changesets, "batch encoded");
        EncodedBatch {
            boundary: self.batch_boundary.to_owned(),
            body: self.out,
            groups: self.groups,
            request_count,
        }
    }
}

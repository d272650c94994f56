#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! # `odatakit-client` - talking to `OData` services
//!
//! [`ODataClient`] builds [`Resource`](odatakit_resource::Resource)s from the
//! configured APIs and executes them through a [`Transport`]: entity and
//! collection reads, create/update/delete with `If-Match`, function and
//! action calls, `$ref` links, lazy paging streams and `$batch`.
//!
//! [`Model`] and [`Collection`] hold decoded entities together with the
//! resource they came from, so they can be refetched, saved or navigated.
//! Neither stores the client; their I/O methods borrow it.
//!
//! ```rust,ignore
//! let client = ODataClient::new(settings, transport);
//! let mut people = Collection::new();
//! people.attach(client.entity_set("People"))?;
//! people.set_option(QueryOption::Top(Some(10)))?;
//! people.fetch(&client).await?;
//! ```

pub mod client;
pub mod collection;
pub mod error;
pub mod meta;
pub mod model;
pub mod pager;
pub mod response;
pub mod transport;

pub use client::ODataClient;
pub use collection::{Collection, PagingState};
pub use error::ClientError;
pub use meta::{Meta, strip_annotations};
pub use model::Model;
pub use pager::{ItemsPager, PagesPager, next_page};
pub use response::{CallResult, Entities, Entity, ODataResponse, Property, ResponseShape};
pub use transport::{ResponseKind, Transport, TransportRequest, TransportResponse};

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! # `odatakit-batch` - `OData` `$batch` over `multipart/mixed`
//!
//! A [`Batch`] is an ordered queue of [`BatchRequest`]s. Encoding lays reads
//! out directly under the batch boundary and groups consecutive writes into
//! changesets, numbering them with Content-IDs. The resulting
//! [`EncodedBatch`] remembers that layout so the response can be decoded back
//! into one result per request, in request order.

pub mod decode;
pub mod encode;
pub mod error;
pub mod request;

pub use decode::{ResponsePart, SubResponse, SubResult, boundary_of, parse_response};
pub use encode::{Batch, ChangesetMember, EncodedBatch, PartGroup};
pub use error::BatchError;
pub use request::BatchRequest;

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! # `odatakit-resource` - request addressing for `OData` v4
//!
//! A [`Resource`] is an ordered, protocol-legal list of path segments plus a
//! set of query options. It renders to a path relative to the service root and
//! to an ordered list of query parameters.
//!
//! ```rust,ignore
//! let friends = Resource::entity_set(api, "People")
//!     .key("russellwhyte")?
//!     .navigation_property("Friends")?
//!     .with_option(QueryOption::Top(Some(5)));
//! assert_eq!(friends.path(), "People('russellwhyte')/Friends");
//! ```
//!
//! `$filter` expressions can be written as text or built with typed
//! [`FieldRef`]s and a [`QueryBuilder`].

pub mod ast;
pub mod builder;
pub mod error;
pub mod literal;
pub mod order;
pub mod query;
pub mod resource;
pub mod schema;
pub mod segment;

pub use ast::{CompareOperator, Expr};
pub use builder::QueryBuilder;
pub use error::ResourceError;
pub use order::{ODataOrderBy, OrderKey, SortDir};
pub use query::{Expand, Filter, QueryOption, QueryOptionName, QueryOptions};
pub use resource::Resource;
pub use schema::{FieldRef, IntoODataValue, Schema};
pub use segment::{PathSegment, SegmentKind};

//! Typed query builder
//!
//! Produces [`QueryOptions`] from typed field references, ready to be
//! attached to a [`crate::Resource`].
//!
//! # Example
//!
//! ```rust,ignore
//! const USER_NAME: FieldRef<PersonSchema, String> = FieldRef::new(PersonField::UserName);
//! const AGE: FieldRef<PersonSchema, i32> = FieldRef::new(PersonField::Age);
//!
//! let options = QueryBuilder::<PersonSchema>::new()
//!     .filter(AGE.gt(18).and(USER_NAME.contains("john")))
//!     .order_by(USER_NAME, SortDir::Asc)
//!     .page_size(50)
//!     .build();
//! let people = people.with_query(options);
//! ```

use crate::ast::Expr;
use crate::order::{ODataOrderBy, OrderKey, SortDir};
use crate::query::{Expand, Filter, QueryOptions};
use crate::schema::{AsFieldName, Schema};
use std::marker::PhantomData;

pub struct QueryBuilder<S: Schema> {
    filter: Option<Expr>,
    order: Vec<OrderKey>,
    select: Vec<&'static str>,
    expand: Vec<Expand>,
    search: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    count: Option<bool>,
    _phantom: PhantomData<S>,
}

impl<S: Schema> QueryBuilder<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            filter: None,
            order: Vec::new(),
            select: Vec::new(),
            expand: Vec::new(),
            search: None,
            limit: None,
            offset: None,
            count: None,
            _phantom: PhantomData,
        }
    }

    /// Set the filter; a second call combines both with `and`.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Add a sort key; may be called repeatedly.
    #[must_use]
    pub fn order_by<F>(mut self, field: F, dir: SortDir) -> Self
    where
        F: AsFieldName,
    {
        self.order.push(OrderKey {
            field: field.as_field_name().to_owned(),
            dir,
        });
        self
    }

    /// Field projection.
    ///
    /// ```rust,ignore
    /// builder.select([USER_NAME, EMAIL])
    /// ```
    #[must_use]
    pub fn select<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsFieldName,
    {
        self.select = fields.into_iter().map(|f| f.as_field_name()).collect();
        self
    }

    /// Expand a navigation property with nested options built by another builder.
    #[must_use]
    pub fn expand<F>(mut self, field: F, options: QueryOptions) -> Self
    where
        F: AsFieldName,
    {
        self.expand
            .push(Expand::new(field.as_field_name()).with_options(options));
        self
    }

    #[must_use]
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// `$top`
    #[must_use]
    pub fn page_size(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// `$skip`
    #[must_use]
    pub fn skip(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn with_count(mut self) -> Self {
        self.count = Some(true);
        self
    }

    #[must_use]
    pub fn build(self) -> QueryOptions {
        QueryOptions {
            select: self.select.into_iter().map(ToOwned::to_owned).collect(),
            expand: self.expand,
            filter: self.filter.map(Filter::Expr),
            search: self.search,
            order_by: ODataOrderBy(self.order),
            top: self.limit,
            skip: self.offset,
            count: self.count,
            ..QueryOptions::default()
        }
    }
}

impl<S: Schema> Default for QueryBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

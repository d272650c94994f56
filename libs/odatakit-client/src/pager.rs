//! Lazy paging over entity sets.
//!
//! [`PagesPager`] turns a page-fetching function into a `Stream` of pages,
//! following the `$skip`/`$skiptoken` of each next link until a page carries
//! neither. [`ItemsPager`] flattens such a stream into single entities.
//! Pages are fetched one after another, never concurrently, and only when
//! polled; dropping the stream cancels the fetch in flight.
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//!
//! let mut people = client.items(&client.entity_set("People"));
//! while let Some(person) = people.next().await {
//!     println!("{}", person?["UserName"]);
//! }
//! ```

use futures_core::Stream;
use odatakit_resource::{QueryOption, Resource};
use pin_project_lite::pin_project;
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tracing::debug;

use crate::error::ClientError;
use crate::meta::Meta;
use crate::response::Entities;

/// Resource for the page after the one described by `meta`, if any.
#[must_use]
pub fn next_page(base: &Resource, meta: &Meta) -> Option<Resource> {
    if !meta.has_next_page() {
        return None;
    }
    let mut next = base.clone();
    if let Some(skip) = meta.skip {
        next.set_option(QueryOption::Skip(Some(skip)));
    }
    if let Some(token) = &meta.skiptoken {
        next.set_option(QueryOption::SkipToken(Some(token.clone())));
    }
    Some(next)
}

pin_project! {
    /// Stream of entity-set pages.
    pub struct PagesPager<F, Fut>
    where
        F: FnMut(Resource) -> Fut,
        Fut: Future<Output = Result<Entities, ClientError>>,
    {
        base: Resource,
        next: Option<Resource>,
        page: u64,
        fetcher: F,
        #[pin]
        current_fetch: Option<Fut>,
    }
}

impl<F, Fut> PagesPager<F, Fut>
where
    F: FnMut(Resource) -> Fut,
    Fut: Future<Output = Result<Entities, ClientError>>,
{
    /// Start at `base`; `fetcher` loads the page a resource addresses.
    #[must_use]
    pub fn new(base: Resource, fetcher: F) -> Self {
        Self {
            next: Some(base.clone()),
            base,
            page: 0,
            fetcher,
            current_fetch: None,
        }
    }
}

impl<F, Fut> Stream for PagesPager<F, Fut>
where
    F: FnMut(Resource) -> Fut,
    Fut: Future<Output = Result<Entities, ClientError>>,
{
    type Item = Result<Entities, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(fut) = this.current_fetch.as_mut().as_pin_mut() {
                let result = ready!(fut.poll(cx));
                this.current_fetch.set(None);
                return Poll::Ready(Some(match result {
                    Ok(page) => {
                        *this.page += 1;
                        *this.next = next_page(this.base, &page.meta);
                        debug!(
                            page = *this.page,
                            items = page.values.len(),
                            more = this.next.is_some(),
                            "page fetched"
                        );
                        Ok(page)
                    }
                    Err(err) => {
                        *this.next = None;
                        Err(err)
                    }
                }));
            }

            let Some(resource) = this.next.take() else {
                return Poll::Ready(None);
            };
            let fut = (this.fetcher)(resource);
            this.current_fetch.set(Some(fut));
        }
    }
}

pin_project! {
    /// Stream of single entities across every page.
    pub struct ItemsPager<S> {
        #[pin]
        pages: S,
        buffer: VecDeque<Value>,
    }
}

impl<S> ItemsPager<S>
where
    S: Stream<Item = Result<Entities, ClientError>>,
{
    #[must_use]
    pub fn new(pages: S) -> Self {
        Self {
            pages,
            buffer: VecDeque::new(),
        }
    }
}

impl<S> Stream for ItemsPager<S>
where
    S: Stream<Item = Result<Entities, ClientError>>,
{
    type Item = Result<Value, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(item) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }
            match ready!(this.pages.as_mut().poll_next(cx)) {
                Some(Ok(page)) => this.buffer.extend(page.values),
                Some(Err(err)) => return Poll::Ready(Some(Err(err))),
                None => return Poll::Ready(None),
            }
        }
    }
}

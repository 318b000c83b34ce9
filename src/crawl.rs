//! Paginated listing crawl
//!
//! Turns a listing query into a sequence of [`SearchPage`]s handed to a
//! callback, one page at a time, in page order.

use std::future::Future;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::flickr::response::decode_search_page;
use crate::flickr::{MetadataService, Query};
use crate::rate_limiter::RateLimiter;
use crate::types::SearchPage;

/// Walk every page of `method` with `query`, invoking `on_page` for each
///
/// Pages are requested as `page=1, 2, ...` (any `page` already in `query` is
/// replaced), each after a rate limiter permit. The crawl stops once the page
/// just handled is at or past the reported page count, or the count is zero.
///
/// # Errors
/// - [`Error::PaginationAborted`] if a page cannot be fetched or decoded.
///   Pages are not retried.
/// - Any error returned by `on_page`, unchanged.
pub async fn execute_paginated<F, Fut>(
    service: &dyn MetadataService,
    limiter: &RateLimiter,
    method: &str,
    query: &Query,
    mut on_page: F,
) -> Result<()>
where
    F: FnMut(SearchPage) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut query = query.clone();
    let mut page: u32 = 1;

    loop {
        query.set("page", page.to_string());
        limiter.acquire().await;

        let result = fetch_page(service, method, &query).await;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(page, error = %e, "Page fetch failed, aborting crawl");
                return Err(Error::PaginationAborted {
                    page,
                    source: Box::new(e),
                });
            }
        };

        let pages = response.pages;
        debug!(page, pages, items = response.items.len(), "Fetched page");

        on_page(response).await?;

        if pages == 0 || page >= pages {
            return Ok(());
        }
        page += 1;
    }
}

async fn fetch_page(service: &dyn MetadataService, method: &str, query: &Query) -> Result<SearchPage> {
    let body = service.execute(method, query).await?;
    decode_search_page(&body)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves `pages` pages of two items each; fails on `fail_on` if set
    struct Pager {
        pages: u32,
        fail_on: Option<u32>,
        requested: Mutex<Vec<u32>>,
    }

    impl Pager {
        fn new(pages: u32) -> Self {
            Self {
                pages,
                fail_on: None,
                requested: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl MetadataService for Pager {
        async fn execute(&self, _method: &str, params: &Query) -> Result<Vec<u8>> {
            let page: u32 = params.get("page").unwrap().parse().unwrap();
            self.requested.lock().unwrap().push(page);

            if self.fail_on == Some(page) {
                return Err(Error::RemoteService {
                    code: 105,
                    message: "Service currently unavailable".into(),
                });
            }

            let a = page * 10 + 1;
            let b = page * 10 + 2;
            Ok(format!(
                r#"{{"photos":{{"page":{page},"pages":{},"photo":[{{"id":"{a}"}},{{"id":"{b}"}}]}},"stat":"ok"}}"#,
                self.pages
            )
            .into_bytes())
        }
    }

    #[tokio::test]
    async fn test_three_pages_in_order() {
        let service = Pager::new(3);
        let seen = Mutex::new(vec![]);

        execute_paginated(&service, &RateLimiter::unlimited(), "flickr.photos.search", &Query::new(), |page| {
            seen.lock().unwrap().push(page);
            async { Ok(()) }
        })
        .await
        .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.iter().map(|p| p.page).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(seen[1].items, vec![ItemId(21), ItemId(22)]);
        assert_eq!(*service.requested.lock().unwrap(), vec![1, 2, 3], "no fourth request");
    }

    #[tokio::test]
    async fn test_zero_pages_stops_after_first_request() {
        let service = Pager::new(0);
        let mut calls = 0;

        execute_paginated(&service, &RateLimiter::unlimited(), "m", &Query::new(), |_| {
            calls += 1;
            async { Ok(()) }
        })
        .await
        .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(*service.requested.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_existing_page_parameter_is_replaced() {
        let service = Pager::new(2);

        execute_paginated(&service, &RateLimiter::unlimited(), "m", &Query::new().with("page", "9"), |_| async {
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(*service.requested.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_page_failure_aborts_with_page_number() {
        let service = Pager {
            fail_on: Some(2),
            ..Pager::new(3)
        };
        let mut handled = vec![];

        let err = execute_paginated(&service, &RateLimiter::unlimited(), "m", &Query::new(), |page| {
            handled.push(page.page);
            async { Ok(()) }
        })
        .await
        .unwrap_err();

        match err {
            Error::PaginationAborted { page, source } => {
                assert_eq!(page, 2);
                assert!(matches!(*source, Error::RemoteService { code: 105, .. }));
            }
            other => panic!("expected PaginationAborted, got {other:?}"),
        }
        assert_eq!(handled, vec![1]);
        assert_eq!(*service.requested.lock().unwrap(), vec![1, 2], "pages are not retried");
    }

    #[tokio::test]
    async fn test_callback_error_is_returned_unchanged() {
        let service = Pager::new(3);

        let err = execute_paginated(&service, &RateLimiter::unlimited(), "m", &Query::new(), |_| async {
            Err(Error::Cancelled)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(*service.requested.lock().unwrap(), vec![1]);
    }
}

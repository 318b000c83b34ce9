//! Paginated listings, day-bounded searches and user archives

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{Archivist, ItemArchiver};
use crate::crawl::execute_paginated;
use crate::error::{Error, Result};
use crate::flickr::{ArchiveUser, Query, methods};
use crate::types::{BatchReport, Event};

impl Archivist {
    /// Archive every item returned by `flickr.photos.search` for `query`
    ///
    /// Each page is archived as a batch before the next page is requested.
    /// A failed page fetch aborts with [`Error::PaginationAborted`]; under
    /// fail-fast the first item failure aborts the whole search.
    pub async fn archive_search(&self, query: &Query) -> Result<BatchReport> {
        self.archive_listing(methods::SEARCH, query).await
    }

    /// Archive every item of an arbitrary paginated listing method
    pub async fn archive_listing(&self, method: &str, query: &Query) -> Result<BatchReport> {
        let token = self.shutdown.child_token();
        self.crawl_into_batches(&self.item_archiver(), method, query, &token)
            .await
    }

    /// Archive the items uploaded on `date`
    ///
    /// Sets `min_upload_date` / `max_upload_date` to the first and last
    /// second of the day, replacing any values already in `query`.
    pub async fn archive_search_for_day(&self, query: &Query, date: NaiveDate) -> Result<BatchReport> {
        let token = self.shutdown.child_token();
        self.crawl_into_batches(
            &self.item_archiver(),
            methods::SEARCH,
            &day_query(query, date),
            &token,
        )
        .await
    }

    /// Archive everything `username` has uploaded, one day at a time
    ///
    /// Days run from the account's first upload to today (UTC), oldest first.
    pub async fn archive_user(&self, username: &str) -> Result<BatchReport> {
        let user = ArchiveUser::lookup(self.service.as_ref(), &self.api_limiter, username).await?;

        let Some(first_upload) = user.first_upload else {
            info!(username, "User has no uploads");
            return Ok(BatchReport::default());
        };

        self.archive_user_range(&user, first_upload, Utc::now().date_naive())
            .await
    }

    /// Archive `user`'s uploads for every day in `from..=to`
    pub async fn archive_user_range(
        &self,
        user: &ArchiveUser,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BatchReport> {
        let token = self.shutdown.child_token();
        let archiver = match &self.config.username {
            Some(_) => self.item_archiver(),
            None => self.item_archiver().for_user(user.username.as_str()),
        };
        let base = Query::new().with("user_id", user.nsid.as_str());

        let mut report = BatchReport::default();
        for date in from.iter_days().take_while(|day| *day <= to) {
            if token.is_cancelled() {
                break;
            }
            info!(username = %user.username, %date, "Archiving day");

            let day = self
                .crawl_into_batches(&archiver, methods::SEARCH, &day_query(&base, date), &token)
                .await?;
            report.merge(day);
        }

        Ok(report)
    }

    /// Crawl `method` and archive each page as a batch under `token`
    ///
    /// Cancellation stops the crawl after the current page and returns what
    /// was archived so far.
    async fn crawl_into_batches(
        &self,
        archiver: &ItemArchiver,
        method: &str,
        query: &Query,
        token: &CancellationToken,
    ) -> Result<BatchReport> {
        let report = Mutex::new(BatchReport::default());

        let crawled = execute_paginated(
            self.service.as_ref(),
            &self.api_limiter,
            method,
            query,
            |page| {
                let report = &report;
                async move {
                    self.emit(Event::PageFetched {
                        page: page.page,
                        pages: page.pages,
                        items: page.items.len(),
                    });

                    let batch = self.run_batch(archiver, page.items, token).await?;
                    report.lock().await.merge(batch);

                    if token.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    Ok(())
                }
            },
        )
        .await;

        match crawled {
            Ok(()) => Ok(report.into_inner()),
            Err(Error::Cancelled) => {
                warn!(method, "Crawl stopped, archival cancelled");
                Ok(report.into_inner())
            }
            Err(e) => Err(e),
        }
    }
}

fn day_query(query: &Query, date: NaiveDate) -> Query {
    let ymd = date.format("%Y-%m-%d");
    query
        .clone()
        .with("min_upload_date", format!("{ymd} 00:00:00"))
        .with("max_upload_date", format!("{ymd} 23:59:59"))
}

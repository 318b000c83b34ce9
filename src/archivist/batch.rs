//! Bounded-concurrency fan-out of item archival

use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Archivist, ItemArchiver};
use crate::config::FailurePolicy;
use crate::error::{Error, Result};
use crate::types::{ArchiveOutcome, BatchReport, Event, ItemId};

/// Message sent by each task exactly once
enum TaskResult {
    Finished(ArchiveOutcome),
    Skipped(ItemId),
}

impl Archivist {
    /// Archive a fixed set of items
    ///
    /// One task is spawned per item; at most `throttle.max_in_flight` run at
    /// once. Under [`FailurePolicy::FailFast`] the first failure is returned
    /// as [`Error::Archive`] and items that have not started yet are skipped.
    /// Under [`FailurePolicy::CollectAll`] every outcome is reported.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use flickr_archive::{Archivist, Config, FsStore, ItemId};
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> flickr_archive::Result<()> {
    /// let archivist = Archivist::flickr(Config::default(), Arc::new(FsStore::new("archive")))?;
    ///
    /// let report = archivist
    ///     .archive_all(vec![ItemId(31390876467), ItemId(31390876468)])
    ///     .await?;
    /// println!("{} archived", report.archived.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn archive_all(&self, items: Vec<ItemId>) -> Result<BatchReport> {
        let token = self.shutdown.child_token();
        self.run_batch(&self.item_archiver(), items, &token).await
    }

    /// Fan `items` out under `token`
    ///
    /// Tasks are detached and never aborted: once the caller stops listening
    /// they finish their current item and drop the result.
    pub(crate) async fn run_batch(
        &self,
        archiver: &ItemArchiver,
        items: Vec<ItemId>,
        token: &CancellationToken,
    ) -> Result<BatchReport> {
        let total = items.len();
        let mut report = BatchReport::default();
        if total == 0 {
            return Ok(report);
        }

        let fail_fast = self.config.failure_policy == FailurePolicy::FailFast;
        let semaphore = Arc::new(Semaphore::new(self.config.throttle.max_in_flight));
        let (result_tx, mut result_rx) = mpsc::channel::<TaskResult>(total);

        debug!(items = total, fail_fast, "Starting batch");

        for id in items {
            let semaphore = semaphore.clone();
            let result_tx = result_tx.clone();
            let token = token.clone();
            let archiver = archiver.clone();

            tokio::spawn(async move {
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        result_tx.send(TaskResult::Skipped(id)).await.ok();
                        return;
                    }
                };

                if token.is_cancelled() {
                    drop(permit);
                    result_tx.send(TaskResult::Skipped(id)).await.ok();
                    return;
                }

                let outcome = archiver.archive(id).await;

                // Cancel while still holding the permit so no queued item starts
                if fail_fast && outcome.is_err() {
                    token.cancel();
                }
                drop(permit);

                result_tx.send(TaskResult::Finished(outcome)).await.ok();
            });
        }
        drop(result_tx);

        for _ in 0..total {
            let Some(result) = result_rx.recv().await else {
                break;
            };

            match result {
                TaskResult::Finished(Ok(item)) => {
                    self.emit(Event::ItemArchived {
                        id: item.id,
                        directory: item.directory.clone(),
                    });
                    report.archived.push(item);
                }
                TaskResult::Finished(Err(e)) => {
                    warn!(item_id = %e.item(), error = %e, "Item failed");
                    self.emit(Event::ItemFailed {
                        id: e.item(),
                        error: e.to_string(),
                    });
                    if fail_fast {
                        return Err(Error::Archive(e));
                    }
                    report.failures.push(e);
                }
                TaskResult::Skipped(id) => {
                    debug!(item_id = %id, "Item skipped, batch cancelled");
                    self.emit(Event::ItemSkipped { id });
                    report.skipped.push(id);
                }
            }
        }

        Ok(report)
    }
}

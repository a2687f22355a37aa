//! Sequential batch execution with a per-item continuation policy

use tracing::{error, info, warn};

use crate::error::Result;
use crate::publish::MediaPublisher;
use crate::types::{ErrorRecord, ItemOutcome, ItemResult, WorkItem};

/// Decides whether a failed item is recorded or aborts the batch
pub trait FailurePolicy: Send + Sync {
    /// Read once per failed work item
    fn continue_on_fail(&self, item_index: usize) -> bool;
}

impl FailurePolicy for bool {
    fn continue_on_fail(&self, _item_index: usize) -> bool {
        *self
    }
}

/// Runs work items one after another, in input order
pub struct BatchExecutor {
    publisher: MediaPublisher,
}

impl BatchExecutor {
    /// Create an executor around a publisher
    pub fn new(publisher: MediaPublisher) -> Self {
        Self { publisher }
    }

    /// Underlying publisher
    pub fn publisher(&self) -> &MediaPublisher {
        &self.publisher
    }

    /// Process every item to completion and collect the outcomes
    ///
    /// Items that failed to decode are passed in as errors and handled like
    /// any other failure.
    ///
    /// # Errors
    ///
    /// Returns the first failure when `policy` does not allow continuing for
    /// that item. Later items are not attempted.
    pub async fn run<P>(&self, items: Vec<Result<WorkItem>>, policy: &P) -> Result<Vec<ItemOutcome>>
    where
        P: FailurePolicy + ?Sized,
    {
        let total = items.len();
        let mut outcomes = Vec::with_capacity(total);

        for (item_index, item) in items.into_iter().enumerate() {
            let result = match item {
                Ok(ref work_item) => self.publisher.publish(work_item).await,
                Err(err) => Err(err),
            };

            let result = match result {
                Ok(published) => {
                    info!("Item {}/{} published", item_index + 1, total);
                    ItemResult::Published(published)
                }
                Err(err) if policy.continue_on_fail(item_index) => {
                    warn!("Item {}/{} failed, continuing: {}", item_index + 1, total, err);
                    ItemResult::Failed(ErrorRecord::from(&err))
                }
                Err(err) => {
                    error!("Item {}/{} failed, aborting batch: {}", item_index + 1, total, err);
                    return Err(err);
                }
            };

            outcomes.push(ItemOutcome { item_index, result });
        }

        Ok(outcomes)
    }
}

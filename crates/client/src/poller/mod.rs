// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded jittered polling for eventually-consistent activity records.
//!
//! One poller fetches a single record on a fixed schedule until the record
//! reaches a terminal status, disappears, the schedule runs out, or the
//! owning handle cancels. Fetch errors are swallowed and the schedule
//! continues; exhaustion is silent — waiting UI derives "still processing"
//! from record status, not from poller signals.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::ActivityCache;
use crate::error::ClientError;
use crate::visibility::{gated_delay, DelayOutcome};

/// Each base delay is perturbed by up to this fraction, uniformly at random,
/// to avoid synchronized request bursts across tabs.
const JITTER_FRACTION: f64 = 0.2;

/// Fetch seam for the poller. `Ok(None)` means the record is absent.
pub trait RecordFetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<crate::activity::ActivityRecord>, ClientError>> + Send;
}

/// Handle owning one poll task. Dropping the handle cancels the poll.
pub struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop the poll: the current delay wait ends immediately and no further
    /// fetch is issued. An in-flight fetch completes but its result is
    /// discarded, never written to the cache.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the poll task to finish.
    pub async fn join(mut self) {
        let _ = (&mut self.task).await;
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start a bounded poll for one activity id.
///
/// No-op if the cached record already holds a terminal status at call time.
/// Fetch attempts are strictly sequential within one poller; the caller is
/// responsible for keeping at most one live handle per id (see
/// `Client::start_recommendation_poll`).
pub fn spawn_poller<F: RecordFetcher>(
    fetcher: Arc<F>,
    cache: Arc<ActivityCache>,
    visibility: watch::Receiver<bool>,
    schedule: Vec<Duration>,
    activity_id: String,
) -> PollHandle {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        run_poll(fetcher, cache, visibility, schedule, activity_id, task_cancel).await;
    });
    PollHandle { cancel, task }
}

async fn run_poll<F: RecordFetcher>(
    fetcher: Arc<F>,
    cache: Arc<ActivityCache>,
    mut visibility: watch::Receiver<bool>,
    schedule: Vec<Duration>,
    activity_id: String,
    cancel: CancellationToken,
) {
    if cache.is_terminal(&activity_id).await {
        tracing::debug!(activity_id = %activity_id, "record already terminal, skipping poll");
        return;
    }

    for base in schedule {
        let delay = jittered(base);
        if gated_delay(delay, &mut visibility, &cancel).await == DelayOutcome::Cancelled {
            return;
        }

        match fetcher.fetch(&activity_id).await {
            Ok(result) => {
                // A cancel that raced the fetch wins: discard the result.
                if cancel.is_cancelled() {
                    return;
                }
                match result {
                    None => {
                        tracing::debug!(activity_id = %activity_id, "record absent, stopping poll");
                        return;
                    }
                    Some(record) => {
                        let terminal = record.status.is_terminal();
                        cache.upsert(record).await;
                        if terminal {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::debug!(activity_id = %activity_id, err = %e, "poll fetch failed");
            }
        }
    }

    tracing::debug!(activity_id = %activity_id, "poll schedule exhausted");
}

/// Perturb a base delay by up to ±20%.
pub(crate) fn jittered(base: Duration) -> Duration {
    let factor = 1.0 + rand::rng().random_range(-JITTER_FRACTION..=JITTER_FRACTION);
    base.mul_f64(factor)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

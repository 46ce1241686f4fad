// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Page-visibility signal and the visibility-gated delay.
//!
//! The host shell flips the signal from its visibility-change hook. Delay
//! countdown accumulates only while visible, like a paused stopwatch: going
//! hidden suspends progress without resetting it.

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Owning side of the visibility signal.
pub struct VisibilityHandle {
    tx: watch::Sender<bool>,
}

impl VisibilityHandle {
    /// New handle, initially visible.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(true);
        Self { tx }
    }

    pub fn set_visible(&self, visible: bool) {
        self.tx.send_replace(visible);
    }

    pub fn is_visible(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for VisibilityHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// How a gated delay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayOutcome {
    Elapsed,
    Cancelled,
}

/// Wait `total` of visible time, suspending while hidden.
///
/// Cancellation is checked at every suspension resumption. A dropped
/// visibility sender means nothing can hide the page anymore; the remaining
/// time runs out uninterrupted.
pub async fn gated_delay(
    total: Duration,
    visibility: &mut watch::Receiver<bool>,
    cancel: &CancellationToken,
) -> DelayOutcome {
    let mut remaining = total;
    let mut signal_lost = false;

    loop {
        if cancel.is_cancelled() {
            return DelayOutcome::Cancelled;
        }

        let visible = signal_lost || *visibility.borrow_and_update();
        if !visible {
            tokio::select! {
                _ = cancel.cancelled() => return DelayOutcome::Cancelled,
                changed = visibility.changed() => {
                    if changed.is_err() {
                        signal_lost = true;
                    }
                }
            }
            continue;
        }

        if remaining.is_zero() {
            return DelayOutcome::Elapsed;
        }

        let started = tokio::time::Instant::now();
        tokio::select! {
            _ = cancel.cancelled() => return DelayOutcome::Cancelled,
            _ = tokio::time::sleep(remaining) => return DelayOutcome::Elapsed,
            changed = visibility.changed(), if !signal_lost => {
                remaining = remaining.saturating_sub(started.elapsed());
                if changed.is_err() {
                    signal_lost = true;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "visibility_tests.rs"]
mod tests;

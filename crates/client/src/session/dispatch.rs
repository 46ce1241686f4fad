// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher: consumes provider lifecycle events and applies transitions.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::provider::{IdentityProvider, ProviderEvent};
use crate::session::SessionCoordinator;

/// Spawn the single consumer of the provider's event channel.
///
/// Runs until shutdown or until the provider drops its sender.
pub fn spawn_dispatcher<P: IdentityProvider>(
    session: Arc<SessionCoordinator<P>>,
    mut events: mpsc::UnboundedReceiver<ProviderEvent>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            tracing::debug!(event = ?event, "provider event");
            session.apply_provider_event(event).await;
        }
    })
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;

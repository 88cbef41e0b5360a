// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background task feeding bus events to an entity.

use std::future::Future;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::event::{EntityId, Event};

/// Spawns a task that hands every received event to `handler`.
///
/// Handler errors are logged and do not stop the task. A lagged receiver
/// logs how many events were lost and keeps going; the next refresh brings
/// the entity back in line with the inverter. The task ends when the bus is
/// closed or the handle is aborted.
pub(crate) fn spawn_listener<F, Fut>(
    entity_id: EntityId,
    mut rx: broadcast::Receiver<Event>,
    mut handler: F,
) -> JoinHandle<()>
where
    F: FnMut(Event) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        tracing::debug!(%entity_id, "Starting peer listener");

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = handler(event).await {
                        tracing::warn!(%entity_id, error = %e, "Failed to apply peer update");
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(%entity_id, missed, "Peer listener lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }

        tracing::debug!(%entity_id, "Peer listener stopped");
    })
}

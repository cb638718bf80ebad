// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-use waits on a broadcast event stream.

use std::time::Duration;

use canteiro_core::CanteiroError;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// Waits up to `timeout` for the first event accepted by `predicate`.
///
/// Events that arrived before the receiver was created are never seen, so
/// subscribe before prompting for the event. The receiver is borrowed; the
/// caller drops it when done.
pub async fn next_matching<T, F>(
    rx: &mut broadcast::Receiver<T>,
    timeout: Duration,
    mut predicate: F,
) -> Result<T, CanteiroError>
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(event) if predicate(&event) => return Ok(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged");
                }
                Err(RecvError::Closed) => {
                    return Err(CanteiroError::Chat {
                        message: "event stream closed".into(),
                        source: None,
                    });
                }
            }
        }
    };

    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| CanteiroError::Timeout { duration: timeout })?
}

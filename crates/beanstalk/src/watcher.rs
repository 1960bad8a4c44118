//! Watching a dispatched update until it completes.
//!
//! The event feed is polled on a fixed cadence while a deadline runs. The
//! two race each other; whichever finishes first decides the outcome and the
//! other is dropped, so a late poll can never report after a timeout.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::snapshot::EnvironmentSnapshot;
use crate::types::{Event, EventQuery, WaitOutcome};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

/// Default deadline for an update to complete.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default delay between two event polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Timing of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// How long to wait for a terminal event.
    pub timeout: Duration,
    /// Delay between polls. The first poll happens one interval after the
    /// watch starts.
    pub poll_interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WatchOptions {
    /// Default options with a different deadline.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// Wait for the pending update of a snapshot to reach a terminal state.
///
/// On success the environment is described once more and merged into the
/// snapshot before the outcome is returned. A failing refresh is logged and
/// does not change the outcome. The pending request id is cleared whatever
/// the outcome.
///
/// # Errors
///
/// - `Error::NoPendingUpdate` if no update was dispatched.
/// - `Error::Poll` if the event feed fails. Watching stops.
pub async fn wait(
    backend: &dyn Backend,
    snapshot: &mut EnvironmentSnapshot,
    options: WatchOptions,
) -> Result<WaitOutcome> {
    let Some(request_id) = snapshot.request_id().map(str::to_string) else {
        return Err(Error::NoPendingUpdate {
            environment: snapshot.name.clone(),
        });
    };

    let query = EventQuery {
        application_name: snapshot.application.clone(),
        environment_name: snapshot.name.clone(),
        request_id,
    };

    log::debug!(
        "Watching request {} (timeout {}s)",
        query.request_id,
        options.timeout.as_secs()
    );

    let terminal = tokio::select! {
        biased;
        () = tokio::time::sleep(options.timeout) => None,
        result = poll_until_terminal(backend, &query, options.poll_interval) => Some(result),
    };

    snapshot.clear_pending_request();

    let event = match terminal {
        None => {
            log::warn!(
                "Request {} still running after {}s",
                query.request_id,
                options.timeout.as_secs()
            );
            return Ok(WaitOutcome::TimedOut {
                after: options.timeout,
            });
        }
        Some(result) => result?,
    };

    if event.is_update_failure() {
        log::warn!("Request {} failed: {}", query.request_id, event.message);
        return Ok(WaitOutcome::Failed { event });
    }

    log::info!("Request {} completed", query.request_id);
    match backend
        .describe_environment(&snapshot.application, &snapshot.name)
        .await
    {
        Ok(description) => snapshot.apply_description(&description),
        Err(e) => log::warn!("Failed to refresh {} after update: {e}", snapshot.name),
    }

    Ok(WaitOutcome::Succeeded { event })
}

/// Poll the event feed until the latest event is terminal.
async fn poll_until_terminal(
    backend: &dyn Backend,
    query: &EventQuery,
    poll_interval: Duration,
) -> Result<Event> {
    let period = poll_interval.max(MIN_POLL_INTERVAL);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut polls = 0u32;
    loop {
        ticker.tick().await;
        polls += 1;

        let events = backend
            .describe_events(query)
            .await
            .map_err(|source| Error::Poll {
                request_id: query.request_id.clone(),
                source,
            })?;

        // Newest first: only the latest event decides
        match events.into_iter().next() {
            Some(event) if event.is_update_success() || event.is_update_failure() => {
                log::debug!("Poll {polls}: terminal event \"{}\"", event.message);
                return Ok(event);
            }
            Some(event) => log::debug!("Poll {polls}: {}", event.message),
            None => log::debug!("Poll {polls}: no events yet"),
        }
    }
}

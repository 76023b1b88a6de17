//! Cooperative suspension primitives
//!
//! The conditional wait and the unconditional yield, built on
//! [`SimulationHost::next_event`].

use crate::host::SimulationHost;
use crate::types::MoteEvent;

/// How a conditional wait resumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// An event satisfied the predicate
    Ready(MoteEvent),
    /// The simulated clock reached the deadline first
    Expired {
        /// Simulated time observed at expiry
        now_ms: u64,
    },
    /// The host stopped delivering events
    Closed,
}

/// Suspend until an event satisfies `predicate`
///
/// Non-matching events are consumed. With `deadline_ms` unset the wait has
/// no bound; otherwise the clock is checked on every delivered event, before
/// the predicate, so an event at or past the deadline never matches.
pub async fn wait_until<H, P>(
    host: &mut H,
    deadline_ms: Option<u64>,
    mut predicate: P,
) -> WaitOutcome
where
    H: SimulationHost + ?Sized,
    P: FnMut(&MoteEvent) -> bool + Send,
{
    loop {
        let Some(event) = host.next_event().await else {
            return WaitOutcome::Closed;
        };

        if let Some(deadline) = deadline_ms {
            let now_ms = host.simulation_time_millis();
            if now_ms >= deadline {
                return WaitOutcome::Expired { now_ms };
            }
        }

        if predicate(&event) {
            return WaitOutcome::Ready(event);
        }

        tracing::trace!(mote = %event.mote, message = %event.message, "event skipped while waiting");
    }
}

/// Suspend for exactly one event, whatever its content
pub async fn yield_once<H>(host: &mut H) -> Option<MoteEvent>
where
    H: SimulationHost + ?Sized,
{
    host.next_event().await
}

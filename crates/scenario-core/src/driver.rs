//! Scenario driver
//!
//! Two sequential phases against a [`SimulationHost`]:
//!
//! 1. **Positioning**: for every mote, wait for its ready line, log
//!    `i=`/`x=`/`y=` and write x then y to the mote.
//! 2. **Running**: log every event as `<time> <id>: <msg>` until the
//!    simulated clock reaches the success threshold, then signal success once.
//!
//! The driver never reports failure to the host. A mote that never becomes
//! ready stalls positioning unless a handshake timeout is configured.

use crate::config::{HandshakeMode, ScenarioConfig};
use crate::error::{Phase, ScenarioError};
use crate::host::SimulationHost;
use crate::suspend::{wait_until, yield_once, WaitOutcome};
use crate::transcript::TranscriptLine;
use crate::types::{format_coordinate, MoteEvent, MoteHandle, MoteId, Position};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Motes in the order they were positioned
    pub positioned: Vec<PositionedMote>,
    /// Events logged in the running phase, including the final one
    pub events_logged: u64,
    /// Simulated time at which success was signalled
    pub finished_at_ms: u64,
}

/// A mote that received its coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionedMote {
    /// Index logged for the mote
    pub index: usize,
    /// Mote that received the coordinates
    pub id: MoteId,
    /// Coordinates sent
    pub position: Position,
}

/// Scenario driver
#[derive(Debug, Clone, Default)]
pub struct ScenarioDriver {
    config: ScenarioConfig,
}

impl ScenarioDriver {
    /// Create a driver
    #[inline]
    #[must_use]
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Run both phases to completion
    ///
    /// # Errors
    /// - `ScenarioError::Config` if the configuration is invalid
    /// - `ScenarioError::HostClosed` if the host stops delivering events
    /// - `ScenarioError::Host` if a position lookup or write fails
    /// - `ScenarioError::HandshakeTimeout` if a configured timeout expires
    pub async fn run<H>(&self, host: &mut H) -> Result<ScenarioReport, ScenarioError>
    where
        H: SimulationHost + ?Sized,
    {
        self.config.validate()?;

        let motes = host.motes();
        tracing::info!(
            motes = motes.len(),
            mode = ?self.config.handshake,
            "Starting positioning handshake"
        );

        let positioned = match self.config.handshake {
            HandshakeMode::Keyed => self.position_keyed(host, &motes).await?,
            HandshakeMode::Sequential => self.position_sequential(host, &motes).await?,
        };

        tracing::info!(
            positioned = positioned.len(),
            at_ms = host.simulation_time_millis(),
            "Positioning complete"
        );

        let (events_logged, finished_at_ms) = self.run_until_done(host).await?;

        tracing::info!(events_logged, finished_at_ms, "Scenario passed");

        Ok(ScenarioReport {
            positioned,
            events_logged,
            finished_at_ms,
        })
    }

    /// Position each mote once, matching ready events by sender
    async fn position_keyed<H>(
        &self,
        host: &mut H,
        motes: &[MoteHandle],
    ) -> Result<Vec<PositionedMote>, ScenarioError>
    where
        H: SimulationHost + ?Sized,
    {
        let index_of: HashMap<MoteId, usize> = motes.iter().map(|m| (m.id, m.index)).collect();
        let mut pending: BTreeSet<MoteId> = motes.iter().map(|m| m.id).collect();
        let mut positioned = Vec::with_capacity(motes.len());

        let started_ms = host.simulation_time_millis();
        let deadline = self
            .config
            .handshake_timeout_ms
            .map(|timeout| started_ms.saturating_add(timeout));

        while !pending.is_empty() {
            let event = self.wait_ready(host, deadline, started_ms, &pending).await?;

            if !pending.remove(&event.mote) {
                if index_of.contains_key(&event.mote) {
                    tracing::debug!(mote = %event.mote, "Ignoring repeated ready signal");
                } else {
                    tracing::warn!(mote = %event.mote, "Ready signal from unknown mote");
                }
                continue;
            }

            let Some(&index) = index_of.get(&event.mote) else {
                continue;
            };
            positioned.push(send_position(host, index, event.mote)?);
        }

        Ok(positioned)
    }

    /// Count ready events in arrival order, yielding once after each
    async fn position_sequential<H>(
        &self,
        host: &mut H,
        motes: &[MoteHandle],
    ) -> Result<Vec<PositionedMote>, ScenarioError>
    where
        H: SimulationHost + ?Sized,
    {
        tracing::warn!(
            "Sequential handshake: repeated or lost ready signals leave motes unpositioned"
        );

        let mut positioned = Vec::with_capacity(motes.len());
        let mut pending: BTreeSet<MoteId> = motes.iter().map(|m| m.id).collect();

        let started_ms = host.simulation_time_millis();
        let deadline = self
            .config
            .handshake_timeout_ms
            .map(|timeout| started_ms.saturating_add(timeout));

        for index in 0..motes.len() {
            let event = self.wait_ready(host, deadline, started_ms, &pending).await?;
            pending.remove(&event.mote);
            positioned.push(send_position(host, index, event.mote)?);

            match yield_once(host).await {
                Some(skipped) => {
                    tracing::trace!(mote = %skipped.mote, message = %skipped.message, "Yielded past event");
                }
                None => {
                    return Err(ScenarioError::HostClosed {
                        phase: Phase::Positioning,
                    })
                }
            }
        }

        Ok(positioned)
    }

    async fn wait_ready<H>(
        &self,
        host: &mut H,
        deadline: Option<u64>,
        started_ms: u64,
        pending: &BTreeSet<MoteId>,
    ) -> Result<MoteEvent, ScenarioError>
    where
        H: SimulationHost + ?Sized,
    {
        let ready = self.config.ready_message.as_str();

        match wait_until(host, deadline, |event| event.is(ready)).await {
            WaitOutcome::Ready(event) => Ok(event),
            WaitOutcome::Expired { now_ms } => Err(ScenarioError::HandshakeTimeout {
                pending: pending.iter().copied().collect(),
                waited_ms: now_ms.saturating_sub(started_ms),
            }),
            WaitOutcome::Closed => Err(ScenarioError::HostClosed {
                phase: Phase::Positioning,
            }),
        }
    }

    /// Log every event until the success threshold, then signal success once
    async fn run_until_done<H>(&self, host: &mut H) -> Result<(u64, u64), ScenarioError>
    where
        H: SimulationHost + ?Sized,
    {
        let mut events_logged = 0u64;

        loop {
            let event = yield_once(host).await.ok_or(ScenarioError::HostClosed {
                phase: Phase::Running,
            })?;

            host.log(&TranscriptLine::from(&event).to_string());
            events_logged += 1;

            let now_ms = host.simulation_time_millis();
            if now_ms < self.config.success_after_ms {
                continue;
            }

            host.test_ok();
            return Ok((events_logged, now_ms));
        }
    }
}

/// Log and write the coordinates of one mote
fn send_position<H>(host: &mut H, index: usize, mote: MoteId) -> Result<PositionedMote, ScenarioError>
where
    H: SimulationHost + ?Sized,
{
    let position = host.position(mote)?;
    let x = format_coordinate(position.x);
    let y = format_coordinate(position.y);

    host.log(&format!("i={index}"));
    host.log(&format!("x={x}"));
    host.log(&format!("y={y}"));

    host.write(mote, &x)?;
    host.write(mote, &y)?;

    tracing::debug!(index, %mote, %x, %y, "Sent position");

    Ok(PositionedMote {
        index,
        id: mote,
        position,
    })
}

//! Testing utilities for the mote scenario workspace
//!
//! A scripted host that replays a fixed event list and records every
//! interaction, plus event fixtures.

#![allow(missing_docs)]

use parking_lot::Mutex;
use scenario_core::{
    HostError, MoteEvent, MoteHandle, MoteId, Position, SimTime, SimulationHost,
    DEFAULT_READY_MESSAGE,
};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// One host call made by the driver
#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    Log(String),
    Write { mote: MoteId, text: String },
    TestOk,
}

/// Everything the driver did, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub actions: Vec<HostAction>,
    /// Events handed to the driver
    pub delivered: usize,
}

impl Transcript {
    pub fn logs(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                HostAction::Log(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<(MoteId, &str)> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                HostAction::Write { mote, text } => Some((*mote, text.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn writes_to(&self, mote: MoteId) -> Vec<&str> {
        self.writes()
            .into_iter()
            .filter(|(m, _)| *m == mote)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn test_ok_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, HostAction::TestOk))
            .count()
    }

    /// Actions recorded after the first success signal
    pub fn actions_after_test_ok(&self) -> &[HostAction] {
        match self.actions.iter().position(|a| matches!(a, HostAction::TestOk)) {
            Some(idx) => &self.actions[idx + 1..],
            None => &[],
        }
    }
}

/// Shared view of a host's transcript, usable after the host moved
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Transcript>>);

impl Recorder {
    pub fn snapshot(&self) -> Transcript {
        self.0.lock().clone()
    }

    fn push(&self, action: HostAction) {
        self.0.lock().actions.push(action);
    }

    fn delivered(&self) {
        self.0.lock().delivered += 1;
    }
}

/// Host that replays a fixed list of events
///
/// The clock follows the time of the last delivered event. When the list
/// runs out, `next_event` returns `None`, or never resolves if the host was
/// built with [`ScriptedHost::hold_open`].
#[derive(Debug, Default)]
pub struct ScriptedHost {
    motes: Vec<(MoteHandle, Position)>,
    events: VecDeque<MoteEvent>,
    clock_ms: u64,
    hold_open: bool,
    rejected: HashSet<MoteId>,
    recorder: Recorder,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mote to the collection
    #[must_use]
    pub fn with_mote(mut self, id: u32, x: f64, y: f64) -> Self {
        let index = self.motes.len();
        self.motes
            .push((MoteHandle::new(index, MoteId(id)), Position::new(x, y)));
        self
    }

    /// Append motes with ids 1, 2, ... in order
    #[must_use]
    pub fn with_positions(mut self, positions: &[(f64, f64)]) -> Self {
        for &(x, y) in positions {
            let id = u32::try_from(self.motes.len() + 1).unwrap_or(u32::MAX);
            self = self.with_mote(id, x, y);
        }
        self
    }

    #[must_use]
    pub fn with_event(mut self, time_ms: u64, mote: u32, message: &str) -> Self {
        self.events.push_back(MoteEvent::new(
            SimTime::from_millis(time_ms),
            MoteId(mote),
            message,
        ));
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: impl IntoIterator<Item = MoteEvent>) -> Self {
        self.events.extend(events);
        self
    }

    /// Never report shutdown; suspend forever once events run out
    #[must_use]
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    #[must_use]
    pub fn reject_writes_to(mut self, mote: u32) -> Self {
        self.rejected.insert(MoteId(mote));
        self
    }

    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }

    pub fn remaining_events(&self) -> usize {
        self.events.len()
    }
}

#[async_trait::async_trait]
impl SimulationHost for ScriptedHost {
    fn motes(&self) -> Vec<MoteHandle> {
        self.motes.iter().map(|(handle, _)| *handle).collect()
    }

    fn position(&self, mote: MoteId) -> Result<Position, HostError> {
        self.motes
            .iter()
            .find(|(handle, _)| handle.id == mote)
            .map(|(_, position)| *position)
            .ok_or(HostError::UnknownMote(mote))
    }

    fn write(&mut self, mote: MoteId, text: &str) -> Result<(), HostError> {
        if self.rejected.contains(&mote) {
            return Err(HostError::WriteRejected {
                mote,
                reason: "scripted rejection".to_string(),
            });
        }
        self.recorder.push(HostAction::Write {
            mote,
            text: text.to_string(),
        });
        Ok(())
    }

    fn log(&mut self, line: &str) {
        self.recorder.push(HostAction::Log(line.to_string()));
    }

    fn test_ok(&mut self) {
        self.recorder.push(HostAction::TestOk);
    }

    fn simulation_time_millis(&self) -> u64 {
        self.clock_ms
    }

    async fn next_event(&mut self) -> Option<MoteEvent> {
        match self.events.pop_front() {
            Some(event) => {
                self.clock_ms = self.clock_ms.max(event.time.as_millis());
                self.recorder.delivered();
                Some(event)
            }
            None if self.hold_open => futures::future::pending().await,
            None => None,
        }
    }
}

/// Ready lines from `motes`, one every `step_ms` starting at `start_ms`
pub fn ready_events(motes: &[u32], start_ms: u64, step_ms: u64) -> Vec<MoteEvent> {
    motes
        .iter()
        .enumerate()
        .map(|(i, &mote)| {
            MoteEvent::new(
                SimTime::from_millis(start_ms + step_ms * i as u64),
                MoteId(mote),
                DEFAULT_READY_MESSAGE,
            )
        })
        .collect()
}

/// Periodic output from one mote in `[from_ms, to_ms]`
pub fn chatter(mote: u32, from_ms: u64, to_ms: u64, step_ms: u64, message: &str) -> Vec<MoteEvent> {
    (from_ms..=to_ms)
        .step_by(usize::try_from(step_ms.max(1)).unwrap_or(usize::MAX))
        .map(|t| MoteEvent::new(SimTime::from_millis(t), MoteId(mote), message))
        .collect()
}

//! Discrete-event mote network
//!
//! Implements [`SimulationHost`] over a set of simulated motes. Pending work
//! (boots, serial input, timers, console output) sits in a min-heap keyed by
//! simulated time; `next_event` advances the clock through it until a mote
//! prints a line, which becomes the next delivered event.

use crate::firmware::{MoteFirmware, Reaction};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use scenario_core::{HostError, MoteEvent, MoteHandle, MoteId, Position, SimTime, SimulationHost};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Number of motes, ids 1..=motes
    pub motes: usize,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Side of the square deployment area
    pub area: f64,
    /// Boots are spread over this window
    pub boot_spread_ms: u64,
    /// Boot in random order instead of id order
    pub shuffle_boot: bool,
    /// Serial line latency
    pub write_delay_ms: u64,
    /// Host shuts down once the clock passes this point
    pub horizon_ms: u64,
}

impl NetworkConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_motes(mut self, motes: usize) -> Self {
        self.motes = motes;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_shuffle_boot(mut self, shuffle: bool) -> Self {
        self.shuffle_boot = shuffle;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_horizon_ms(mut self, horizon_ms: u64) -> Self {
        self.horizon_ms = horizon_ms;
        self
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            motes: 5,
            seed: 42,
            area: 100.0,
            boot_spread_ms: 2_000,
            shuffle_boot: true,
            write_delay_ms: 1,
            horizon_ms: 15 * 60 * 1_000,
        }
    }
}

#[derive(Debug)]
enum Work {
    Boot,
    SerialIn(String),
    Timer,
    Print(String),
}

#[derive(Debug)]
struct Scheduled {
    time: SimTime,
    seq: u64,
    mote: usize,
    work: Work,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

/// One simulated mote
#[derive(Debug, Clone)]
pub struct SimMote {
    pub handle: MoteHandle,
    pub position: Position,
    pub firmware: MoteFirmware,
}

/// Mote network implementing [`SimulationHost`]
#[derive(Debug)]
pub struct MoteNetwork {
    config: NetworkConfig,
    motes: Vec<SimMote>,
    queue: BinaryHeap<Reverse<Scheduled>>,
    seq: u64,
    now: SimTime,
    rng: StdRng,
    console: Vec<String>,
    writes: Vec<(MoteId, String)>,
    test_ok_at: Option<u64>,
    test_ok_calls: usize,
    closed: bool,
}

impl MoteNetwork {
    /// Place motes and schedule their boots
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);

        let motes: Vec<SimMote> = (0..config.motes)
            .map(|index| {
                let id = MoteId(u32::try_from(index + 1).unwrap_or(u32::MAX));
                SimMote {
                    handle: MoteHandle::new(index, id),
                    position: Position::new(
                        coordinate(&mut rng, config.area),
                        coordinate(&mut rng, config.area),
                    ),
                    firmware: MoteFirmware::for_mote(id.get()),
                }
            })
            .collect();

        let mut boot_order: Vec<usize> = (0..motes.len()).collect();
        if config.shuffle_boot {
            boot_order.shuffle(&mut rng);
        }

        let mut network = Self {
            config,
            motes,
            queue: BinaryHeap::new(),
            seq: 0,
            now: SimTime::ZERO,
            rng,
            console: Vec::new(),
            writes: Vec::new(),
            test_ok_at: None,
            test_ok_calls: 0,
            closed: false,
        };

        let step = network.boot_step_ms();
        for (slot, mote) in boot_order.into_iter().enumerate() {
            let at = SimTime::from_millis(step * slot as u64);
            network.schedule(at, mote, Work::Boot);
        }

        tracing::debug!(motes = network.motes.len(), seed = network.config.seed, "Network created");
        network
    }

    #[must_use]
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    #[must_use]
    pub fn motes_detail(&self) -> &[SimMote] {
        &self.motes
    }

    /// Lines appended through `log`
    #[must_use]
    pub fn console(&self) -> &[String] {
        &self.console
    }

    #[must_use]
    pub fn take_console(&mut self) -> Vec<String> {
        std::mem::take(&mut self.console)
    }

    #[must_use]
    pub fn writes(&self) -> &[(MoteId, String)] {
        &self.writes
    }

    /// Simulated time of the success signal
    #[must_use]
    pub fn test_ok_at_ms(&self) -> Option<u64> {
        self.test_ok_at
    }

    #[must_use]
    pub fn test_ok_calls(&self) -> usize {
        self.test_ok_calls
    }

    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    fn boot_step_ms(&self) -> u64 {
        match self.motes.len() {
            0 | 1 => 0,
            n => self.config.boot_spread_ms / (n as u64 - 1),
        }
    }

    fn schedule(&mut self, time: SimTime, mote: usize, work: Work) {
        self.seq += 1;
        self.queue.push(Reverse(Scheduled {
            time,
            seq: self.seq,
            mote,
            work,
        }));
    }

    fn apply(&mut self, mote: usize, reaction: Reaction) {
        let now = self.now;
        for line in reaction.lines {
            self.schedule(now, mote, Work::Print(line));
        }
        if let Some(delay) = reaction.timer_ms {
            self.schedule(now.plus_millis(delay), mote, Work::Timer);
        }
    }

    fn index_of(&self, mote: MoteId) -> Option<usize> {
        self.motes.iter().position(|m| m.handle.id == mote)
    }
}

fn coordinate(rng: &mut StdRng, area: f64) -> f64 {
    let raw = rng.random::<f64>() * area;
    (raw * 100.0).round() / 100.0
}

#[async_trait::async_trait]
impl SimulationHost for MoteNetwork {
    fn motes(&self) -> Vec<MoteHandle> {
        self.motes.iter().map(|m| m.handle).collect()
    }

    fn position(&self, mote: MoteId) -> Result<Position, HostError> {
        self.index_of(mote)
            .map(|idx| self.motes[idx].position)
            .ok_or(HostError::UnknownMote(mote))
    }

    fn write(&mut self, mote: MoteId, text: &str) -> Result<(), HostError> {
        let idx = self.index_of(mote).ok_or(HostError::UnknownMote(mote))?;
        if text.contains('\n') {
            return Err(HostError::WriteRejected {
                mote,
                reason: "serial input is line based".to_string(),
            });
        }

        self.writes.push((mote, text.to_string()));
        let at = self.now.plus_millis(self.config.write_delay_ms);
        self.schedule(at, idx, Work::SerialIn(text.to_string()));
        Ok(())
    }

    fn log(&mut self, line: &str) {
        tracing::debug!(target: "scenario_sim::console", "{line}");
        self.console.push(line.to_string());
    }

    fn test_ok(&mut self) {
        self.test_ok_calls += 1;
        if self.test_ok_at.is_none() {
            self.test_ok_at = Some(self.now.as_millis());
        }
        // The run ends with the success signal.
        self.closed = true;
    }

    fn simulation_time_millis(&self) -> u64 {
        self.now.as_millis()
    }

    async fn next_event(&mut self) -> Option<MoteEvent> {
        let horizon = SimTime::from_millis(self.config.horizon_ms);

        while !self.closed {
            let Reverse(next) = self.queue.pop()?;
            if next.time > horizon {
                tracing::info!(horizon_ms = self.config.horizon_ms, "Simulation horizon reached");
                self.closed = true;
                break;
            }
            self.now = next.time;

            let reaction = match next.work {
                Work::Print(line) => {
                    return Some(MoteEvent::new(self.now, self.motes[next.mote].handle.id, line));
                }
                Work::Boot => self.motes[next.mote].firmware.boot(),
                Work::SerialIn(line) => self.motes[next.mote].firmware.on_serial_line(&line, &mut self.rng),
                Work::Timer => self.motes[next.mote].firmware.on_timer(&mut self.rng),
            };
            self.apply(next.mote, reaction);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(network: &mut MoteNetwork, limit: usize) -> Vec<MoteEvent> {
        let mut events = Vec::new();
        while events.len() < limit {
            match block_on(network.next_event()) {
                Some(event) => events.push(event),
                None => break,
            }
        }
        events
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn every_mote_boots_with_ready_line() {
        let mut network = MoteNetwork::new(NetworkConfig::new().with_motes(4));
        let events = drain(&mut network, 4);

        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.message == "waiting position"));

        let mut ids: Vec<u32> = events.iter().map(|e| e.mote.get()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn in_order_boot_follows_ids() {
        let config = NetworkConfig::new().with_motes(3).with_shuffle_boot(false);
        let mut network = MoteNetwork::new(config);
        let events = drain(&mut network, 3);

        let ids: Vec<u32> = events.iter().map(|e| e.mote.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(events[2].time, SimTime::from_millis(2_000));
    }

    #[test]
    fn same_seed_same_network() {
        let a = MoteNetwork::new(NetworkConfig::new().with_seed(9));
        let b = MoteNetwork::new(NetworkConfig::new().with_seed(9));
        let pa: Vec<Position> = a.motes_detail().iter().map(|m| m.position).collect();
        let pb: Vec<Position> = b.motes_detail().iter().map(|m| m.position).collect();
        assert_eq!(pa, pb);
        assert!(pa.iter().all(|p| (0.0..=100.0).contains(&p.x) && (0.0..=100.0).contains(&p.y)));
    }

    #[test]
    fn written_position_is_echoed() {
        let config = NetworkConfig::new().with_motes(1);
        let mut network = MoteNetwork::new(config);
        let ready = drain(&mut network, 1);
        assert_eq!(ready[0].message, "waiting position");

        network.write(MoteId(1), "37.5").unwrap();
        network.write(MoteId(1), "12").unwrap();

        let echoed = drain(&mut network, 1);
        assert_eq!(echoed[0].message, "pos (37, 12)");
        assert_eq!(echoed[0].time, SimTime::from_millis(1));
        assert_eq!(network.writes().len(), 2);
    }

    #[test]
    fn write_to_unknown_mote_fails() {
        let mut network = MoteNetwork::new(NetworkConfig::new().with_motes(2));
        assert_eq!(
            network.write(MoteId(7), "1"),
            Err(HostError::UnknownMote(MoteId(7)))
        );
        assert!(network.position(MoteId(7)).is_err());
    }

    #[test]
    fn horizon_closes_the_host() {
        let config = NetworkConfig::new().with_motes(2).with_horizon_ms(500);
        let mut network = MoteNetwork::new(config);

        // Mote boots at 0 ms and 2000 ms; only the first is inside the horizon.
        let events = drain(&mut network, 10);
        assert_eq!(events.len(), 1);
        assert!(block_on(network.next_event()).is_none());
    }

    #[test]
    fn success_signal_ends_the_run() {
        let mut network = MoteNetwork::new(NetworkConfig::new().with_motes(2));
        network.test_ok();
        assert_eq!(network.test_ok_at_ms(), Some(0));
        assert!(block_on(network.next_event()).is_none());
    }
}

//! Simulation run and report
//!
//! Runs the scenario driver against a [`MoteNetwork`] and checks the result
//! from the network's side:
//! - the driver signalled success exactly once
//! - every mote echoed the position it was sent
//! - every mote was positioned exactly once

use crate::firmware::register;
use crate::network::{MoteNetwork, NetworkConfig};
use scenario_core::transcript::event_lines;
use scenario_core::{
    format_coordinate, MoteId, Phase, Position, ScenarioConfig, ScenarioDriver, ScenarioError,
};
use serde::Serialize;
use std::collections::HashMap;

/// How the driver ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Success signalled
    Passed,
    /// Host shut down first
    HostClosed { phase: Phase },
    /// Handshake deadline expired
    HandshakeTimeout { pending: Vec<MoteId>, waited_ms: u64 },
    /// A host call failed
    HostError { message: String },
    /// Scenario configuration rejected
    ConfigError { message: String },
}

impl From<ScenarioError> for Outcome {
    fn from(err: ScenarioError) -> Self {
        match err {
            ScenarioError::HostClosed { phase } => Self::HostClosed { phase },
            ScenarioError::HandshakeTimeout { pending, waited_ms } => {
                Self::HandshakeTimeout { pending, waited_ms }
            }
            ScenarioError::Host(e) => Self::HostError {
                message: e.to_string(),
            },
            ScenarioError::Config(e) => Self::ConfigError {
                message: e.to_string(),
            },
        }
    }
}

/// A check that failed on the network side
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Mote never stored a position
    NotPositioned { mote: MoteId },
    /// Stored position differs from what was sent
    PositionMismatch {
        mote: MoteId,
        expected: (u8, u8),
        actual: (u8, u8),
    },
    /// Mote received more than one pair of coordinates
    RepeatedPositioning { mote: MoteId, writes: usize },
    /// Success signalled other than exactly once
    SuccessSignalCount { count: usize },
}

/// Per-mote summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoteSummary {
    pub id: MoteId,
    pub index: usize,
    pub position: Position,
    /// Register values the firmware should end up with
    pub expected: (u8, u8),
    /// Register values the firmware holds
    pub stored: Option<(u8, u8)>,
    /// Event lines logged for this mote
    pub messages: usize,
}

/// Final report from a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub network: NetworkConfig,
    pub scenario: ScenarioConfig,
    pub outcome: Outcome,
    pub motes: Vec<MoteSummary>,
    pub violations: Vec<Violation>,
    /// Event lines logged in the running phase
    pub events_logged: usize,
    pub simulated_ms: u64,
    /// Console lines, in order
    #[serde(skip)]
    pub console: Vec<String>,
}

impl SimulationReport {
    /// Check if the run passed all criteria
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed && self.violations.is_empty()
    }

    /// Generate text report
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Mote Scenario Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.network.seed));
        report.push_str(&format!("Motes: {}\n", self.network.motes));
        report.push_str(&format!("Handshake: {:?}\n", self.scenario.handshake));
        report.push_str(&format!("Success After: {}ms\n", self.scenario.success_after_ms));
        report.push_str(&format!("Simulated Time: {}ms\n", self.simulated_ms));
        report.push_str(&format!("Events Logged: {}\n", self.events_logged));
        report.push_str(&format!("Outcome: {:?}\n", self.outcome));

        report.push_str("\n=== Motes ===\n");
        for mote in &self.motes {
            let stored = mote
                .stored
                .map_or_else(|| "-".to_string(), |(x, y)| format!("({x}, {y})"));
            report.push_str(&format!(
                "{:>3} [{}] x={} y={} stored={} messages={}\n",
                mote.id,
                mote.index,
                format_coordinate(mote.position.x),
                format_coordinate(mote.position.y),
                stored,
                mote.messages,
            ));
        }

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }

    /// JSON form of the report
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Run a scenario against a fresh simulated network
pub async fn run_simulation(network: NetworkConfig, scenario: ScenarioConfig) -> SimulationReport {
    let mut host = MoteNetwork::new(network.clone());
    let driver = ScenarioDriver::new(scenario.clone());

    let outcome = match driver.run(&mut host).await {
        Ok(report) => {
            tracing::info!(positioned = report.positioned.len(), "Driver finished");
            Outcome::Passed
        }
        Err(e) => {
            tracing::error!("Scenario failed: {}", e);
            Outcome::from(e)
        }
    };

    let violations = check_network(&host, &outcome);
    let console = host.take_console();
    let events = event_lines(console.iter().map(String::as_str));

    let mut per_mote: HashMap<MoteId, usize> = HashMap::new();
    for line in &events {
        *per_mote.entry(line.mote).or_default() += 1;
    }

    let motes = host
        .motes_detail()
        .iter()
        .map(|m| MoteSummary {
            id: m.handle.id,
            index: m.handle.index,
            position: m.position,
            expected: expected_registers(m.position),
            stored: m.firmware.position(),
            messages: per_mote.get(&m.handle.id).copied().unwrap_or(0),
        })
        .collect();

    SimulationReport {
        network,
        scenario,
        outcome,
        motes,
        violations,
        events_logged: events.len(),
        simulated_ms: host.now().as_millis(),
        console,
    }
}

/// Register values a mote holds after receiving `position` as text
pub fn expected_registers(position: Position) -> (u8, u8) {
    (
        register(&format_coordinate(position.x)),
        register(&format_coordinate(position.y)),
    )
}

fn check_network(host: &MoteNetwork, outcome: &Outcome) -> Vec<Violation> {
    let mut violations = Vec::new();

    if *outcome == Outcome::Passed && host.test_ok_calls() != 1 {
        violations.push(Violation::SuccessSignalCount {
            count: host.test_ok_calls(),
        });
    }

    let mut writes: HashMap<MoteId, usize> = HashMap::new();
    for (mote, _) in host.writes() {
        *writes.entry(*mote).or_default() += 1;
    }

    for m in host.motes_detail() {
        let mote = m.handle.id;
        let expected = expected_registers(m.position);

        match m.firmware.position() {
            None => violations.push(Violation::NotPositioned { mote }),
            Some(actual) if actual != expected => violations.push(Violation::PositionMismatch {
                mote,
                expected,
                actual,
            }),
            Some(_) => {}
        }

        let count = writes.get(&mote).copied().unwrap_or(0);
        if count > 2 {
            violations.push(Violation::RepeatedPositioning {
                mote,
                writes: count,
            });
        }
    }

    violations
}

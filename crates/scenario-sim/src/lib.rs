//! Scenario Sim - discrete-event mote network for the scenario driver
//!
//! - [`firmware`]: the mote side of the positioning handshake
//! - [`network`]: a [`SimulationHost`](scenario_core::SimulationHost) over simulated motes
//! - [`report`]: run a scenario and check the outcome from the network's side
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use scenario_core::ScenarioConfig;
//! use scenario_sim::{run_simulation, NetworkConfig};
//!
//! let report = run_simulation(NetworkConfig::new().with_motes(8), ScenarioConfig::new()).await;
//! println!("{}", report.generate_text());
//! ```

#![allow(missing_docs)]

pub mod firmware;
pub mod network;
pub mod report;

pub use firmware::{atoi, MoteFirmware, Role};
pub use network::{MoteNetwork, NetworkConfig, SimMote};
pub use report::{run_simulation, MoteSummary, Outcome, SimulationReport, Violation};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

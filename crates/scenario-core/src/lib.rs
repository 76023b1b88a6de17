//! Scenario Core - mote positioning and timed-run driver
//!
//! Drives a mote network simulation through a fixed test scenario:
//! - Waits for each mote to print its ready line and sends it its coordinates
//! - Logs every subsequent event to the simulation console
//! - Signals success once the simulated clock passes the run duration
//!
//! The simulation itself stays behind the [`SimulationHost`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use scenario_core::{ScenarioConfig, ScenarioDriver};
//!
//! # async fn example(host: &mut impl scenario_core::SimulationHost) -> Result<(), scenario_core::ScenarioError> {
//! let driver = ScenarioDriver::new(ScenarioConfig::new());
//! let report = driver.run(host).await?;
//!
//! println!("Positioned {} motes", report.positioned.len());
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod config;
pub mod driver;
pub mod error;
pub mod host;
pub mod suspend;
pub mod transcript;
pub mod types;

// Re-exports for convenience
pub use config::{HandshakeMode, ScenarioConfig, DEFAULT_READY_MESSAGE, DEFAULT_SUCCESS_AFTER_MS};
pub use driver::{PositionedMote, ScenarioDriver, ScenarioReport};
pub use error::{ConfigError, HostError, Phase, ScenarioError};
pub use host::SimulationHost;
pub use transcript::{TranscriptError, TranscriptLine};
pub use types::{format_coordinate, MoteEvent, MoteHandle, MoteId, Position, SimTime};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for hosts and drivers
    pub use crate::{
        HandshakeMode, HostError, MoteEvent, MoteHandle, MoteId, Position, ScenarioConfig,
        ScenarioDriver, ScenarioError, ScenarioReport, SimTime, SimulationHost,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

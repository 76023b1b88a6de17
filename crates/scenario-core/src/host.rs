//! Host interface
//!
//! Everything the driver needs from the simulation it runs in. The driver
//! never owns the simulation; a host adapter implements this trait for a
//! real simulator, and `scenario-sim` implements it for the built-in
//! discrete-event network.

use crate::error::HostError;
use crate::types::{MoteEvent, MoteHandle, MoteId, Position};

/// Simulation host
///
/// `next_event` is the only suspension point. Each call hands control back
/// to the host scheduler and resumes with the next line of mote output, or
/// `None` once the host has shut the scenario down.
#[async_trait::async_trait]
pub trait SimulationHost: Send {
    /// Ordered, fixed-length mote collection
    fn motes(&self) -> Vec<MoteHandle>;

    /// Current position of a mote
    fn position(&self, mote: MoteId) -> Result<Position, HostError>;

    /// Send one line of text to the mote's serial input
    fn write(&mut self, mote: MoteId, text: &str) -> Result<(), HostError>;

    /// Append a line to the simulation console
    fn log(&mut self, line: &str);

    /// Signal that the scenario passed
    fn test_ok(&mut self);

    /// Elapsed simulated time in milliseconds
    fn simulation_time_millis(&self) -> u64;

    /// Suspend until the host delivers the next event
    async fn next_event(&mut self) -> Option<MoteEvent>;
}

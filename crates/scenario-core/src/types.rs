//! Core types shared by the driver and its hosts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host identifier of a mote
///
/// Positive and unique within a simulation run. Distinct from the mote's
/// index in the host's ordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoteId(pub u32);

impl MoteId {
    /// Raw identifier value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulated time in microseconds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(pub u64);

impl SimTime {
    /// Start of the simulation
    pub const ZERO: Self = Self(0);

    /// Time from simulated milliseconds
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000))
    }

    /// Microseconds since simulation start
    #[inline]
    #[must_use]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Whole milliseconds since simulation start
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0 / 1_000
    }

    /// Time advanced by `millis` simulated milliseconds
    #[inline]
    #[must_use]
    pub const fn plus_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis.saturating_mul(1_000)))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 2D mote position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Position {
    /// Create a position
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Entry of the host's ordered mote collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoteHandle {
    /// Index in the host collection
    pub index: usize,
    /// Host identifier
    pub id: MoteId,
}

impl MoteHandle {
    /// Create a handle
    #[inline]
    #[must_use]
    pub const fn new(index: usize, id: MoteId) -> Self {
        Self { index, id }
    }
}

/// One line of mote output, delivered at a suspension point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoteEvent {
    /// Simulated time the line was emitted
    pub time: SimTime,
    /// Originating mote
    pub mote: MoteId,
    /// Line content without trailing newline
    pub message: String,
}

impl MoteEvent {
    /// Create an event
    #[must_use]
    pub fn new(time: SimTime, mote: MoteId, message: impl Into<String>) -> Self {
        Self {
            time,
            mote,
            message: message.into(),
        }
    }

    /// Exact content comparison
    #[inline]
    #[must_use]
    pub fn is(&self, message: &str) -> bool {
        self.message == message
    }
}

/// Decimal text a coordinate is sent and logged as
///
/// Shortest representation that round-trips, no exponent, and no trailing
/// `.0` for integral values (`12.5` -> `"12.5"`, `3.0` -> `"3"`).
/// Non-finite values are spelled `Infinity`, `-Infinity` and `NaN`.
#[must_use]
pub fn format_coordinate(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() && value.is_sign_positive() {
        "Infinity".to_string()
    } else if value.is_infinite() {
        "-Infinity".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_text_uses_shortest_decimal() {
        assert_eq!(format_coordinate(12.5), "12.5");
        assert_eq!(format_coordinate(3.0), "3");
        assert_eq!(format_coordinate(-7.25), "-7.25");
        assert_eq!(format_coordinate(0.1), "0.1");
    }

    #[test]
    fn coordinate_text_spells_non_finite_values() {
        assert_eq!(format_coordinate(f64::INFINITY), "Infinity");
        assert_eq!(format_coordinate(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_coordinate(f64::NAN), "NaN");
    }

    #[test]
    fn sim_time_conversions() {
        let t = SimTime::from_millis(600_000);
        assert_eq!(t.as_micros(), 600_000_000);
        assert_eq!(t.as_millis(), 600_000);
        assert_eq!(SimTime(1_999).as_millis(), 1);
        assert_eq!(SimTime::ZERO.plus_millis(5), SimTime(5_000));
    }

    #[test]
    fn mote_event_matches_exact_content() {
        let event = MoteEvent::new(SimTime::ZERO, MoteId(1), "waiting position");
        assert!(event.is("waiting position"));
        assert!(!event.is("waiting position "));
        assert!(!event.is("Waiting position"));
    }
}

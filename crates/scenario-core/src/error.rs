//! Error types for the scenario driver
//!
//! The driver never reports failure to the host; these errors are what the
//! caller of [`ScenarioDriver::run`](crate::ScenarioDriver::run) sees.

use crate::types::MoteId;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Driver phase, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Positioning handshake
    Positioning,
    /// Idle-and-finish loop
    Running,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positioning => f.write_str("positioning"),
            Self::Running => f.write_str("running"),
        }
    }
}

/// Main scenario error type
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// A host call failed
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Host stopped delivering events
    #[error("host closed during {phase} phase")]
    HostClosed {
        /// Phase the driver was in
        phase: Phase,
    },

    /// Opt-in handshake deadline passed with motes still pending
    #[error("positioning timed out after {waited_ms}ms, {} mote(s) pending", .pending.len())]
    HandshakeTimeout {
        /// Motes that never signalled readiness
        pending: Vec<MoteId>,
        /// Simulated time spent in the handshake
        waited_ms: u64,
    },

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ScenarioError {
    /// Check if the host ended the run rather than the scenario failing
    #[inline]
    #[must_use]
    pub fn is_host_abort(&self) -> bool {
        matches!(self, Self::HostClosed { .. })
    }
}

/// Host call errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Mote id not in the host collection
    #[error("unknown mote: {0}")]
    UnknownMote(MoteId),

    /// Serial write refused
    #[error("write to mote {mote} rejected: {reason}")]
    WriteRejected {
        /// Target mote
        mote: MoteId,
        /// Host's explanation
        reason: String,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed to load
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

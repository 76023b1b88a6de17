//! Scenario configuration
//!
//! Loaded from TOML or assembled with the `with_*` builders:
//!
//! ```toml
//! ready_message = "waiting position"
//! success_after_ms = 600000
//! handshake = "keyed"
//! handshake_timeout_ms = 120000
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Line a mote prints when it awaits its coordinates
pub const DEFAULT_READY_MESSAGE: &str = "waiting position";

/// Ten simulated minutes
pub const DEFAULT_SUCCESS_AFTER_MS: u64 = 1000 * 60 * 10;

/// How readiness events are matched to motes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeMode {
    /// Position the mote that sent the ready event, once per mote
    #[default]
    Keyed,
    /// Count ready events in arrival order, yielding once after each
    Sequential,
}

/// Scenario configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Exact content of the readiness line
    pub ready_message: String,
    /// Simulated time after which the run is declared successful
    pub success_after_ms: u64,
    /// Readiness matching
    pub handshake: HandshakeMode,
    /// Upper bound on the handshake in simulated ms, unbounded if unset
    pub handshake_timeout_ms: Option<u64>,
}

impl ScenarioConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With readiness line
    #[inline]
    #[must_use]
    pub fn with_ready_message(mut self, message: impl Into<String>) -> Self {
        self.ready_message = message.into();
        self
    }

    /// With success threshold
    #[inline]
    #[must_use]
    pub fn with_success_after_ms(mut self, millis: u64) -> Self {
        self.success_after_ms = millis;
        self
    }

    /// With handshake mode
    #[inline]
    #[must_use]
    pub fn with_handshake(mut self, mode: HandshakeMode) -> Self {
        self.handshake = mode;
        self
    }

    /// With handshake timeout
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout_ms(mut self, millis: u64) -> Self {
        self.handshake_timeout_ms = Some(millis);
        self
    }

    /// Parse from TOML text and validate
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML or unknown keys
    /// - `ConfigError::Invalid` if validation fails
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file and validate
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - any error of [`ScenarioConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values the driver cannot run with
    ///
    /// # Errors
    /// `ConfigError::Invalid` for an empty or multi-line ready message, or a
    /// zero handshake timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ready_message.is_empty() {
            return Err(ConfigError::Invalid("ready_message must not be empty".into()));
        }
        if self.ready_message.contains('\n') {
            return Err(ConfigError::Invalid(
                "ready_message must be a single line".into(),
            ));
        }
        if self.handshake_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "handshake_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            ready_message: DEFAULT_READY_MESSAGE.to_string(),
            success_after_ms: DEFAULT_SUCCESS_AFTER_MS,
            handshake: HandshakeMode::Keyed,
            handshake_timeout_ms: None,
        }
    }
}

//! Console transcript lines
//!
//! Once positioning is done, every event is logged as `<time> <id>: <msg>`
//! with `time` in simulated microseconds. Analysis tooling reads these lines
//! back from the console log, so the format is parsed here as well.

use crate::types::{MoteEvent, MoteId, SimTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One event line of the console transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    /// Event time in simulated microseconds
    pub time: SimTime,
    /// Originating mote
    pub mote: MoteId,
    /// Line content
    pub message: String,
}

impl From<&MoteEvent> for TranscriptLine {
    fn from(event: &MoteEvent) -> Self {
        Self {
            time: event.time,
            mote: event.mote,
            message: event.message.clone(),
        }
    }
}

impl From<TranscriptLine> for MoteEvent {
    fn from(line: TranscriptLine) -> Self {
        Self {
            time: line.time,
            mote: line.mote,
            message: line.message,
        }
    }
}

impl fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.time, self.mote, self.message)
    }
}

/// Transcript parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptError {
    /// Missing space after the time field
    #[error("missing time field in {0:?}")]
    MissingTime(String),

    /// Missing `:` after the mote id
    #[error("missing mote id separator in {0:?}")]
    MissingSeparator(String),

    /// Time is not an unsigned integer
    #[error("invalid time {0:?}")]
    InvalidTime(String),

    /// Mote id is not an unsigned integer
    #[error("invalid mote id {0:?}")]
    InvalidMote(String),
}

impl FromStr for TranscriptLine {
    type Err = TranscriptError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.strip_suffix('\n').unwrap_or(line);

        let (time, rest) = line
            .split_once(' ')
            .ok_or_else(|| TranscriptError::MissingTime(line.to_string()))?;
        let (mote, message) = rest
            .split_once(':')
            .ok_or_else(|| TranscriptError::MissingSeparator(line.to_string()))?;

        let time = time
            .parse::<u64>()
            .map_err(|_| TranscriptError::InvalidTime(time.to_string()))?;
        let mote = mote
            .parse::<u32>()
            .map_err(|_| TranscriptError::InvalidMote(mote.to_string()))?;
        let message = message.strip_prefix(' ').unwrap_or(message);

        Ok(Self {
            time: SimTime(time),
            mote: MoteId(mote),
            message: message.to_string(),
        })
    }
}

/// Event lines of a console log, skipping everything else
///
/// Positioning lines (`i=0`, `x=12.5`, ...) and free-form host output do not
/// parse and are dropped.
pub fn event_lines<'a, I>(lines: I) -> Vec<TranscriptLine>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter_map(|line| line.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_time_id_message() {
        let line = TranscriptLine {
            time: SimTime(1_234_567),
            mote: MoteId(3),
            message: "sched timer 12 s".into(),
        };
        assert_eq!(line.to_string(), "1234567 3: sched timer 12 s");
    }

    #[test]
    fn parses_rendered_line() {
        let line: TranscriptLine = "600000000 1: result-1 apps=5".parse().unwrap();
        assert_eq!(line.time, SimTime(600_000_000));
        assert_eq!(line.mote, MoteId(1));
        assert_eq!(line.message, "result-1 apps=5");
    }

    #[test]
    fn message_may_contain_separators() {
        let line: TranscriptLine = "10 2: pos (3, 4): ok".parse().unwrap();
        assert_eq!(line.message, "pos (3, 4): ok");

        let empty: TranscriptLine = "10 2:".parse().unwrap();
        assert_eq!(empty.message, "");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(
            "i=0".parse::<TranscriptLine>(),
            Err(TranscriptError::MissingTime(_))
        ));
        assert!(matches!(
            "10 2 hello".parse::<TranscriptLine>(),
            Err(TranscriptError::MissingSeparator(_))
        ));
        assert!(matches!(
            "ten 2: hello".parse::<TranscriptLine>(),
            Err(TranscriptError::InvalidTime(_))
        ));
        assert!(matches!(
            "10 x: hello".parse::<TranscriptLine>(),
            Err(TranscriptError::InvalidMote(_))
        ));
    }

    #[test]
    fn event_lines_skip_positioning_output() {
        let console = ["i=0", "x=12.5", "y=3", "1000 1: pos (12, 3)", "2000 1: hello"];
        let lines = event_lines(console);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "pos (12, 3)");
    }
}

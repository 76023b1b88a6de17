//! Mote firmware model
//!
//! The mote side of the positioning handshake: print the ready line, read x
//! and y from two serial lines, echo `pos (x, y)`, then produce periodic
//! output. Coordinates are held in 8-bit registers, so values wrap modulo 256
//! exactly as the firmware stores them.

use rand::Rng;
use std::ops::Range;

/// Line printed at boot
pub const READY_LINE: &str = "waiting position";

/// Applications bound on every mote
pub const NUM_APPS: u8 = 5;

/// Sink output period
const SINK_PERIOD_MS: u64 = 1_000;

/// Flush period bounds in seconds
const FLUSH_PERIOD_SECS: Range<u64> = 10..30;

/// Mote role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Collects results, prints every second
    Sink,
    /// Schedules randomised flushes
    Node,
}

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareState {
    /// Not started
    Off,
    /// Ready line printed, waiting for x
    AwaitingX,
    /// Waiting for y
    AwaitingY { x: u8 },
    /// Positioned
    Running { x: u8, y: u8 },
}

/// Output of one firmware step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    /// Lines printed to the serial console, in order
    pub lines: Vec<String>,
    /// Delay until the next timer fires
    pub timer_ms: Option<u64>,
}

impl Reaction {
    fn line(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            timer_ms: None,
        }
    }
}

/// Firmware of one mote
#[derive(Debug, Clone)]
pub struct MoteFirmware {
    role: Role,
    state: FirmwareState,
}

impl MoteFirmware {
    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            role,
            state: FirmwareState::Off,
        }
    }

    /// Mote 1 is the sink
    #[must_use]
    pub fn for_mote(id: u32) -> Self {
        Self::new(if id == 1 { Role::Sink } else { Role::Node })
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn state(&self) -> FirmwareState {
        self.state
    }

    /// Position as stored by the firmware, once both lines were read
    #[must_use]
    pub fn position(&self) -> Option<(u8, u8)> {
        match self.state {
            FirmwareState::Running { x, y } => Some((x, y)),
            _ => None,
        }
    }

    pub fn boot(&mut self) -> Reaction {
        self.state = FirmwareState::AwaitingX;
        Reaction::line(READY_LINE)
    }

    /// Handle one line received on the serial input
    pub fn on_serial_line<R: Rng>(&mut self, line: &str, rng: &mut R) -> Reaction {
        match self.state {
            FirmwareState::AwaitingX => {
                self.state = FirmwareState::AwaitingY { x: register(line) };
                Reaction::default()
            }
            FirmwareState::AwaitingY { x } => {
                let y = register(line);
                self.state = FirmwareState::Running { x, y };

                let mut reaction = Reaction::line(format!("pos ({x}, {y})"));
                reaction.lines.push(format!("num_apps={NUM_APPS}"));

                // The sink announces its first flush period like any node,
                // then reports on its own fixed period.
                let secs = rng.random_range(FLUSH_PERIOD_SECS);
                reaction.lines.push(format!("sched timer {secs} s"));
                reaction.timer_ms = Some(match self.role {
                    Role::Sink => SINK_PERIOD_MS,
                    Role::Node => secs * 1_000,
                });
                reaction
            }
            FirmwareState::Off | FirmwareState::Running { .. } => {
                tracing::trace!(line, "serial line ignored");
                Reaction::default()
            }
        }
    }

    /// Handle timer expiry
    pub fn on_timer<R: Rng>(&mut self, rng: &mut R) -> Reaction {
        if !matches!(self.state, FirmwareState::Running { .. }) {
            return Reaction::default();
        }

        let mut lines = Vec::new();
        if self.role == Role::Sink {
            lines.push(format!("result-1 apps={NUM_APPS}"));
        }
        let timer = self.schedule(rng, &mut lines);
        Reaction {
            lines,
            timer_ms: Some(timer),
        }
    }

    fn schedule<R: Rng>(&self, rng: &mut R, lines: &mut Vec<String>) -> u64 {
        match self.role {
            Role::Sink => SINK_PERIOD_MS,
            Role::Node => {
                let secs = rng.random_range(FLUSH_PERIOD_SECS);
                lines.push(format!("sched timer {secs} s"));
                secs * 1_000
            }
        }
    }
}

/// Integer prefix of `text`, C `atoi` style
///
/// Skips leading whitespace, accepts one sign, then reads digits until the
/// first non-digit. No digits yields 0. Saturates instead of overflowing.
#[must_use]
pub fn atoi(text: &str) -> i32 {
    let bytes = text.trim_start().as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let mut value: i64 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }
    i32::try_from(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX))).unwrap_or_default()
}

/// Value an 8-bit coordinate register holds after `atoi(text)`
#[must_use]
pub fn register(text: &str) -> u8 {
    // Two's complement truncation to the low byte.
    (atoi(text) & 0xFF) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn atoi_reads_integer_prefix() {
        assert_eq!(atoi("12.5"), 12);
        assert_eq!(atoi("  42abc"), 42);
        assert_eq!(atoi("-7.9"), -7);
        assert_eq!(atoi("+3"), 3);
        assert_eq!(atoi("x12"), 0);
        assert_eq!(atoi(""), 0);
        assert_eq!(atoi("99999999999"), i32::MAX);
        assert_eq!(atoi("-99999999999"), i32::MIN);
    }

    #[test]
    fn register_wraps_to_eight_bits() {
        assert_eq!(register("37.8"), 37);
        assert_eq!(register("256"), 0);
        assert_eq!(register("300"), 44);
        assert_eq!(register("-1"), 255);
    }

    #[test]
    fn handshake_sequence() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut fw = MoteFirmware::for_mote(2);

        assert_eq!(fw.boot().lines, vec![READY_LINE.to_string()]);
        assert_eq!(fw.state(), FirmwareState::AwaitingX);

        assert!(fw.on_serial_line("12.5", &mut rng).lines.is_empty());
        let reaction = fw.on_serial_line("3", &mut rng);

        assert_eq!(reaction.lines[0], "pos (12, 3)");
        assert_eq!(reaction.lines[1], "num_apps=5");
        assert!(reaction.lines[2].starts_with("sched timer "));
        let timer = reaction.timer_ms.unwrap();
        assert!((10_000..30_000).contains(&timer));
        assert_eq!(fw.position(), Some((12, 3)));
    }

    #[test]
    fn extra_serial_lines_are_ignored() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut fw = MoteFirmware::for_mote(3);
        fw.boot();
        fw.on_serial_line("1", &mut rng);
        fw.on_serial_line("2", &mut rng);

        assert_eq!(fw.on_serial_line("9", &mut rng), Reaction::default());
        assert_eq!(fw.position(), Some((1, 2)));
    }

    #[test]
    fn sink_reports_every_second() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut fw = MoteFirmware::for_mote(1);
        assert_eq!(fw.role(), Role::Sink);

        fw.boot();
        fw.on_serial_line("0", &mut rng);
        let positioned = fw.on_serial_line("0", &mut rng);
        assert_eq!(positioned.lines.len(), 3);
        assert!(positioned.lines[2].starts_with("sched timer "));
        assert_eq!(positioned.timer_ms, Some(1_000));

        let tick = fw.on_timer(&mut rng);
        assert_eq!(tick.lines, vec!["result-1 apps=5".to_string()]);
        assert_eq!(tick.timer_ms, Some(1_000));
    }

    #[test]
    fn timer_before_positioning_does_nothing() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut fw = MoteFirmware::for_mote(4);
        fw.boot();
        assert_eq!(fw.on_timer(&mut rng), Reaction::default());
    }
}

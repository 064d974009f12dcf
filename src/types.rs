//! Core protocol types: positions, actions, commands and error reasons.

use crate::config::POSITION_COUNT;

/// A validated board position, letters A-Y (indices 0-24).
///
/// Positions double as touch sensor indices; the same letter addresses both
/// the LED cluster and the capacitive sensor beneath it. Construction is
/// only possible through validation, so a `Position` held anywhere in the
/// engine is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Position(u8);

impl Position {
    /// Number of valid positions.
    pub const COUNT: usize = POSITION_COUNT;

    /// Creates a position from a letter, case-insensitive.
    ///
    /// Returns `None` for anything outside A-Y.
    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        if upper.is_ascii_uppercase() && (upper as u8) < b'A' + Self::COUNT as u8 {
            Some(Position(upper as u8 - b'A'))
        } else {
            None
        }
    }

    /// Creates a position from a raw index.
    pub fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Position(index as u8))
        } else {
            None
        }
    }

    /// The zero-based index of this position.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The uppercase letter for this position.
    #[inline]
    pub fn letter(self) -> char {
        (b'A' + self.0) as char
    }
}

/// The closed set of protocol actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Light a position solid (blue).
    Show,
    /// Turn a position off.
    Hide,
    /// Run the expansion animation at a position (long-running).
    Success,
    /// Start blinking a position (orange).
    Blink,
    /// Stop blinking a position.
    StopBlink,
    /// Arm a one-shot expectation for the next touch on a sensor.
    ExpectDown,
    /// Arm a one-shot expectation for the next release on a sensor.
    ExpectUp,
    /// Recalibrate one sensor.
    Recalibrate,
    /// Recalibrate every sensor, chunked across ticks (long-running).
    RecalibrateAll,
    /// Report the list of active sensors (long-running, single tick).
    Scan,
    /// Run the global celebration animation (long-running).
    SequenceCompleted,
    /// Report firmware identification.
    Info,
    /// Liveness check.
    Ping,
}

impl Action {
    /// Parses an action token, case-insensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        const TABLE: [(&str, Action); 13] = [
            ("SHOW", Action::Show),
            ("HIDE", Action::Hide),
            ("SUCCESS", Action::Success),
            ("BLINK", Action::Blink),
            ("STOP_BLINK", Action::StopBlink),
            ("EXPECT_DOWN", Action::ExpectDown),
            ("EXPECT_UP", Action::ExpectUp),
            ("RECALIBRATE", Action::Recalibrate),
            ("RECALIBRATE_ALL", Action::RecalibrateAll),
            ("SCAN", Action::Scan),
            ("SEQUENCE_COMPLETED", Action::SequenceCompleted),
            ("INFO", Action::Info),
            ("PING", Action::Ping),
        ];

        TABLE
            .iter()
            .find(|(name, _)| token.eq_ignore_ascii_case(name))
            .map(|&(_, action)| action)
    }

    /// Wire name of this action, as echoed in ACK/DONE lines.
    pub fn name(self) -> &'static str {
        match self {
            Action::Show => "SHOW",
            Action::Hide => "HIDE",
            Action::Success => "SUCCESS",
            Action::Blink => "BLINK",
            Action::StopBlink => "STOP_BLINK",
            Action::ExpectDown => "EXPECT_DOWN",
            Action::ExpectUp => "EXPECT_UP",
            Action::Recalibrate => "RECALIBRATE",
            Action::RecalibrateAll => "RECALIBRATE_ALL",
            Action::Scan => "SCAN",
            Action::SequenceCompleted => "SEQUENCE_COMPLETED",
            Action::Info => "INFO",
            Action::Ping => "PING",
        }
    }

    /// Whether a position argument is mandatory for this action.
    pub fn requires_position(self) -> bool {
        matches!(
            self,
            Action::Show
                | Action::Hide
                | Action::Success
                | Action::Blink
                | Action::StopBlink
                | Action::ExpectDown
                | Action::ExpectUp
                | Action::Recalibrate
        )
    }

    /// Whether this action spans multiple ticks and completes via DONE.
    pub fn is_long_running(self) -> bool {
        matches!(
            self,
            Action::Success | Action::Scan | Action::RecalibrateAll | Action::SequenceCompleted
        )
    }
}

/// A parsed command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// What to do.
    pub action: Action,
    /// Target position, when supplied.
    pub position: Option<Position>,
    /// Correlation id, echoed verbatim on every response to this command.
    pub correlation_id: Option<u32>,
}

/// The closed set of protocol error reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorReason {
    /// Malformed line: missing required position, stray token, bad id.
    BadFormat,
    /// Action token not in the protocol vocabulary.
    UnknownAction,
    /// Single-letter token outside A-Y.
    UnknownPosition,
    /// Unterminated input exceeded the line length limit.
    LineTooLong,
    /// Long-running command queue has no free slot.
    Busy,
    /// Command needs the touch subsystem but none is configured.
    NoTouchController,
    /// The underlying hardware operation reported failure.
    CommandFailed,
}

impl ErrorReason {
    /// Wire representation, as carried on ERR lines.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorReason::BadFormat => "bad_format",
            ErrorReason::UnknownAction => "unknown_action",
            ErrorReason::UnknownPosition => "unknown_position",
            ErrorReason::LineTooLong => "line_too_long",
            ErrorReason::Busy => "busy",
            ErrorReason::NoTouchController => "no_touch_controller",
            ErrorReason::CommandFailed => "command_failed",
        }
    }
}

impl core::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parse failure, carrying whatever correlation id had already been read.
///
/// The id lets the error response still be correlated when the malformed
/// token appears after a valid `#id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    /// Why the line was rejected.
    pub reason: ErrorReason,
    /// Correlation id parsed before the failure, if any.
    pub correlation_id: Option<u32>,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.correlation_id {
            Some(id) => write!(f, "parse error: {} (#{})", self.reason, id),
            None => write!(f, "parse error: {}", self.reason),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_accepts_full_letter_range() {
        assert_eq!(Position::from_letter('A').map(Position::index), Some(0));
        assert_eq!(Position::from_letter('Y').map(Position::index), Some(24));
        assert_eq!(Position::from_letter('m').map(Position::letter), Some('M'));
        assert!(Position::from_letter('Z').is_none());
        assert!(Position::from_letter('1').is_none());
        assert!(Position::from_letter('#').is_none());
    }

    #[test]
    fn position_from_index_bounds() {
        assert_eq!(Position::from_index(24).map(Position::letter), Some('Y'));
        assert!(Position::from_index(25).is_none());
    }

    #[test]
    fn action_tokens_are_case_insensitive() {
        assert_eq!(Action::from_token("show"), Some(Action::Show));
        assert_eq!(Action::from_token("Stop_Blink"), Some(Action::StopBlink));
        assert_eq!(
            Action::from_token("RECALIBRATE_ALL"),
            Some(Action::RecalibrateAll)
        );
        assert_eq!(Action::from_token("SHOWN"), None);
        assert_eq!(Action::from_token(""), None);
    }

    #[test]
    fn action_classification_matches_protocol() {
        for action in [
            Action::Success,
            Action::Scan,
            Action::RecalibrateAll,
            Action::SequenceCompleted,
        ] {
            assert!(action.is_long_running(), "{} long-running", action.name());
        }
        for action in [
            Action::Show,
            Action::Hide,
            Action::Blink,
            Action::StopBlink,
            Action::ExpectDown,
            Action::ExpectUp,
            Action::Recalibrate,
            Action::Info,
            Action::Ping,
        ] {
            assert!(!action.is_long_running(), "{} instant", action.name());
        }
        assert!(Action::Recalibrate.requires_position());
        assert!(!Action::RecalibrateAll.requires_position());
        assert!(!Action::Ping.requires_position());
    }
}

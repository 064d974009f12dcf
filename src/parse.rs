//! Command line parsing.
//!
//! Grammar: `ACTION [POSITION] [#ID]`, whitespace-separated, action matching
//! case-insensitive. Position and id may appear in either order. An optional
//! `PI>` framing prefix (commands injected by a co-located simulator) is
//! stripped before parsing and is not part of the grammar proper.

use crate::config::HOST_PREFIX;
use crate::types::{Action, Command, ErrorReason, ParseError, Position};

/// Parses one line into a [`Command`].
///
/// Parsing has no side effects; on failure the returned [`ParseError`]
/// carries whatever correlation id had already been read so the caller can
/// still correlate the ERR response.
pub fn parse_line(line: &str) -> Result<Command, ParseError> {
    let mut rest = line.trim_start();
    if let Some(stripped) = rest.strip_prefix(HOST_PREFIX) {
        rest = stripped.trim_start();
    }

    let mut tokens = rest.split_ascii_whitespace();

    let action_token = tokens.next().ok_or(ParseError {
        reason: ErrorReason::BadFormat,
        correlation_id: None,
    })?;
    let action = Action::from_token(action_token).ok_or(ParseError {
        reason: ErrorReason::UnknownAction,
        correlation_id: None,
    })?;

    let mut position = None;
    let mut correlation_id = None;

    for token in tokens {
        if let Some(digits) = token.strip_prefix('#') {
            correlation_id = Some(parse_correlation_id(digits, correlation_id)?);
        } else if token.len() == 1 {
            let letter = token.chars().next().unwrap_or_default();
            position = Some(Position::from_letter(letter).ok_or(ParseError {
                reason: ErrorReason::UnknownPosition,
                correlation_id,
            })?);
        } else {
            return Err(ParseError {
                reason: ErrorReason::BadFormat,
                correlation_id,
            });
        }
    }

    if action.requires_position() && position.is_none() {
        return Err(ParseError {
            reason: ErrorReason::BadFormat,
            correlation_id,
        });
    }

    Ok(Command {
        action,
        position,
        correlation_id,
    })
}

/// The whole token after `#` must be one or more decimal digits; anything
/// else (including a u32 overflow) is a format error.
fn parse_correlation_id(digits: &str, parsed_so_far: Option<u32>) -> Result<u32, ParseError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError {
            reason: ErrorReason::BadFormat,
            correlation_id: parsed_so_far,
        });
    }
    digits.parse().map_err(|_| ParseError {
        reason: ErrorReason::BadFormat,
        correlation_id: parsed_so_far,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(reason: ErrorReason, correlation_id: Option<u32>) -> ParseError {
        ParseError {
            reason,
            correlation_id,
        }
    }

    #[test]
    fn parses_action_position_and_id() {
        let cmd = parse_line("SHOW A #42").unwrap();
        assert_eq!(cmd.action, Action::Show);
        assert_eq!(cmd.position.map(Position::letter), Some('A'));
        assert_eq!(cmd.correlation_id, Some(42));
    }

    #[test]
    fn id_may_precede_position() {
        let cmd = parse_line("EXPECT_DOWN #7 k").unwrap();
        assert_eq!(cmd.action, Action::ExpectDown);
        assert_eq!(cmd.position.map(Position::letter), Some('K'));
        assert_eq!(cmd.correlation_id, Some(7));
    }

    #[test]
    fn action_matching_is_case_insensitive() {
        assert_eq!(parse_line("ping").unwrap().action, Action::Ping);
        assert_eq!(
            parse_line("sequence_completed #1").unwrap().action,
            Action::SequenceCompleted
        );
    }

    #[test]
    fn bare_actions_parse_without_arguments() {
        let cmd = parse_line("SCAN").unwrap();
        assert_eq!(cmd.action, Action::Scan);
        assert_eq!(cmd.position, None);
        assert_eq!(cmd.correlation_id, None);
    }

    #[test]
    fn host_prefix_is_stripped() {
        let cmd = parse_line("PI> SHOW B #3").unwrap();
        assert_eq!(cmd.action, Action::Show);
        assert_eq!(cmd.position.map(Position::letter), Some('B'));
        assert_eq!(cmd.correlation_id, Some(3));
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert_eq!(
            parse_line("FOO A"),
            Err(err(ErrorReason::UnknownAction, None))
        );
    }

    #[test]
    fn invalid_letter_is_unknown_position() {
        assert_eq!(
            parse_line("SHOW Z"),
            Err(err(ErrorReason::UnknownPosition, None))
        );
    }

    #[test]
    fn missing_required_position_is_bad_format() {
        assert_eq!(parse_line("SHOW"), Err(err(ErrorReason::BadFormat, None)));
        assert_eq!(
            parse_line("RECALIBRATE #9"),
            Err(err(ErrorReason::BadFormat, Some(9)))
        );
    }

    #[test]
    fn stray_multichar_token_is_bad_format() {
        assert_eq!(
            parse_line("SHOW AB"),
            Err(err(ErrorReason::BadFormat, None))
        );
    }

    #[test]
    fn malformed_id_is_bad_format() {
        assert_eq!(parse_line("PING #"), Err(err(ErrorReason::BadFormat, None)));
        assert_eq!(
            parse_line("PING #12x"),
            Err(err(ErrorReason::BadFormat, None))
        );
        // u32 overflow
        assert_eq!(
            parse_line("PING #99999999999"),
            Err(err(ErrorReason::BadFormat, None))
        );
    }

    #[test]
    fn error_after_valid_id_keeps_the_id() {
        assert_eq!(
            parse_line("SHOW #5 Z"),
            Err(err(ErrorReason::UnknownPosition, Some(5)))
        );
        assert_eq!(
            parse_line("PING #5 garbage"),
            Err(err(ErrorReason::BadFormat, Some(5)))
        );
    }

    #[test]
    fn empty_line_is_bad_format() {
        assert_eq!(parse_line(""), Err(err(ErrorReason::BadFormat, None)));
        assert_eq!(parse_line("   "), Err(err(ErrorReason::BadFormat, None)));
        assert_eq!(parse_line("PI>"), Err(err(ErrorReason::BadFormat, None)));
    }

    #[test]
    fn max_correlation_id_round_trips() {
        let cmd = parse_line("PING #4294967295").unwrap();
        assert_eq!(cmd.correlation_id, Some(u32::MAX));
    }
}

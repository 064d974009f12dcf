//! Protocol and timing constants.
//!
//! Everything here is a protocol contract or a board-wide tuning value.
//! Per-board wiring (sensor addresses, LED layout) is injectable
//! configuration instead, see [`crate::touch::TouchConfig`] and
//! [`crate::led::LedLayout`].

/// Firmware version reported by INFO.
pub const FIRMWARE_VERSION: &str = "2.0.0";

/// Protocol version reported by INFO.
pub const PROTOCOL_VERSION: &str = "2";

/// Prefix on every line the engine emits.
pub const DEVICE_PREFIX: &str = "ARDUINO> ";

/// Optional framing prefix stripped from incoming lines.
pub const HOST_PREFIX: &str = "PI>";

/// Number of board positions (letters A-Y).
pub const POSITION_COUNT: usize = 25;

/// Maximum accepted command line length, terminator excluded.
pub const MAX_LINE_LEN: usize = 64;

/// Receive ring capacity in bytes.
pub const RX_BUFFER_CAPACITY: usize = 128;

/// Concurrent long-running command slots.
pub const COMMAND_QUEUE_CAPACITY: usize = 8;

/// Outgoing event queue capacity.
pub const EVENT_QUEUE_CAPACITY: usize = 16;

/// Upper bound on events flushed to the transport per tick.
pub const MAX_EVENTS_PER_FLUSH: usize = 8;

/// Minimum interval between touch polling sweeps (ms).
pub const TOUCH_POLL_INTERVAL_MS: u64 = 10;

/// Stability window before a raw touch reading is accepted (ms).
pub const DEBOUNCE_MS: u64 = 30;

/// Sensors recalibrated per tick during a RECALIBRATE_ALL sweep.
pub const RECALIBRATIONS_PER_TICK: usize = 5;

/// Pixels the SUCCESS animation expands to on each side of the center.
pub const SUCCESS_EXPANSION_RADIUS: u8 = 5;

/// Interval between SUCCESS expansion steps (ms).
pub const ANIMATION_STEP_MS: u64 = 80;

/// Blink toggle interval (ms).
pub const BLINK_INTERVAL_MS: u64 = 150;

/// Interval between celebration brightness steps (ms).
pub const CELEBRATION_STEP_MS: u64 = 150;

/// Total celebration steps before the board clears.
pub const CELEBRATION_TOTAL_STEPS: u8 = 8;

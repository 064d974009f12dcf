#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`Executor`**: The engine; call `service()` from the firmware main loop
//! - **`Transport`**: Trait to implement for your serial hardware
//! - **`LedDriver`**: Trait to implement for your LED strips
//! - **`SensorBus`**: Trait to implement for your touch sensor bus
//! - **`TimeSource`**: Trait to implement for your timing system
//! - **`LedAnimator`**: Per-position LED state machines (show, blink, expansion, celebration)
//! - **`TouchDebouncer`**: Sensor polling, debouncing and one-shot touch expectations
//! - **`CommandQueue`**: Slot queue for long-running commands completing across ticks
//! - **`EventQueue`**: Bounded FIFO of outgoing response lines
//!
//! The library uses `Srgb<f32>` (0.0-1.0 range) for all color values. When
//! implementing `LedDriver` for your hardware, convert these values to your
//! device's native format (e.g., 8-bit integers).

// Re-export Srgb from palette for user convenience
pub use palette::Srgb;

pub mod time;
pub mod types;
pub mod config;
pub mod line;
pub mod parse;
pub mod event;
pub mod touch;
pub mod led;
pub mod dispatch;
pub mod executor;

pub use dispatch::CommandQueue;
pub use event::{Event, EventKind, EventQueue, Transport};
pub use executor::Executor;
pub use led::{LedAnimator, LedDriver, LedLayout, LedMapping, Phase, StripId};
pub use line::{LineAssembler, LineResult};
pub use parse::parse_line;
pub use time::{TimeDuration, TimeInstant, TimeSource};
pub use touch::{SensorBus, TouchConfig, TouchDebouncer};
pub use types::{Action, Command, ErrorReason, ParseError, Position};

/// All pixels off.
pub const COLOR_OFF: Srgb = Srgb::new(0.0, 0.0, 0.0);
/// SHOW color (blue).
pub const COLOR_SHOW: Srgb = Srgb::new(0.0, 0.0, 1.0);
/// SUCCESS and celebration color (green).
pub const COLOR_SUCCESS: Srgb = Srgb::new(0.0, 1.0, 0.0);
/// BLINK color (orange).
pub const COLOR_BLINK: Srgb = Srgb::new(1.0, 0.39, 0.0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_types_compile() {
        let _ = Action::Ping;
        let _ = ErrorReason::Busy;
        let _ = Phase::Idle;
        let _ = StripId::Strip1;
        assert_eq!(Position::COUNT, 25);
    }
}

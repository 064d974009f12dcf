//! The top-level engine: owns the collaborators and drives one cooperative
//! tick per [`Executor::service`] call.
//!
//! A tick drains the transport, assembles and dispatches complete lines,
//! advances the long-running command queue, polls touch, advances the LED
//! animations and flushes a bounded number of response lines. Nothing in
//! the tick blocks, so the caller's loop stays responsive at any input
//! rate.

use crate::dispatch::CommandQueue;
use crate::event::{Event, EventQueue, Transport};
use crate::led::{LedAnimator, LedDriver};
use crate::line::{LineAssembler, LineResult};
use crate::parse::parse_line;
use crate::time::{TimeInstant, TimeSource};
use crate::touch::{SensorBus, TouchDebouncer};
use crate::types::ErrorReason;

/// Serial protocol engine for an LED/touch board.
///
/// Construct once with the board's collaborators and call
/// [`Self::service`] from the firmware main loop. The touch subsystem is
/// optional; boards without one still serve every LED command and reject
/// touch commands with a protocol error.
///
/// # Type Parameters
/// * `T` - Time source implementation
/// * `W` - Byte transport implementation
/// * `D` - LED driver implementation
/// * `B` - Sensor bus implementation
/// * `I` - Time instant type
pub struct Executor<'t, T, W, D, B, I>
where
    T: TimeSource<I>,
    W: Transport,
    D: LedDriver,
    B: SensorBus,
    I: TimeInstant,
{
    transport: W,
    time_source: &'t T,
    line: LineAssembler,
    commands: CommandQueue,
    events: EventQueue,
    led: LedAnimator<D, I>,
    touch: Option<TouchDebouncer<B, I>>,
}

impl<'t, T, W, D, B, I> Executor<'t, T, W, D, B, I>
where
    T: TimeSource<I>,
    W: Transport,
    D: LedDriver,
    B: SensorBus,
    I: TimeInstant,
{
    /// Creates an engine from its collaborators.
    ///
    /// Pass an already-initialized debouncer (or `None` for boards without
    /// touch hardware).
    pub fn new(
        transport: W,
        time_source: &'t T,
        led: LedAnimator<D, I>,
        touch: Option<TouchDebouncer<B, I>>,
    ) -> Self {
        Self {
            transport,
            time_source,
            line: LineAssembler::new(),
            commands: CommandQueue::new(),
            events: EventQueue::new(),
            led,
            touch,
        }
    }

    /// Runs one cooperative tick.
    ///
    /// Call this from the main loop as often as possible; all timing is
    /// derived from the time source, so the call rate only bounds latency,
    /// never correctness.
    pub fn service(&mut self) {
        let now = self.time_source.now();

        while let Some(byte) = self.transport.try_read() {
            self.line.feed(byte);
        }

        while let Some(result) = self.line.try_extract_line() {
            match result {
                LineResult::Overflow => {
                    self.events
                        .enqueue(Event::err(ErrorReason::LineTooLong, None));
                }
                LineResult::Line(line) => {
                    self.process_line(line.trim(), now);
                }
            }
        }

        self.commands
            .tick(&mut self.led, self.touch.as_mut(), &mut self.events);
        if let Some(touch) = self.touch.as_mut() {
            touch.tick(now, &mut self.events);
        }
        self.led.tick(now);
        self.events.flush_default(&mut self.transport);
    }

    /// Dispatches a command line from inside the firmware, bypassing the
    /// transport receive path.
    ///
    /// Responses still go out through the normal event queue on the next
    /// [`Self::service`] flush.
    pub fn inject_command(&mut self, line: &str) {
        let now = self.time_source.now();
        self.process_line(line.trim(), now);
    }

    /// Whether a position's sensor is currently touched (debounced).
    ///
    /// Returns `false` on boards without touch hardware.
    pub fn is_touched(&self, position: crate::types::Position) -> bool {
        self.touch
            .as_ref()
            .is_some_and(|touch| touch.is_touched(position))
    }

    /// The LED animator, for state queries.
    pub fn led(&self) -> &LedAnimator<D, I> {
        &self.led
    }

    /// The touch debouncer, when the board has one.
    pub fn touch(&self) -> Option<&TouchDebouncer<B, I>> {
        self.touch.as_ref()
    }

    /// Number of in-flight long-running commands.
    pub fn active_commands(&self) -> usize {
        self.commands.active_count()
    }

    /// Number of response events awaiting flush.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    fn process_line(&mut self, line: &str, now: I) {
        // Blank lines (bare terminators, padding) are silently skipped.
        if line.is_empty() {
            return;
        }
        match parse_line(line) {
            Ok(command) => {
                self.commands.dispatch(
                    command,
                    now,
                    &mut self.led,
                    self.touch.as_mut(),
                    &mut self.events,
                );
            }
            Err(error) => {
                self.events
                    .enqueue(Event::err(error.reason, error.correlation_id));
            }
        }
    }
}

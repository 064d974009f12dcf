//! Command dispatch and the long-running command queue.
//!
//! Instant commands execute and acknowledge inside the dispatch call.
//! Long-running commands are validated, acknowledged and parked in a
//! fixed-slot queue; each tick advances every occupied slot and emits the
//! completion event when its work finishes. Slots never block each other,
//! so a SUCCESS animation and a RECALIBRATE_ALL sweep run concurrently.

use crate::config::{COMMAND_QUEUE_CAPACITY, POSITION_COUNT, RECALIBRATIONS_PER_TICK};
use crate::event::{Event, EventQueue};
use crate::led::{LedAnimator, LedDriver};
use crate::time::TimeInstant;
use crate::touch::{SensorBus, TouchDebouncer};
use crate::types::{Action, Command, ErrorReason};

/// A long-running command occupying a queue slot.
#[derive(Debug, Clone, Copy)]
struct QueuedCommand {
    command: Command,
    /// Sweep progress for RECALIBRATE_ALL; unused by other actions.
    cursor: usize,
}

/// Fixed-slot queue of in-flight long-running commands.
#[derive(Default)]
pub struct CommandQueue {
    slots: [Option<QueuedCommand>; COMMAND_QUEUE_CAPACITY],
}

impl CommandQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            slots: [None; COMMAND_QUEUE_CAPACITY],
        }
    }

    /// Whether every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Number of in-flight long-running commands.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Executes or admits one parsed command.
    ///
    /// Every path enqueues exactly one of ACK or ERR; collaborator
    /// requirements are checked before any slot is claimed, so a rejected
    /// command produces a single error line.
    pub fn dispatch<D, B, I>(
        &mut self,
        command: Command,
        now: I,
        led: &mut LedAnimator<D, I>,
        mut touch: Option<&mut TouchDebouncer<B, I>>,
        events: &mut EventQueue,
    ) where
        D: LedDriver,
        B: SensorBus,
        I: TimeInstant,
    {
        if command.action.is_long_running() {
            self.admit(command, now, led, touch.as_deref_mut(), events);
        } else {
            self.execute_instant(command, now, led, touch.as_deref_mut(), events);
        }
    }

    /// Advances every occupied slot, emitting completions.
    pub fn tick<D, B, I>(
        &mut self,
        led: &mut LedAnimator<D, I>,
        mut touch: Option<&mut TouchDebouncer<B, I>>,
        events: &mut EventQueue,
    ) where
        D: LedDriver,
        B: SensorBus,
        I: TimeInstant,
    {
        for slot in &mut self.slots {
            let Some(queued) = slot.as_mut() else {
                continue;
            };
            let command = queued.command;

            let finished = match command.action {
                Action::Success => {
                    match command.position {
                        Some(position) => led.is_animation_complete(position),
                        None => true,
                    }
                }
                Action::Scan => {
                    let list = match touch.as_deref_mut() {
                        Some(touch) => touch.active_sensor_list(),
                        None => heapless::String::new(),
                    };
                    events.enqueue(Event::scanned(&list, command.correlation_id));
                    true
                }
                Action::RecalibrateAll => {
                    if let Some(touch) = touch.as_deref_mut() {
                        let end = (queued.cursor + RECALIBRATIONS_PER_TICK).min(POSITION_COUNT);
                        for index in queued.cursor..end {
                            touch.recalibrate_index(index);
                        }
                        queued.cursor = end;
                    } else {
                        queued.cursor = POSITION_COUNT;
                    }
                    if queued.cursor >= POSITION_COUNT {
                        events.enqueue(Event::recalibrated(None, command.correlation_id));
                        true
                    } else {
                        false
                    }
                }
                Action::SequenceCompleted => led.is_celebration_complete(),
                // Instant actions never occupy a slot.
                _ => true,
            };

            if finished {
                match command.action {
                    Action::Success | Action::SequenceCompleted => {
                        events.enqueue(Event::done(
                            command.action,
                            command.position,
                            command.correlation_id,
                        ));
                    }
                    // SCAN and RECALIBRATE_ALL complete through their own
                    // event shapes.
                    _ => {}
                }
                *slot = None;
            }
        }
    }

    fn admit<D, B, I>(
        &mut self,
        command: Command,
        now: I,
        led: &mut LedAnimator<D, I>,
        touch: Option<&mut TouchDebouncer<B, I>>,
        events: &mut EventQueue,
    ) where
        D: LedDriver,
        B: SensorBus,
        I: TimeInstant,
    {
        let needs_touch = matches!(command.action, Action::Scan | Action::RecalibrateAll);
        if needs_touch && touch.is_none() {
            events.enqueue(Event::err(
                ErrorReason::NoTouchController,
                command.correlation_id,
            ));
            return;
        }

        let Some(slot) = self.slots.iter_mut().find(|s| s.is_none()) else {
            events.enqueue(Event::err(ErrorReason::Busy, command.correlation_id));
            return;
        };

        match command.action {
            Action::Success => {
                let Some(position) = command.position else {
                    events.enqueue(Event::err(
                        ErrorReason::CommandFailed,
                        command.correlation_id,
                    ));
                    return;
                };
                led.success(position, now);
            }
            Action::SequenceCompleted => {
                led.start_celebration(now);
            }
            _ => {}
        }

        *slot = Some(QueuedCommand { command, cursor: 0 });
        events.enqueue(Event::ack(
            command.action,
            command.position,
            command.correlation_id,
        ));
    }

    fn execute_instant<D, B, I>(
        &mut self,
        command: Command,
        now: I,
        led: &mut LedAnimator<D, I>,
        touch: Option<&mut TouchDebouncer<B, I>>,
        events: &mut EventQueue,
    ) where
        D: LedDriver,
        B: SensorBus,
        I: TimeInstant,
    {
        let ack = Event::ack(command.action, command.position, command.correlation_id);

        match command.action {
            Action::Show | Action::Hide | Action::Blink | Action::StopBlink => {
                let Some(position) = command.position else {
                    events.enqueue(Event::err(
                        ErrorReason::CommandFailed,
                        command.correlation_id,
                    ));
                    return;
                };
                match command.action {
                    Action::Show => led.show(position),
                    Action::Hide => led.hide(position),
                    Action::Blink => led.blink(position, now),
                    Action::StopBlink => led.stop_blink(position),
                    _ => unreachable!(),
                }
                events.enqueue(ack);
            }
            Action::Recalibrate => {
                let (Some(position), Some(touch)) = (command.position, touch) else {
                    let reason = if command.position.is_none() {
                        ErrorReason::CommandFailed
                    } else {
                        ErrorReason::NoTouchController
                    };
                    events.enqueue(Event::err(reason, command.correlation_id));
                    return;
                };
                if touch.recalibrate(position) {
                    events.enqueue(ack);
                    events.enqueue(Event::recalibrated(
                        Some(position),
                        command.correlation_id,
                    ));
                } else {
                    events.enqueue(Event::err(
                        ErrorReason::CommandFailed,
                        command.correlation_id,
                    ));
                }
            }
            Action::ExpectDown | Action::ExpectUp => {
                let (Some(position), Some(touch)) = (command.position, touch) else {
                    let reason = if command.position.is_none() {
                        ErrorReason::CommandFailed
                    } else {
                        ErrorReason::NoTouchController
                    };
                    events.enqueue(Event::err(reason, command.correlation_id));
                    return;
                };
                if command.action == Action::ExpectDown {
                    touch.expect_down(position, command.correlation_id);
                } else {
                    touch.expect_up(position, command.correlation_id);
                }
                events.enqueue(ack);
            }
            Action::Info => {
                events.enqueue(Event::info(command.correlation_id));
            }
            Action::Ping => {
                events.enqueue(ack);
            }
            // Long-running actions are routed through admit().
            _ => {}
        }
    }
}

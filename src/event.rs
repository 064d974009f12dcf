//! Outgoing event queue and wire serialization.
//!
//! Events decouple production (dispatch, touch debouncing, animation
//! completion) from the transport write rate: producers enqueue, the tick
//! loop flushes a bounded number of lines per tick. The queue is a fixed
//! FIFO; when it is full new events are dropped rather than blocking, an
//! accepted at-most-once-delivery tradeoff.

use crate::config::{
    DEVICE_PREFIX, EVENT_QUEUE_CAPACITY, FIRMWARE_VERSION, MAX_EVENTS_PER_FLUSH, PROTOCOL_VERSION,
};
use crate::types::{Action, ErrorReason, Position};
use core::fmt::Write as _;
use heapless::{Deque, String};

/// Maximum payload length (sized for `SCANNED` with all 25 letters).
pub const EVENT_PAYLOAD_LEN: usize = 52;

/// Maximum rendered line length, device prefix included.
pub const EVENT_LINE_LEN: usize = 96;

/// Byte-level transport the engine owns exclusively.
///
/// Both ends are non-blocking: `try_read` returns immediately and `write`
/// must not wait for drainage (buffer or drop internally as the hardware
/// requires).
pub trait Transport {
    /// Returns the next received byte, if one is available.
    fn try_read(&mut self) -> Option<u8>;

    /// Writes bytes to the host.
    fn write(&mut self, bytes: &[u8]);
}

/// Discriminates the response line formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    /// Command accepted (instant commands: also completed).
    Ack,
    /// Long-running command completed.
    Done,
    /// Command rejected or failed.
    Err,
    /// Spontaneous touch press.
    TouchDown,
    /// Spontaneous touch release.
    TouchUp,
    /// Expected touch press (EXPECT_DOWN fulfillment).
    TouchedDown,
    /// Expected touch release (EXPECT_UP fulfillment).
    TouchedUp,
    /// Active-sensor listing (SCAN result).
    Scanned,
    /// Sensor recalibration confirmation.
    Recalibrated,
    /// Firmware identification.
    Info,
}

/// One outgoing protocol event, immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    action: Option<&'static str>,
    position: Option<char>,
    correlation_id: Option<u32>,
    payload: String<EVENT_PAYLOAD_LEN>,
}

impl Event {
    /// Acknowledgement for a command, echoing action, position and id.
    pub fn ack(action: Action, position: Option<Position>, correlation_id: Option<u32>) -> Self {
        Self {
            kind: EventKind::Ack,
            action: Some(action.name()),
            position: position.map(Position::letter),
            correlation_id,
            payload: String::new(),
        }
    }

    /// Completion of a long-running command.
    pub fn done(action: Action, position: Option<Position>, correlation_id: Option<u32>) -> Self {
        Self {
            kind: EventKind::Done,
            action: Some(action.name()),
            position: position.map(Position::letter),
            correlation_id,
            payload: String::new(),
        }
    }

    /// Error response.
    pub fn err(reason: ErrorReason, correlation_id: Option<u32>) -> Self {
        let mut payload = String::new();
        let _ = payload.push_str(reason.as_str());
        Self {
            kind: EventKind::Err,
            action: None,
            position: None,
            correlation_id,
            payload,
        }
    }

    /// Spontaneous touch press. Never carries a correlation id.
    pub fn touch_down(position: Position) -> Self {
        Self {
            kind: EventKind::TouchDown,
            action: None,
            position: Some(position.letter()),
            correlation_id: None,
            payload: String::new(),
        }
    }

    /// Spontaneous touch release. Never carries a correlation id.
    pub fn touch_up(position: Position) -> Self {
        Self {
            kind: EventKind::TouchUp,
            action: None,
            position: Some(position.letter()),
            correlation_id: None,
            payload: String::new(),
        }
    }

    /// Fulfillment of an EXPECT_DOWN expectation.
    pub fn touched_down(position: Position, correlation_id: Option<u32>) -> Self {
        Self {
            kind: EventKind::TouchedDown,
            action: None,
            position: Some(position.letter()),
            correlation_id,
            payload: String::new(),
        }
    }

    /// Fulfillment of an EXPECT_UP expectation.
    pub fn touched_up(position: Position, correlation_id: Option<u32>) -> Self {
        Self {
            kind: EventKind::TouchedUp,
            action: None,
            position: Some(position.letter()),
            correlation_id,
            payload: String::new(),
        }
    }

    /// SCAN result carrying the comma-joined active sensor letters.
    pub fn scanned(sensor_list: &str, correlation_id: Option<u32>) -> Self {
        let mut payload = String::new();
        let _ = payload.push_str(sensor_list);
        Self {
            kind: EventKind::Scanned,
            action: None,
            position: None,
            correlation_id,
            payload,
        }
    }

    /// Recalibration confirmation; `None` position means "all sensors".
    pub fn recalibrated(position: Option<Position>, correlation_id: Option<u32>) -> Self {
        Self {
            kind: EventKind::Recalibrated,
            action: None,
            position: position.map(Position::letter),
            correlation_id,
            payload: String::new(),
        }
    }

    /// Firmware identification response.
    pub fn info(correlation_id: Option<u32>) -> Self {
        let mut payload = String::new();
        let _ = write!(payload, "fw={FIRMWARE_VERSION} proto={PROTOCOL_VERSION}");
        Self {
            kind: EventKind::Info,
            action: None,
            position: None,
            correlation_id,
            payload,
        }
    }

    /// The event discriminant.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// The correlation id this event will echo, if any.
    pub fn correlation_id(&self) -> Option<u32> {
        self.correlation_id
    }

    /// Serializes this event to its wire line (terminator excluded).
    pub fn render(&self) -> String<EVENT_LINE_LEN> {
        let mut line: String<EVENT_LINE_LEN> = String::new();
        let _ = line.push_str(DEVICE_PREFIX);

        match self.kind {
            EventKind::Ack => self.render_response(&mut line, "ACK"),
            EventKind::Done => self.render_response(&mut line, "DONE"),
            EventKind::Err => {
                let _ = line.push_str("ERR ");
                let _ = line.push_str(&self.payload);
                self.render_id(&mut line);
            }
            EventKind::TouchDown => self.render_touch(&mut line, "TOUCH_DOWN"),
            EventKind::TouchUp => self.render_touch(&mut line, "TOUCH_UP"),
            EventKind::TouchedDown => self.render_touch(&mut line, "TOUCHED_DOWN"),
            EventKind::TouchedUp => self.render_touch(&mut line, "TOUCHED_UP"),
            EventKind::Scanned => {
                let _ = write!(line, "SCANNED[{}]", self.payload);
                self.render_id(&mut line);
            }
            EventKind::Recalibrated => {
                let _ = line.push_str("RECALIBRATED ");
                match self.position {
                    Some(letter) => {
                        let _ = line.push(letter);
                    }
                    None => {
                        let _ = line.push_str("ALL");
                    }
                }
                self.render_id(&mut line);
            }
            EventKind::Info => {
                let _ = write!(line, "INFO {}", self.payload);
                self.render_id(&mut line);
            }
        }

        line
    }

    /// `ACK`/`DONE` share a shape: keyword, action, optional position, id.
    fn render_response(&self, line: &mut String<EVENT_LINE_LEN>, keyword: &str) {
        let _ = line.push_str(keyword);
        if let Some(action) = self.action {
            let _ = write!(line, " {action}");
        }
        if let Some(letter) = self.position {
            let _ = write!(line, " {letter}");
        }
        self.render_id(line);
    }

    fn render_touch(&self, line: &mut String<EVENT_LINE_LEN>, keyword: &str) {
        let _ = line.push_str(keyword);
        if let Some(letter) = self.position {
            let _ = write!(line, " {letter}");
        }
        self.render_id(line);
    }

    fn render_id(&self, line: &mut String<EVENT_LINE_LEN>) {
        if let Some(id) = self.correlation_id {
            let _ = write!(line, " #{id}");
        }
    }
}

/// Bounded FIFO of outgoing events.
#[derive(Default)]
pub struct EventQueue {
    queue: Deque<Event, EVENT_QUEUE_CAPACITY>,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self { queue: Deque::new() }
    }

    /// Enqueues an event.
    ///
    /// Returns `false` and drops the event when the queue is full; there is
    /// no backpressure and no blocking.
    pub fn enqueue(&mut self, event: Event) -> bool {
        self.queue.push_back(event).is_ok()
    }

    /// Pops up to `max_events` events in FIFO order and serializes each as
    /// one CRLF-terminated line on the transport.
    ///
    /// Returns the number of events written.
    pub fn flush<T: Transport>(&mut self, max_events: usize, transport: &mut T) -> usize {
        let mut sent = 0;
        while sent < max_events {
            let Some(event) = self.queue.pop_front() else {
                break;
            };
            transport.write(event.render().as_bytes());
            transport.write(b"\r\n");
            sent += 1;
        }
        sent
    }

    /// Drains all pending events at the default per-tick bound.
    pub fn flush_default<T: Transport>(&mut self, transport: &mut T) -> usize {
        self.flush(MAX_EVENTS_PER_FLUSH, transport)
    }

    /// Number of events waiting.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether the queue is at capacity (further enqueues will drop).
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }
}

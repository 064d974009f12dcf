//! Touch sensing: bus abstraction, per-sensor debouncing and one-shot
//! touch expectations.
//!
//! The debouncer owns all touch semantics above raw register access. Each
//! sensor is polled at a fixed interval, raw transitions start a stability
//! window, and only readings stable for the full window become the
//! debounced state. Debounced transitions route either to a pre-armed
//! expectation (consumed on first match) or out as spontaneous events.

use crate::config::{DEBOUNCE_MS, POSITION_COUNT, TOUCH_POLL_INTERVAL_MS};
use crate::event::{Event, EventQueue};
use crate::time::{millis_between, TimeInstant};
use crate::types::Position;
use heapless::String;

/// Register map of the capacitive touch controller (CAP1188 family).
pub mod regs {
    /// Main control; bit 0 is the interrupt flag.
    pub const MAIN_CONTROL: u8 = 0x00;
    /// Sensor input status; bit 0 is the CS1 touched flag.
    pub const SENSOR_INPUT_STATUS: u8 = 0x03;
    /// Sensitivity control; bits 6:4 select the level.
    pub const SENSITIVITY_CONTROL: u8 = 0x1F;
    /// Sensor input enable mask.
    pub const SENSOR_INPUT_ENABLE: u8 = 0x21;
    /// Writing a channel bit triggers its recalibration.
    pub const CALIBRATION_ACTIVE: u8 = 0x26;
}

/// Capacity of the active-sensor list (25 letters plus separators).
pub const SENSOR_LIST_LEN: usize = 52;

/// Only the CS1 channel is wired on this board.
pub(crate) const CS1_BIT_MASK: u8 = 0x01;

/// Interrupt flag bit in the main control register.
const INT_BIT: u8 = 0x01;

/// Raw register access to the sensor bus.
///
/// One controller chip per sensor, addressed individually. The debouncer
/// owns all semantics above this; implementations only move bytes.
pub trait SensorBus {
    /// Bus error type (opaque to the debouncer; any error marks the
    /// transaction failed).
    type Error;

    /// Reads one register from the device at `address`.
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, Self::Error>;

    /// Writes one register on the device at `address`.
    fn write_register(&mut self, address: u8, register: u8, value: u8)
        -> Result<(), Self::Error>;
}

/// Sensor wiring and timing configuration.
///
/// The address table is board calibration data, not protocol logic; boards
/// with different sensor wiring inject their own table.
#[derive(Debug, Clone)]
pub struct TouchConfig {
    /// Bus address of each sensor, indexed by position (A-Y).
    pub addresses: [u8; POSITION_COUNT],
    /// Minimum interval between polling sweeps (ms).
    pub poll_interval_ms: u64,
    /// Stability window before a raw reading is accepted (ms).
    pub debounce_ms: u64,
    /// Sensitivity level written at init (0 = most sensitive, 7 = least).
    pub sensitivity: u8,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            addresses: [
                0x1F, 0x1E, 0x1D, 0x1C, 0x3F, // A-E
                0x1A, 0x28, 0x29, 0x2A, 0x0E, // F-J
                0x0F, 0x18, 0x19, 0x3C, 0x2F, // K-O
                0x38, 0x0D, 0x0C, 0x0B, 0x3E, // P-T
                0x2C, 0x3D, 0x08, 0x09, 0x0A, // U-Y
            ],
            poll_interval_ms: TOUCH_POLL_INTERVAL_MS,
            debounce_ms: DEBOUNCE_MS,
            sensitivity: 0,
        }
    }
}

/// Debounce state for one sensor.
#[derive(Debug, Clone, Copy)]
struct SensorState<I> {
    /// Whether the sensor answered during initialization. Inactive sensors
    /// are permanently skipped.
    active: bool,
    /// Most recent raw reading.
    raw: bool,
    /// Reading accepted after the stability window.
    debounced: bool,
    /// Last state surfaced as an event.
    last_reported: bool,
    /// When the raw reading last changed.
    last_change_at: Option<I>,
}

impl<I> SensorState<I> {
    const fn new() -> Self {
        Self {
            active: false,
            raw: false,
            debounced: false,
            last_reported: false,
            last_change_at: None,
        }
    }
}

/// A pre-armed one-shot intent for the next debounced transition.
#[derive(Debug, Clone, Copy)]
struct Expectation {
    correlation_id: Option<u32>,
}

/// Polls touch sensors, debounces transitions and emits touch events.
///
/// # Type Parameters
/// * `B` - Sensor bus implementation
/// * `I` - Time instant type
pub struct TouchDebouncer<B: SensorBus, I: TimeInstant> {
    bus: B,
    config: TouchConfig,
    sensors: [SensorState<I>; POSITION_COUNT],
    expect_down: [Option<Expectation>; POSITION_COUNT],
    expect_up: [Option<Expectation>; POSITION_COUNT],
    last_poll_at: Option<I>,
    active_count: usize,
}

impl<B: SensorBus, I: TimeInstant> TouchDebouncer<B, I> {
    /// Creates a debouncer. No bus traffic happens until [`Self::init`].
    pub fn new(bus: B, config: TouchConfig) -> Self {
        Self {
            bus,
            config,
            sensors: [SensorState::new(); POSITION_COUNT],
            expect_down: [None; POSITION_COUNT],
            expect_up: [None; POSITION_COUNT],
            last_poll_at: None,
            active_count: 0,
        }
    }

    /// Probes and configures every sensor; returns how many answered.
    ///
    /// A sensor failing any setup step is marked inactive and excluded from
    /// polling, debouncing and the active-sensor list for the life of the
    /// process.
    pub fn init(&mut self) -> usize {
        self.active_count = 0;
        for index in 0..POSITION_COUNT {
            let address = self.config.addresses[index];
            let active = self.init_sensor(address);
            self.sensors[index] = SensorState::new();
            self.sensors[index].active = active;
            if active {
                self.active_count += 1;
            }
        }
        self.active_count
    }

    /// One debounce tick: polls sensors (rate-limited) and emits debounced
    /// transition events into `events`.
    pub fn tick(&mut self, now: I, events: &mut EventQueue) {
        if let Some(last) = self.last_poll_at {
            if millis_between(now, last) < self.config.poll_interval_ms {
                return;
            }
        }
        self.last_poll_at = Some(now);

        self.poll_sensors(now);
        self.process_debounce(now, events);
    }

    /// Triggers recalibration of one sensor.
    ///
    /// Returns `false` for inactive sensors and bus write failures.
    pub fn recalibrate(&mut self, position: Position) -> bool {
        self.recalibrate_index(position.index())
    }

    /// Index-based variant used by the chunked RECALIBRATE_ALL sweep.
    pub(crate) fn recalibrate_index(&mut self, index: usize) -> bool {
        let Some(sensor) = self.sensors.get(index) else {
            return false;
        };
        if !sensor.active {
            return false;
        }
        let address = self.config.addresses[index];
        self.bus
            .write_register(address, regs::CALIBRATION_ACTIVE, CS1_BIT_MASK)
            .is_ok()
    }

    /// Arms the one-shot expectation for the next debounced press.
    ///
    /// Replaces any prior unconsumed expectation for the same sensor.
    pub fn expect_down(&mut self, position: Position, correlation_id: Option<u32>) {
        self.expect_down[position.index()] = Some(Expectation { correlation_id });
    }

    /// Arms the one-shot expectation for the next debounced release.
    pub fn expect_up(&mut self, position: Position, correlation_id: Option<u32>) {
        self.expect_up[position.index()] = Some(Expectation { correlation_id });
    }

    /// Whether the sensor answered at init.
    pub fn is_sensor_active(&self, position: Position) -> bool {
        self.sensors[position.index()].active
    }

    /// Current debounced touch state.
    pub fn is_touched(&self, position: Position) -> bool {
        self.sensors[position.index()].debounced
    }

    /// Number of sensors that answered at init.
    pub fn active_sensor_count(&self) -> usize {
        self.active_count
    }

    /// Mutable access to the underlying bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Comma-joined letters of all active sensors, e.g. `"A,B,F"`.
    pub fn active_sensor_list(&self) -> String<SENSOR_LIST_LEN> {
        let mut list = String::new();
        for (index, sensor) in self.sensors.iter().enumerate() {
            if !sensor.active {
                continue;
            }
            if !list.is_empty() {
                let _ = list.push(',');
            }
            let _ = list.push((b'A' + index as u8) as char);
        }
        list
    }

    fn init_sensor(&mut self, address: u8) -> bool {
        // Probe: a missing chip fails the first transaction.
        if self
            .bus
            .write_register(address, regs::SENSOR_INPUT_ENABLE, CS1_BIT_MASK)
            .is_err()
        {
            return false;
        }

        let sensitivity = 0x20 | (self.config.sensitivity << 4);
        if self
            .bus
            .write_register(address, regs::SENSITIVITY_CONTROL, sensitivity)
            .is_err()
        {
            return false;
        }

        // Drain any pending touch status, then clear the interrupt flag.
        let _ = self.bus.read_register(address, regs::SENSOR_INPUT_STATUS);
        if let Ok(main) = self.bus.read_register(address, regs::MAIN_CONTROL) {
            let _ = self
                .bus
                .write_register(address, regs::MAIN_CONTROL, main & !INT_BIT);
        }

        true
    }

    /// One raw reading. A bus error reads as "not touched".
    fn read_raw(&mut self, address: u8) -> bool {
        let Ok(status) = self.bus.read_register(address, regs::SENSOR_INPUT_STATUS) else {
            return false;
        };
        let touched = status & CS1_BIT_MASK != 0;

        // The chip latches touches until the interrupt flag is cleared.
        if touched {
            if let Ok(main) = self.bus.read_register(address, regs::MAIN_CONTROL) {
                let _ = self
                    .bus
                    .write_register(address, regs::MAIN_CONTROL, main & !INT_BIT);
            }
        }

        touched
    }

    fn poll_sensors(&mut self, now: I) {
        for index in 0..POSITION_COUNT {
            if !self.sensors[index].active {
                continue;
            }
            let address = self.config.addresses[index];
            let raw = self.read_raw(address);
            let sensor = &mut self.sensors[index];
            if raw != sensor.raw {
                sensor.raw = raw;
                sensor.last_change_at = Some(now);
            }
        }
    }

    fn process_debounce(&mut self, now: I, events: &mut EventQueue) {
        for index in 0..POSITION_COUNT {
            let sensor = &mut self.sensors[index];
            if !sensor.active {
                continue;
            }

            let stable = match sensor.last_change_at {
                Some(changed_at) => millis_between(now, changed_at) >= self.config.debounce_ms,
                None => true,
            };
            if !stable || sensor.raw == sensor.debounced {
                continue;
            }

            sensor.debounced = sensor.raw;
            if sensor.debounced == sensor.last_reported {
                continue;
            }
            sensor.last_reported = sensor.debounced;

            let Some(position) = Position::from_index(index) else {
                continue;
            };
            if sensor.debounced {
                // take() consumes the expectation: one-shot.
                match self.expect_down[index].take() {
                    Some(expectation) => {
                        events.enqueue(Event::touched_down(position, expectation.correlation_id));
                    }
                    None => {
                        events.enqueue(Event::touch_down(position));
                    }
                }
            } else {
                match self.expect_up[index].take() {
                    Some(expectation) => {
                        events.enqueue(Event::touched_up(position, expectation.correlation_id));
                    }
                    None => {
                        events.enqueue(Event::touch_up(position));
                    }
                }
            }
        }
    }
}

//! Shared test infrastructure for touchboard-core integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use palette::Srgb;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use touchboard_core::touch::regs;
use touchboard_core::{
    Executor, LedAnimator, LedDriver, LedLayout, SensorBus, StripId, TimeDuration, TimeInstant,
    TimeSource, TouchConfig, TouchDebouncer, Transport,
};

// ============================================================================
// Mock Time Types
// ============================================================================

/// Mock duration type for testing (wraps milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestDuration(pub u64);

impl TimeDuration for TestDuration {
    const ZERO: Self = TestDuration(0);

    fn as_millis(&self) -> u64 {
        self.0
    }

    fn from_millis(millis: u64) -> Self {
        TestDuration(millis)
    }

    fn saturating_sub(self, other: Self) -> Self {
        TestDuration(self.0.saturating_sub(other.0))
    }
}

/// Mock instant type for testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant(pub u64);

impl TimeInstant for TestInstant {
    type Duration = TestDuration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        TestDuration(self.0 - earlier.0)
    }

    fn checked_add(self, duration: Self::Duration) -> Option<Self> {
        Some(TestInstant(self.0 + duration.0))
    }

    fn checked_sub(self, duration: Self::Duration) -> Option<Self> {
        self.0.checked_sub(duration.0).map(TestInstant)
    }
}

// ============================================================================
// Mock Time Source
// ============================================================================

/// Mock time source with controllable time advancement
pub struct MockTimeSource {
    current_time: core::cell::Cell<TestInstant>,
}

impl MockTimeSource {
    pub fn new() -> Self {
        Self {
            current_time: core::cell::Cell::new(TestInstant(0)),
        }
    }

    /// Advance time by the given number of milliseconds
    pub fn advance_ms(&self, millis: u64) {
        let current = self.current_time.get();
        self.current_time.set(TestInstant(current.0 + millis));
    }

    pub fn set_time(&self, time: TestInstant) {
        self.current_time.set(time);
    }
}

impl TimeSource<TestInstant> for MockTimeSource {
    fn now(&self) -> TestInstant {
        self.current_time.get()
    }
}

// ============================================================================
// Mock Transport
// ============================================================================

#[derive(Default)]
struct TransportState {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

/// Mock serial transport with scriptable input and captured output.
///
/// Clones share state, so a test keeps a handle while the engine owns
/// another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<TransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a command line (newline appended) for the engine to read.
    pub fn push_line(&self, line: &str) {
        let mut state = self.state.borrow_mut();
        state.rx.extend(line.bytes());
        state.rx.push_back(b'\n');
    }

    /// Queues raw bytes without any terminator.
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.state.borrow_mut().rx.extend(bytes.iter().copied());
    }

    /// Drains everything the engine wrote, split into CRLF lines.
    pub fn take_output_lines(&self) -> Vec<String> {
        let mut state = self.state.borrow_mut();
        let text = String::from_utf8(std::mem::take(&mut state.tx)).unwrap();
        text.split("\r\n")
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }
}

impl Transport for MockTransport {
    fn try_read(&mut self) -> Option<u8> {
        self.state.borrow_mut().rx.pop_front()
    }

    fn write(&mut self, bytes: &[u8]) {
        self.state.borrow_mut().tx.extend_from_slice(bytes);
    }
}

// ============================================================================
// Mock LED Driver
// ============================================================================

struct LedFrame {
    strip1: Vec<Srgb>,
    strip2: Vec<Srgb>,
    presents: usize,
}

/// Mock LED driver recording the staged frame and present calls.
#[derive(Clone)]
pub struct MockLedDriver {
    state: Rc<RefCell<LedFrame>>,
}

impl MockLedDriver {
    pub fn new(strip_len: u16) -> Self {
        let off = Srgb::new(0.0, 0.0, 0.0);
        Self {
            state: Rc::new(RefCell::new(LedFrame {
                strip1: vec![off; strip_len as usize],
                strip2: vec![off; strip_len as usize],
                presents: 0,
            })),
        }
    }

    pub fn pixel(&self, strip: StripId, index: u16) -> Srgb {
        let state = self.state.borrow();
        match strip {
            StripId::Strip1 => state.strip1[index as usize],
            StripId::Strip2 => state.strip2[index as usize],
        }
    }

    pub fn present_count(&self) -> usize {
        self.state.borrow().presents
    }
}

impl LedDriver for MockLedDriver {
    fn set_pixel(&mut self, strip: StripId, index: u16, color: Srgb) {
        let mut state = self.state.borrow_mut();
        let buffer = match strip {
            StripId::Strip1 => &mut state.strip1,
            StripId::Strip2 => &mut state.strip2,
        };
        if let Some(slot) = buffer.get_mut(index as usize) {
            *slot = color;
        }
    }

    fn present(&mut self) {
        self.state.borrow_mut().presents += 1;
    }
}

// ============================================================================
// Mock Sensor Bus
// ============================================================================

struct BusState {
    addresses: [u8; 25],
    touched: [bool; 25],
    missing: Vec<u8>,
    recalibrations: Vec<u8>,
}

/// Mock CAP1188-family bus: one virtual chip per configured address.
///
/// Chips marked missing fail every transaction, mimicking an unpopulated
/// board position.
#[derive(Clone)]
pub struct MockSensorBus {
    state: Rc<RefCell<BusState>>,
}

impl MockSensorBus {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState {
                addresses: TouchConfig::default().addresses,
                touched: [false; 25],
                missing: Vec::new(),
                recalibrations: Vec::new(),
            })),
        }
    }

    fn index_of(&self, letter: char) -> usize {
        (letter as u8 - b'A') as usize
    }

    /// Sets the raw touched state of one sensor.
    pub fn set_touched(&self, letter: char, touched: bool) {
        let index = self.index_of(letter);
        self.state.borrow_mut().touched[index] = touched;
    }

    /// Marks one sensor's chip as absent from the bus. Call before init.
    pub fn set_missing(&self, letter: char) {
        let index = self.index_of(letter);
        let address = self.state.borrow().addresses[index];
        self.state.borrow_mut().missing.push(address);
    }

    /// Bus addresses that received a recalibration trigger, in order.
    pub fn recalibrated_addresses(&self) -> Vec<u8> {
        self.state.borrow().recalibrations.clone()
    }
}

impl SensorBus for MockSensorBus {
    type Error = ();

    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, ()> {
        let state = self.state.borrow();
        if state.missing.contains(&address) {
            return Err(());
        }
        match register {
            regs::SENSOR_INPUT_STATUS => {
                let index = state.addresses.iter().position(|&a| a == address).ok_or(())?;
                Ok(if state.touched[index] { 0x01 } else { 0x00 })
            }
            _ => Ok(0),
        }
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), ()> {
        let mut state = self.state.borrow_mut();
        if state.missing.contains(&address) {
            return Err(());
        }
        if register == regs::CALIBRATION_ACTIVE && value & 0x01 != 0 {
            state.recalibrations.push(address);
        }
        Ok(())
    }
}

// ============================================================================
// Engine Construction
// ============================================================================

pub type TestExecutor<'t> =
    Executor<'t, MockTimeSource, MockTransport, MockLedDriver, MockSensorBus, TestInstant>;

/// Engine for a board with no touch hardware.
pub fn engine_without_touch<'t>(
    transport: &MockTransport,
    clock: &'t MockTimeSource,
    driver: &MockLedDriver,
) -> TestExecutor<'t> {
    let led = LedAnimator::new(driver.clone(), LedLayout::default());
    Executor::new(transport.clone(), clock, led, None)
}

/// Fully equipped engine; the debouncer is initialized against `bus`.
pub fn engine_with_touch<'t>(
    transport: &MockTransport,
    clock: &'t MockTimeSource,
    driver: &MockLedDriver,
    bus: &MockSensorBus,
) -> TestExecutor<'t> {
    let mut touch = TouchDebouncer::new(bus.clone(), TouchConfig::default());
    touch.init();
    let led = LedAnimator::new(driver.clone(), LedLayout::default());
    Executor::new(transport.clone(), clock, led, Some(touch))
}

// ============================================================================
// Test Helper Functions
// ============================================================================

/// Compare two colors with floating-point tolerance
pub fn colors_equal(a: Srgb, b: Srgb) -> bool {
    const EPSILON: f32 = 0.001;
    (a.red - b.red).abs() < EPSILON
        && (a.green - b.green).abs() < EPSILON
        && (a.blue - b.blue).abs() < EPSILON
}

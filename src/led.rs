//! Per-position LED state machines and the global celebration animation.
//!
//! Every visual effect is advanced step-by-step from `tick`; there is no
//! blocking delay anywhere. Positions map to (strip, pixel) pairs through an
//! injectable [`LedLayout`], and the animator pushes at most one `present`
//! per tick, only when some pixel changed.

use crate::config::{
    ANIMATION_STEP_MS, BLINK_INTERVAL_MS, CELEBRATION_STEP_MS, CELEBRATION_TOTAL_STEPS,
    POSITION_COUNT, SUCCESS_EXPANSION_RADIUS,
};
use crate::time::{millis_between, TimeInstant};
use crate::types::Position;
use crate::{COLOR_BLINK, COLOR_OFF, COLOR_SHOW, COLOR_SUCCESS};
use palette::Srgb;

/// Which physical strip a pixel lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StripId {
    /// First strip.
    Strip1,
    /// Second strip.
    Strip2,
}

/// Trait for abstracting the addressable LED strips.
///
/// Implement this for your strip hardware (SPI, RMT, bit-banged, ...).
/// Colors are `Srgb<f32>` in the 0.0-1.0 range; convert to your device's
/// native format. Handle hardware errors internally - these methods cannot
/// fail.
pub trait LedDriver {
    /// Stages one pixel color in the frame buffer.
    fn set_pixel(&mut self, strip: StripId, index: u16, color: Srgb);

    /// Transmits the staged frame buffer to the hardware.
    fn present(&mut self);
}

/// Strip and pixel index of one board position's center LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedMapping {
    /// Strip carrying this position.
    pub strip: StripId,
    /// Pixel index of the position center.
    pub index: u16,
}

/// Physical pixel layout of the board.
///
/// Wiring data, not protocol logic: boards with different strip routing
/// inject their own table.
#[derive(Debug, Clone)]
pub struct LedLayout {
    /// Center pixel of each position, indexed by position (A-Y).
    pub mappings: [LedMapping; POSITION_COUNT],
    /// Pixel count of strip 1.
    pub strip1_len: u16,
    /// Pixel count of strip 2.
    pub strip2_len: u16,
}

impl LedLayout {
    fn mapping(&self, position: Position) -> LedMapping {
        self.mappings[position.index()]
    }

    fn strip_len(&self, strip: StripId) -> u16 {
        match strip {
            StripId::Strip1 => self.strip1_len,
            StripId::Strip2 => self.strip2_len,
        }
    }
}

impl Default for LedLayout {
    fn default() -> Self {
        use StripId::{Strip1, Strip2};
        const fn at(strip: StripId, index: u16) -> LedMapping {
            LedMapping { strip, index }
        }
        Self {
            mappings: [
                at(Strip1, 153), // A
                at(Strip1, 165), // B
                at(Strip1, 177), // C
                at(Strip2, 177), // D
                at(Strip2, 165), // E
                at(Strip2, 153), // F
                at(Strip1, 130), // G
                at(Strip1, 118), // H
                at(Strip1, 105), // I
                at(Strip1, 92),  // J
                at(Strip2, 105), // K
                at(Strip2, 118), // L
                at(Strip2, 130), // M
                at(Strip1, 55),  // N
                at(Strip1, 67),  // O
                at(Strip1, 79),  // P
                at(Strip2, 79),  // Q
                at(Strip2, 67),  // R
                at(Strip2, 55),  // S
                at(Strip1, 34),  // T
                at(Strip1, 22),  // U
                at(Strip1, 10),  // V
                at(Strip2, 10),  // W
                at(Strip2, 22),  // X
                at(Strip2, 34),  // Y
            ],
            strip1_len: 190,
            strip2_len: 190,
        }
    }
}

/// Visual state of one board position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Dark.
    Idle,
    /// Single pixel lit solid.
    Shown,
    /// SUCCESS expansion in progress.
    Animating,
    /// SUCCESS expansion finished; region stays lit until the next
    /// operation (terminal, not actively ticked).
    Expanded,
    /// Toggling on/off until STOP_BLINK.
    Blinking,
}

#[derive(Debug, Clone, Copy)]
struct PositionAnim<I> {
    phase: Phase,
    step: u8,
    last_step_at: Option<I>,
    blink_on: bool,
}

impl<I> PositionAnim<I> {
    const fn new() -> Self {
        Self {
            phase: Phase::Idle,
            step: 0,
            last_step_at: None,
            blink_on: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Celebration<I> {
    active: bool,
    step: u8,
    last_step_at: Option<I>,
}

/// Owns all per-position visual state and the global celebration.
///
/// # Type Parameters
/// * `D` - LED driver implementation
/// * `I` - Time instant type
pub struct LedAnimator<D: LedDriver, I: TimeInstant> {
    driver: D,
    layout: LedLayout,
    positions: [PositionAnim<I>; POSITION_COUNT],
    celebration: Celebration<I>,
    needs_present: bool,
}

impl<D: LedDriver, I: TimeInstant> LedAnimator<D, I> {
    /// Creates an animator with every position dark.
    pub fn new(mut driver: D, layout: LedLayout) -> Self {
        clear_strips(&mut driver, &layout);
        driver.present();
        Self {
            driver,
            layout,
            positions: [PositionAnim::new(); POSITION_COUNT],
            celebration: Celebration {
                active: false,
                step: 0,
                last_step_at: None,
            },
            needs_present: false,
        }
    }

    /// Lights a position solid in the SHOW color.
    pub fn show(&mut self, position: Position) {
        let mapping = self.layout.mapping(position);
        self.clear_stale_region(position, mapping);

        let anim = &mut self.positions[position.index()];
        anim.phase = Phase::Shown;
        anim.step = 0;

        self.driver.set_pixel(mapping.strip, mapping.index, COLOR_SHOW);
        self.needs_present = true;
    }

    /// Turns a position off. A no-op on an already-idle position.
    pub fn hide(&mut self, position: Position) {
        let mapping = self.layout.mapping(position);
        // Clearing the whole expansion region covers every prior phase.
        self.clear_region(mapping);

        let anim = &mut self.positions[position.index()];
        anim.phase = Phase::Idle;
        anim.step = 0;
        anim.blink_on = false;

        self.needs_present = true;
    }

    /// Starts blinking a position in the BLINK color.
    pub fn blink(&mut self, position: Position, now: I) {
        let mapping = self.layout.mapping(position);
        self.clear_stale_region(position, mapping);

        let anim = &mut self.positions[position.index()];
        anim.phase = Phase::Blinking;
        anim.step = 0;
        anim.last_step_at = Some(now);
        anim.blink_on = true;

        self.driver.set_pixel(mapping.strip, mapping.index, COLOR_BLINK);
        self.needs_present = true;
    }

    /// Stops a blink. A no-op on a position that is not blinking.
    pub fn stop_blink(&mut self, position: Position) {
        if self.positions[position.index()].phase != Phase::Blinking {
            return;
        }
        let mapping = self.layout.mapping(position);
        self.driver.set_pixel(mapping.strip, mapping.index, COLOR_OFF);

        let anim = &mut self.positions[position.index()];
        anim.phase = Phase::Idle;
        anim.step = 0;
        anim.blink_on = false;

        self.needs_present = true;
    }

    /// (Re)starts the SUCCESS expansion at a position.
    ///
    /// The center lights immediately; the lit region grows one pixel per
    /// animation interval until the fixed radius is reached.
    pub fn success(&mut self, position: Position, now: I) {
        let mapping = self.layout.mapping(position);
        match self.positions[position.index()].phase {
            Phase::Animating | Phase::Expanded => self.clear_region(mapping),
            Phase::Shown => self.driver.set_pixel(mapping.strip, mapping.index, COLOR_OFF),
            _ => {}
        }

        let anim = &mut self.positions[position.index()];
        anim.phase = Phase::Animating;
        anim.step = 0;
        anim.last_step_at = Some(now);

        self.driver
            .set_pixel(mapping.strip, mapping.index, COLOR_SUCCESS);
        self.needs_present = true;
    }

    /// Whether the SUCCESS expansion at a position is no longer running.
    ///
    /// Reports "not animating", not "ever animated": true for Idle, Shown,
    /// Expanded and Blinking alike.
    pub fn is_animation_complete(&self, position: Position) -> bool {
        self.positions[position.index()].phase != Phase::Animating
    }

    /// Whether any position is mid-expansion.
    pub fn has_active_animations(&self) -> bool {
        self.positions.iter().any(|p| p.phase == Phase::Animating)
    }

    /// Whether a position is currently blinking.
    pub fn is_blinking(&self, position: Position) -> bool {
        self.positions[position.index()].phase == Phase::Blinking
    }

    /// Current visual phase of a position.
    pub fn phase(&self, position: Position) -> Phase {
        self.positions[position.index()].phase
    }

    /// Starts the global celebration: all pixels flash to the SUCCESS
    /// color, then pulse between full and reduced brightness.
    pub fn start_celebration(&mut self, now: I) {
        self.celebration.active = true;
        self.celebration.step = 0;
        self.celebration.last_step_at = Some(now);

        fill_strips(&mut self.driver, &self.layout, COLOR_SUCCESS);
        self.needs_present = true;
    }

    /// Whether no celebration run is in progress.
    pub fn is_celebration_complete(&self) -> bool {
        !self.celebration.active
    }

    /// Advances every active animation and presents once if anything
    /// changed.
    pub fn tick(&mut self, now: I) {
        for index in 0..POSITION_COUNT {
            match self.positions[index].phase {
                Phase::Animating => self.tick_expansion(index, now),
                Phase::Blinking => self.tick_blink(index, now),
                _ => {}
            }
        }

        if self.celebration.active {
            self.tick_celebration(now);
        }

        if self.needs_present {
            self.driver.present();
            self.needs_present = false;
        }
    }

    fn tick_expansion(&mut self, index: usize, now: I) {
        let anim = &mut self.positions[index];
        if !interval_elapsed(anim.last_step_at, now, ANIMATION_STEP_MS) {
            return;
        }
        anim.step += 1;
        anim.last_step_at = Some(now);
        if anim.step >= SUCCESS_EXPANSION_RADIUS {
            anim.step = SUCCESS_EXPANSION_RADIUS;
            anim.phase = Phase::Expanded;
        }
        self.render_position(index);
        self.needs_present = true;
    }

    fn tick_blink(&mut self, index: usize, now: I) {
        let anim = &mut self.positions[index];
        if !interval_elapsed(anim.last_step_at, now, BLINK_INTERVAL_MS) {
            return;
        }
        anim.blink_on = !anim.blink_on;
        anim.last_step_at = Some(now);
        self.render_position(index);
        self.needs_present = true;
    }

    fn tick_celebration(&mut self, now: I) {
        if !interval_elapsed(self.celebration.last_step_at, now, CELEBRATION_STEP_MS) {
            return;
        }
        self.celebration.step += 1;
        self.celebration.last_step_at = Some(now);

        if self.celebration.step < CELEBRATION_TOTAL_STEPS {
            // Pulse between full and quarter brightness.
            let factor = if self.celebration.step % 2 == 0 {
                1.0
            } else {
                0.25
            };
            let color = scale(COLOR_SUCCESS, factor);
            fill_strips(&mut self.driver, &self.layout, color);
        } else {
            clear_strips(&mut self.driver, &self.layout);
            for anim in &mut self.positions {
                anim.phase = Phase::Idle;
                anim.step = 0;
                anim.blink_on = false;
            }
            self.celebration.active = false;
        }
        self.needs_present = true;
    }

    /// Clears the stale expansion region before a new operation, so no
    /// ghost pixels survive a SHOW/BLINK/SUCCESS over an old expansion.
    fn clear_stale_region(&mut self, position: Position, mapping: LedMapping) {
        if matches!(
            self.positions[position.index()].phase,
            Phase::Animating | Phase::Expanded
        ) {
            self.clear_region(mapping);
        }
    }

    fn clear_region(&mut self, mapping: LedMapping) {
        let strip_len = self.layout.strip_len(mapping.strip) as i32;
        let center = mapping.index as i32;
        let radius = SUCCESS_EXPANSION_RADIUS as i32;
        for offset in -radius..=radius {
            let index = center + offset;
            if index >= 0 && index < strip_len {
                self.driver.set_pixel(mapping.strip, index as u16, COLOR_OFF);
            }
        }
    }

    fn render_position(&mut self, index: usize) {
        let Some(position) = Position::from_index(index) else {
            return;
        };
        let mapping = self.layout.mapping(position);
        let strip_len = self.layout.strip_len(mapping.strip) as i32;
        let center = mapping.index as i32;
        let anim = self.positions[index];

        match anim.phase {
            Phase::Idle => {}
            Phase::Shown => {
                self.driver.set_pixel(mapping.strip, mapping.index, COLOR_SHOW);
            }
            Phase::Blinking => {
                let color = if anim.blink_on { COLOR_BLINK } else { COLOR_OFF };
                self.driver.set_pixel(mapping.strip, mapping.index, color);
            }
            Phase::Animating | Phase::Expanded => {
                self.driver
                    .set_pixel(mapping.strip, mapping.index, COLOR_SUCCESS);
                for r in 1..=anim.step as i32 {
                    if center - r >= 0 {
                        self.driver
                            .set_pixel(mapping.strip, (center - r) as u16, COLOR_SUCCESS);
                    }
                    if center + r < strip_len {
                        self.driver
                            .set_pixel(mapping.strip, (center + r) as u16, COLOR_SUCCESS);
                    }
                }
            }
        }
    }
}

fn interval_elapsed<I: TimeInstant>(last: Option<I>, now: I, interval_ms: u64) -> bool {
    match last {
        Some(at) => millis_between(now, at) >= interval_ms,
        None => true,
    }
}

fn fill_strips<D: LedDriver>(driver: &mut D, layout: &LedLayout, color: Srgb) {
    for index in 0..layout.strip1_len {
        driver.set_pixel(StripId::Strip1, index, color);
    }
    for index in 0..layout.strip2_len {
        driver.set_pixel(StripId::Strip2, index, color);
    }
}

fn clear_strips<D: LedDriver>(driver: &mut D, layout: &LedLayout) {
    fill_strips(driver, layout, COLOR_OFF);
}

fn scale(color: Srgb, factor: f32) -> Srgb {
    Srgb::new(color.red * factor, color.green * factor, color.blue * factor)
}

//! # vgasim-core
//!
//! Cycle-accurate frame synthesis for a simulated VGA display-timing circuit.
//!
//! The crate drives an opaque clocked model one clock period at a time, maps
//! the running cycle count to a horizontal/vertical scan position (blanking
//! intervals included), captures the model's per-cycle color outputs into a
//! framebuffer while the scan position is inside the active area, and reports
//! frame completion so a frontend can present the buffer with correct timing.
//!
//! ## Architecture
//!
//! - [`VgaSim`] — top-level synthesizer: stepper, scan counters, framebuffer, batching policy
//! - [`Stepper`] — whole-clock-period advancement of the model, owner of button state
//! - [`ClockedModel`] — pin-level capability trait for the circuit under simulation
//! - [`Timing`] / [`BatchPolicy`] — video geometry and batching strategy
//! - [`pattern::PatternGenerator`] — built-in demo circuit (color bars + movable square)
//! - [`stimulus`] — cycle-stamped button event recording and replay
//! - [`png`] — PNG screenshot encoding of the packed framebuffer
//!
//! ## Batching
//!
//! `BatchPolicy::FullFrame` runs exactly one frame of cycles per batch and
//! always ends at scan position (0,0). `BatchPolicy::FixedBatch(n)` runs `n`
//! cycles per batch so the caller can poll input between batches; `n` must
//! evenly divide the cycles-per-frame count. Either way, [`VgaSim::run_batch`]
//! reports whether a frame boundary was crossed during the batch — the caller
//! presents only then, so a half-written frame is never displayed.

pub mod model;
pub mod pattern;
pub mod png;
pub mod stepper;
pub mod stimulus;
pub mod video;

pub use model::ClockedModel;
pub use stepper::Stepper;
pub use video::{expand4, BatchPolicy, Timing};

use serde::{Deserialize, Serialize};

/// Length of the power-on reset pulse in clock cycles.
pub const RESET_PULSE_CYCLES: u32 = 16;

/// Button input signals of the simulated circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    Center,
    /// Auxiliary buttons 1–4
    B1,
    B2,
    B3,
    B4,
}

impl Button {
    /// Number of button signals.
    pub const COUNT: usize = 9;

    /// All button signals, in pin order.
    pub const ALL: [Button; Self::COUNT] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::Center,
        Button::B1,
        Button::B2,
        Button::B3,
        Button::B4,
    ];

    /// Stable index for state arrays.
    pub fn index(self) -> usize {
        match self {
            Button::Up => 0,
            Button::Down => 1,
            Button::Left => 2,
            Button::Right => 3,
            Button::Center => 4,
            Button::B1 => 5,
            Button::B2 => 6,
            Button::B3 => 7,
            Button::B4 => 8,
        }
    }
}

/// Top-level frame synthesizer.
///
/// Owns the scan position, the framebuffer, and the stepper; nothing else
/// touches them. The framebuffer holds `active_w * active_h` packed
/// `0x00RRGGBB` pixels and is reused across frames — it is only safe to show
/// after `run_batch` reports a completed frame.
pub struct VgaSim<M> {
    stepper: Stepper<M>,
    timing: Timing,
    policy: BatchPolicy,
    /// Scan position, blanking included: x in [0, h_total), y in [0, v_total)
    x: usize,
    y: usize,
    framebuffer: Vec<u32>,
    /// Clock cycles stepped since construction
    cycles: u64,
    frames_completed: u64,
    /// Enable per-frame diagnostics on stderr
    pub debug: bool,
}

impl<M: ClockedModel> VgaSim<M> {
    /// Create a synthesizer around `model`.
    ///
    /// Fails if the batching policy does not fit the timing geometry (a fixed
    /// batch size that does not divide the cycles-per-frame count).
    pub fn new(model: M, timing: Timing, policy: BatchPolicy) -> Result<Self, String> {
        policy.validate(&timing)?;
        Ok(VgaSim {
            stepper: Stepper::new(model),
            framebuffer: vec![0; timing.active_w * timing.active_h],
            timing,
            policy,
            x: 0,
            y: 0,
            cycles: 0,
            frames_completed: 0,
            debug: false,
        })
    }

    /// Apply the power-on reset pulse ([`RESET_PULSE_CYCLES`] cycles) to the
    /// model. Call once before the main loop.
    pub fn reset(&mut self) {
        self.stepper.reset(RESET_PULSE_CYCLES);
    }

    /// One clock cycle: step the model, capture the sample if the scan
    /// position is inside the active area, advance the scan counters.
    /// Returns true when this cycle completed a frame.
    fn step_pixel(&mut self) -> bool {
        let (r, g, b) = self.stepper.step_cycle();
        if self.x < self.timing.active_w && self.y < self.timing.active_h {
            self.framebuffer[self.y * self.timing.active_w + self.x] = video::pack_rgb(r, g, b);
        }
        self.cycles += 1;
        self.x += 1;
        if self.x == self.timing.h_total {
            self.x = 0;
            self.y += 1;
            if self.y == self.timing.v_total {
                self.y = 0;
                self.frames_completed += 1;
                return true;
            }
        }
        false
    }

    /// Run one batch of cycles under the configured policy.
    ///
    /// Returns true if a frame boundary was crossed during the batch, meaning
    /// the framebuffer holds one complete frame and may be presented. The
    /// check is crossing-based, not position-based, so a boundary inside a
    /// batch is never stepped over silently.
    pub fn run_batch(&mut self) -> bool {
        let n = self.policy.cycles_per_batch(&self.timing);
        let mut completed = false;
        for _ in 0..n {
            completed |= self.step_pixel();
        }
        if completed && self.debug && self.frames_completed <= 10 {
            eprintln!(
                "Frame {}: {} cycles total, scan=({},{})",
                self.frames_completed, self.cycles, self.x, self.y
            );
        }
        completed
    }

    /// Run cycles until the current frame completes. From scan position
    /// (0,0) this is exactly one frame of cycles.
    pub fn run_frame(&mut self) {
        while !self.step_pixel() {}
    }

    /// Update one button signal, effective from the next cycle.
    pub fn set_input(&mut self, button: Button, active: bool) {
        self.stepper.set_input(button, active);
    }

    /// Current state of one button signal.
    pub fn input(&self, button: Button) -> bool {
        self.stepper.input(button)
    }

    /// The reconstructed frame as packed `0x00RRGGBB` pixels in row-major
    /// order, stride = active width. Complete only when the last `run_batch`
    /// returned true.
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }

    /// Current scan position including blanking.
    pub fn scan_pos(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    /// Clock cycles stepped since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Frames completed since construction.
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn policy(&self) -> BatchPolicy {
        self.policy
    }

    /// Encode the current framebuffer as a PNG image.
    pub fn screenshot_png(&self) -> Vec<u8> {
        png::encode_png(
            self.timing.active_w as u32,
            self.timing.active_h as u32,
            &self.framebuffer,
        )
    }

    pub fn model(&self) -> &M {
        self.stepper.model()
    }

    pub fn model_mut(&mut self) -> &mut M {
        self.stepper.model_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Constant-output stub circuit.
    struct ConstModel {
        r: u8,
        g: u8,
        b: u8,
    }

    impl ClockedModel for ConstModel {
        fn set_clk(&mut self, _level: bool) {}
        fn set_rst_n(&mut self, _level: bool) {}
        fn set_button(&mut self, _button: Button, _pressed: bool) {}
        fn eval(&mut self) {}
        fn rgb(&self) -> (u8, u8, u8) {
            (self.r, self.g, self.b)
        }
    }

    /// Emits its own cycle count (mod 16) on the red channel, so tests can
    /// tell exactly which cycle's sample landed where.
    #[derive(Default)]
    struct CycleStampModel {
        clk: bool,
        prev_clk: bool,
        cycle: u64,
    }

    impl ClockedModel for CycleStampModel {
        fn set_clk(&mut self, level: bool) {
            self.clk = level;
        }
        fn set_rst_n(&mut self, _level: bool) {}
        fn set_button(&mut self, _button: Button, _pressed: bool) {}
        fn eval(&mut self) {
            if self.clk && !self.prev_clk {
                self.cycle += 1;
            }
            self.prev_clk = self.clk;
        }
        fn rgb(&self) -> (u8, u8, u8) {
            ((self.cycle.saturating_sub(1) % 16) as u8, 0, 0)
        }
    }

    /// Counts the cycles during which the Up pin was held active.
    #[derive(Default)]
    struct InputProbe {
        clk: bool,
        prev_clk: bool,
        up: bool,
        up_cycles: u64,
    }

    impl ClockedModel for InputProbe {
        fn set_clk(&mut self, level: bool) {
            self.clk = level;
        }
        fn set_rst_n(&mut self, _level: bool) {}
        fn set_button(&mut self, button: Button, pressed: bool) {
            if button == Button::Up {
                self.up = pressed;
            }
        }
        fn eval(&mut self) {
            if self.clk && !self.prev_clk && self.up {
                self.up_cycles += 1;
            }
            self.prev_clk = self.clk;
        }
        fn rgb(&self) -> (u8, u8, u8) {
            (0, 0, 0)
        }
    }

    const SMALL: Timing = Timing {
        h_total: 10,
        v_total: 5,
        active_w: 8,
        active_h: 4,
    };

    fn const_sim(timing: Timing, policy: BatchPolicy, r: u8, g: u8, b: u8) -> VgaSim<ConstModel> {
        VgaSim::new(ConstModel { r, g, b }, timing, policy).unwrap()
    }

    #[test]
    fn test_scan_position_is_pure_function_of_cycle_count() {
        let mut sim = const_sim(SMALL, BatchPolicy::FixedBatch(1), 0, 0, 0);
        for n in 1u64..=150 {
            sim.run_batch();
            let expected = (
                (n % SMALL.h_total as u64) as usize,
                ((n / SMALL.h_total as u64) % SMALL.v_total as u64) as usize,
            );
            assert_eq!(sim.scan_pos(), expected, "after {} cycles", n);
            assert_eq!(sim.cycles(), n);
        }
    }

    #[test]
    fn test_full_frame_batch_returns_to_origin_vga() {
        let mut sim = const_sim(Timing::VGA_640X480, BatchPolicy::FullFrame, 0, 0, 0);
        assert!(sim.run_batch());
        assert_eq!(sim.scan_pos(), (0, 0));
        assert_eq!(sim.cycles(), 420_000);
    }

    #[test]
    fn test_full_frame_batch_returns_to_origin_other_geometry() {
        let odd = Timing { h_total: 13, v_total: 7, active_w: 9, active_h: 5 };
        let mut sim = const_sim(odd, BatchPolicy::FullFrame, 0, 0, 0);
        assert!(sim.run_batch());
        assert_eq!(sim.scan_pos(), (0, 0));
        assert_eq!(sim.cycles(), 13 * 7);
    }

    #[test]
    fn test_non_dividing_batch_size_rejected() {
        let err = VgaSim::new(
            ConstModel { r: 0, g: 0, b: 0 },
            Timing::VGA_640X480,
            BatchPolicy::FixedBatch(7),
        );
        assert!(err.is_err());
        assert!(VgaSim::new(
            ConstModel { r: 0, g: 0, b: 0 },
            Timing::VGA_640X480,
            BatchPolicy::FixedBatch(8),
        )
        .is_ok());
    }

    #[test]
    fn test_active_samples_land_once_at_exact_index() {
        // Each framebuffer entry must hold the sample from cycle
        // y*h_total + x; no blanking-cycle sample may appear anywhere.
        let mut sim =
            VgaSim::new(CycleStampModel::default(), SMALL, BatchPolicy::FullFrame).unwrap();
        sim.run_batch();
        for y in 0..SMALL.active_h {
            for x in 0..SMALL.active_w {
                let cycle = (y * SMALL.h_total + x) as u64;
                let expected = video::pack_rgb((cycle % 16) as u8, 0, 0);
                assert_eq!(
                    sim.framebuffer()[y * SMALL.active_w + x],
                    expected,
                    "pixel ({},{})",
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_fixed_batch_presents_once_per_frame() {
        // 50 cycles per frame, 10 per batch: exactly every fifth batch
        // completes a frame.
        let mut sim = const_sim(SMALL, BatchPolicy::FixedBatch(10), 0, 0, 0);
        let mut presented = 0;
        for _ in 0..15 {
            if sim.run_batch() {
                presented += 1;
            }
        }
        assert_eq!(presented, 3);
        assert_eq!(sim.frames_completed(), 3);
    }

    #[test]
    fn test_button_press_reaches_model_every_cycle() {
        let mut sim = VgaSim::new(InputProbe::default(), SMALL, BatchPolicy::FullFrame).unwrap();
        sim.run_batch();
        assert_eq!(sim.model().up_cycles, 0);

        sim.set_input(Button::Up, true);
        sim.run_batch();
        assert_eq!(sim.model().up_cycles, SMALL.cycles_per_frame() as u64);

        sim.set_input(Button::Up, false);
        sim.run_batch();
        assert_eq!(sim.model().up_cycles, SMALL.cycles_per_frame() as u64);
    }

    #[test]
    fn test_constant_red_fills_two_frames() {
        let mut sim = const_sim(Timing::VGA_640X480, BatchPolicy::FullFrame, 15, 0, 0);
        sim.reset();
        for _ in 0..2 {
            assert!(sim.run_batch());
            assert!(sim.framebuffer().iter().all(|&px| px == 0xFF0000));
        }
        assert_eq!(sim.frames_completed(), 2);
    }

    #[test]
    fn test_run_frame_completes_current_frame() {
        let mut sim = const_sim(SMALL, BatchPolicy::FixedBatch(1), 0, 0, 0);
        for _ in 0..7 {
            sim.run_batch();
        }
        sim.run_frame();
        assert_eq!(sim.scan_pos(), (0, 0));
        assert_eq!(sim.frames_completed(), 1);
    }
}

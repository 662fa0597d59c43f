//! Built-in demo circuit: a synchronous test-pattern generator.
//!
//! Stands in for an externally compiled netlist when the harness runs on its
//! own, and gives tests a circuit with observable behavior. The generator
//! keeps its own horizontal/vertical timing counters, advanced on the rising
//! clock edge like the flip-flops of the circuit it mimics, and registers its
//! color output one edge ahead of the counters so the sample the harness
//! reads after an edge belongs to the position the counters held before it.
//!
//! Picture: eight vertical color bars, a movable square steered by the
//! direction buttons (one step per frame while held), square color selected
//! by the auxiliary buttons, video inverted while the center button is held.
//! Outputs are black during blanking, as the real circuit's would be.

use crate::model::ClockedModel;
use crate::{Button, Timing};

/// Square edge length in pixels.
const SQUARE_SIZE: usize = 48;
/// Square movement per frame while a direction button is held.
const SQUARE_STEP: usize = 4;

/// Square fill colors selected by buttons 1–4, as 4-bit channels.
const PALETTE: [(u8, u8, u8); 4] = [(15, 15, 15), (15, 2, 2), (2, 15, 2), (2, 6, 15)];

pub struct PatternGenerator {
    timing: Timing,
    clk: bool,
    prev_clk: bool,
    rst_n: bool,
    buttons: [bool; Button::COUNT],
    /// Timing counters, blanking included
    hcount: usize,
    vcount: usize,
    /// Square top-left corner
    sq_x: usize,
    sq_y: usize,
    palette: usize,
    /// Registered color output pins
    out: (u8, u8, u8),
}

impl PatternGenerator {
    pub fn new() -> Self {
        Self::with_timing(Timing::VGA_640X480)
    }

    pub fn with_timing(timing: Timing) -> Self {
        PatternGenerator {
            timing,
            clk: false,
            prev_clk: false,
            rst_n: true,
            buttons: [false; Button::COUNT],
            hcount: 0,
            vcount: 0,
            sq_x: (timing.active_w.saturating_sub(SQUARE_SIZE)) / 2,
            sq_y: (timing.active_h.saturating_sub(SQUARE_SIZE)) / 2,
            palette: 0,
            out: (0, 0, 0),
        }
    }

    pub fn square_pos(&self) -> (usize, usize) {
        (self.sq_x, self.sq_y)
    }

    fn pressed(&self, button: Button) -> bool {
        self.buttons[button.index()]
    }

    /// Once-per-frame register updates: square movement and palette latch.
    fn frame_tick(&mut self) {
        if self.pressed(Button::Left) {
            self.sq_x = self.sq_x.saturating_sub(SQUARE_STEP);
        }
        if self.pressed(Button::Right) && self.sq_x + SQUARE_SIZE + SQUARE_STEP <= self.timing.active_w {
            self.sq_x += SQUARE_STEP;
        }
        if self.pressed(Button::Up) {
            self.sq_y = self.sq_y.saturating_sub(SQUARE_STEP);
        }
        if self.pressed(Button::Down) && self.sq_y + SQUARE_SIZE + SQUARE_STEP <= self.timing.active_h {
            self.sq_y += SQUARE_STEP;
        }
        for (i, button) in [Button::B1, Button::B2, Button::B3, Button::B4].iter().enumerate() {
            if self.pressed(*button) {
                self.palette = i;
            }
        }
    }

    /// Combinational pixel color for one scan position.
    fn color_at(&self, x: usize, y: usize) -> (u8, u8, u8) {
        if x >= self.timing.active_w || y >= self.timing.active_h {
            return (0, 0, 0); // blanking
        }
        let (r, g, b) = if x >= self.sq_x
            && x < self.sq_x + SQUARE_SIZE
            && y >= self.sq_y
            && y < self.sq_y + SQUARE_SIZE
        {
            PALETTE[self.palette]
        } else {
            // Eight vertical bars cycling through the RGB combinations
            let band = (x * 8 / self.timing.active_w) as u8;
            (
                if band & 4 != 0 { 12 } else { 1 },
                if band & 2 != 0 { 12 } else { 1 },
                if band & 1 != 0 { 12 } else { 1 },
            )
        };
        if self.pressed(Button::Center) {
            (15 - r, 15 - g, 15 - b)
        } else {
            (r, g, b)
        }
    }

    fn on_rising_edge(&mut self) {
        if !self.rst_n {
            self.hcount = 0;
            self.vcount = 0;
            self.sq_x = (self.timing.active_w.saturating_sub(SQUARE_SIZE)) / 2;
            self.sq_y = (self.timing.active_h.saturating_sub(SQUARE_SIZE)) / 2;
            self.palette = 0;
            self.out = (0, 0, 0);
            return;
        }
        // Register the output for the position the counters currently hold,
        // then advance them.
        self.out = self.color_at(self.hcount, self.vcount);
        self.hcount += 1;
        if self.hcount == self.timing.h_total {
            self.hcount = 0;
            self.vcount += 1;
            if self.vcount == self.timing.v_total {
                self.vcount = 0;
                self.frame_tick();
            }
        }
    }
}

impl Default for PatternGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockedModel for PatternGenerator {
    fn set_clk(&mut self, level: bool) {
        self.clk = level;
    }

    fn set_rst_n(&mut self, level: bool) {
        self.rst_n = level;
    }

    fn set_button(&mut self, button: Button, pressed: bool) {
        self.buttons[button.index()] = pressed;
    }

    fn eval(&mut self) {
        if self.clk && !self.prev_clk {
            self.on_rising_edge();
        }
        self.prev_clk = self.clk;
    }

    fn rgb(&self) -> (u8, u8, u8) {
        self.out
    }
}

//! Clocked model stepper.
//!
//! Advances the simulated circuit by whole clock periods and owns the button
//! input state. Button state lives here, not in globals or in the caller, so
//! the only way stimulus reaches the model is through [`Stepper::set_input`].

use crate::model::ClockedModel;
use crate::Button;

/// Drives a [`ClockedModel`] one full clock period at a time.
pub struct Stepper<M> {
    model: M,
    buttons: [bool; Button::COUNT],
}

impl<M: ClockedModel> Stepper<M> {
    pub fn new(model: M) -> Self {
        Stepper {
            model,
            buttons: [false; Button::COUNT],
        }
    }

    /// Apply the power-on reset pulse.
    ///
    /// Holds the reset line low for `pulse_cycles` full clock periods, then
    /// raises it and drives every button pin to its released state. The model
    /// runs indefinitely afterwards; reset is not reasserted.
    pub fn reset(&mut self, pulse_cycles: u32) {
        self.model.set_rst_n(false);
        for _ in 0..pulse_cycles {
            self.model.set_clk(false);
            self.model.eval();
            self.model.set_clk(true);
            self.model.eval();
        }
        self.model.set_rst_n(true);
        for button in Button::ALL {
            self.buttons[button.index()] = false;
            self.model.set_button(button, false);
        }
    }

    /// Run one full clock period: drive the clock low and evaluate, drive it
    /// high and evaluate, then sample the color output pins.
    pub fn step_cycle(&mut self) -> (u8, u8, u8) {
        self.model.set_clk(false);
        self.model.eval();
        self.model.set_clk(true);
        self.model.eval();
        self.model.rgb()
    }

    /// Update one button signal. The new value is seen by the model from the
    /// next `step_cycle` on; a cycle already stepped is unaffected.
    pub fn set_input(&mut self, button: Button, active: bool) {
        self.buttons[button.index()] = active;
        self.model.set_button(button, active);
    }

    /// Current state of one button signal.
    pub fn input(&self, button: Button) -> bool {
        self.buttons[button.index()]
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }
}

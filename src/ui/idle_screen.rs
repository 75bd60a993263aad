// SPDX-License-Identifier: GPL-3.0-or-later

use embedded_graphics::{pixelcolor::Rgb565, prelude::*, primitives::Rectangle};

use crate::consts::ui::{CALIBRATE_BUTTON, TOUCH_ECHO_SIZE};
use crate::drivers::touch_screen::{TouchEvent, TouchSample};
use super::{draw_text, fill_rectangle, LARGE_FONT, SMALL_FONT};

/// Screen shown outside of calibration. Touches leave a trail, so the
/// accuracy of the calibration can be checked by eye.
pub struct IdleScreen {
    button: Rectangle,
}

impl Default for IdleScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleScreen {
    pub const fn new() -> Self {
        let (x, y, w, h) = CALIBRATE_BUTTON;
        Self { button: Rectangle::new(Point::new(x, y), Size::new(w, h)) }
    }

    pub fn draw<D>(&self, display: &mut D, calibrated: bool) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        display.clear(Rgb565::BLACK)?;
        draw_text(display, 10, 10, "Touch Test", Rgb565::WHITE, Rgb565::BLACK, LARGE_FONT)?;

        if calibrated {
            draw_text(display, 10, 40, "Calibrated", Rgb565::GREEN, Rgb565::BLACK, SMALL_FONT)?;
        } else {
            draw_text(display, 10, 40, "Not calibrated", Rgb565::YELLOW, Rgb565::BLACK, SMALL_FONT)?;
        }

        display.fill_solid(&self.button, Rgb565::BLUE)?;
        let label = "Calibrate";
        let label_width = (LARGE_FONT.character_size.width * label.len() as u32) as i32;
        let label_height = LARGE_FONT.character_size.height as i32;
        let origin = self.button.center() - Point::new(label_width / 2, label_height / 2);
        draw_text(display, origin.x, origin.y, label, Rgb565::WHITE, Rgb565::BLUE, LARGE_FONT)
    }

    /// Returns true when the touch asks for a new calibration run.
    pub fn handle_touch<D>(&mut self, sample: &TouchSample, display: &mut D) -> Result<bool, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if !sample.event.is_contact() {
            return Ok(false);
        }

        let position = sample.position();
        if self.button.contains(position) {
            return Ok(sample.event == TouchEvent::Press);
        }

        let half = (TOUCH_ECHO_SIZE / 2) as i32;
        fill_rectangle(display, position.x - half, position.y - half,
                       TOUCH_ECHO_SIZE, TOUCH_ECHO_SIZE, Rgb565::WHITE)?;
        Ok(false)
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later

use core::cell::Cell;
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embedded_graphics::prelude::Point;

use crate::consts::{display::{WIDTH, HEIGHT}, touch_screen::FULL_SCALE};
use super::CalibrationCoefficients;

// The panel reports its maximum where the display has its origin.
pub fn invert_axis(raw: u16) -> u16 {
    FULL_SCALE - raw.min(FULL_SCALE)
}

pub fn scale_to_display(corrected: u16, display_max: u16) -> i32 {
    (corrected as u32 * display_max as u32 / FULL_SCALE as u32) as i32
}

// f32::round() is not available in core.
fn round(v: f32) -> i32 {
    if v < 0.0 {
        (v - 0.5) as i32
    } else {
        (v + 0.5) as i32
    }
}

/// Maps raw ADC readings to display pixels. Without calibration, the axes are
/// inverted and scaled to the display size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CoordinateTransform {
    coefficients: Option<CalibrationCoefficients>,
}

impl CoordinateTransform {
    pub const UNCALIBRATED: Self = Self { coefficients: None };

    pub const fn calibrated(coefficients: CalibrationCoefficients) -> Self {
        Self { coefficients: Some(coefficients) }
    }

    pub fn has_valid_calibration(&self) -> bool {
        self.coefficients.is_some()
    }

    pub fn coefficients(&self) -> Option<&CalibrationCoefficients> {
        self.coefficients.as_ref()
    }

    pub fn to_display(&self, raw_x: u16, raw_y: u16) -> Point {
        match &self.coefficients {
            Some(c) => {
                let (x, y) = c.apply(raw_x, raw_y);
                Point::new(round(x), round(y))
            }
            None => Point::new(
                scale_to_display(invert_axis(raw_x), WIDTH),
                scale_to_display(invert_axis(raw_y), HEIGHT),
            ),
        }
    }
}

/// The transform in effect, shared between the touch task and the UI task.
/// Reads and writes are whole-value copies under a critical section, so the
/// touch task never observes half of an update.
pub struct SharedTransform(Mutex<CriticalSectionRawMutex, Cell<CoordinateTransform>>);

impl SharedTransform {
    pub const fn new() -> Self {
        Self(Mutex::new(Cell::new(CoordinateTransform::UNCALIBRATED)))
    }

    pub fn get(&self) -> CoordinateTransform {
        self.0.lock(|t| t.get())
    }

    pub fn set(&self, transform: CoordinateTransform) {
        self.0.lock(|t| t.set(transform))
    }
}

impl Default for SharedTransform {
    fn default() -> Self {
        Self::new()
    }
}

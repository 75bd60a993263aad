// SPDX-License-Identifier: GPL-3.0-or-later

// The touch panel and the display don't agree on coordinates. The panel is
// mounted rotated, and the resistive layer never spans exactly the visible
// area. We ask the user to touch known points, and derive a linear mapping
// from the raw ADC readings to display pixels.

mod coefficients;
pub use coefficients::*;

mod transform;
pub use transform::*;

mod engine;
pub use engine::*;

pub type CalibrationResult<T> = Result<T, CalibrationError>;

bitflags::bitflags! {
    pub struct Axes: u8 {
        const X = 0b01;
        const Y = 0b10;
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CalibrationError {
    // Collection errors
        /// No calibration run is waiting for a point.
        NotCollecting,
        /// The touch landed outside the tolerance radius. Only reported
        /// with strict point matching.
        TooFar { distance_sq: u32 },
        /// The menu was requested before every point was collected.
        RunIncomplete,

    // Coefficient errors
        /// One of the points used by the linear model is missing.
        NotEnoughPoints,
        /// The raw readings did not span any range on these axes.
        DegenerateAxes(Axes),
}

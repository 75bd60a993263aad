// SPDX-License-Identifier: GPL-3.0-or-later

use super::{Axes, CalibrationError, CalibrationPoint, CalibrationResult};

// The linear model only needs three points. Bottom-right and center are
// collected, but unused for now.
pub const TOP_LEFT: usize = 0;
pub const TOP_RIGHT: usize = 1;
pub const BOTTOM_LEFT: usize = 3;

/// `display = offset + scale * raw`, independently on each axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CalibrationCoefficients {
    pub x_offset: f32,
    pub x_scale: f32,
    pub y_offset: f32,
    pub y_scale: f32,
}

/// Result of a coefficient derivation. Axes listed in `degenerate` got the
/// identity fallback (scale=1, offset=0).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Derivation {
    pub coefficients: CalibrationCoefficients,
    pub degenerate: Axes,
}

impl CalibrationCoefficients {
    pub fn derive(points: &[CalibrationPoint]) -> CalibrationResult<Derivation> {
        let (tl, tr, bl) = match (points.get(TOP_LEFT), points.get(TOP_RIGHT), points.get(BOTTOM_LEFT)) {
            (Some(tl), Some(tr), Some(bl)) if tl.collected && tr.collected && bl.collected => (tl, tr, bl),
            _ => return Err(CalibrationError::NotEnoughPoints),
        };

        let mut degenerate = Axes::empty();

        let (x_offset, x_scale) = fit_axis(tl.raw_x, tr.raw_x, tl.display_x, tr.display_x)
            .unwrap_or_else(|| {
                degenerate |= Axes::X;
                (0.0, 1.0)
            });

        let (y_offset, y_scale) = fit_axis(tl.raw_y, bl.raw_y, tl.display_y, bl.display_y)
            .unwrap_or_else(|| {
                degenerate |= Axes::Y;
                (0.0, 1.0)
            });

        Ok(Derivation {
            coefficients: Self { x_offset, x_scale, y_offset, y_scale },
            degenerate,
        })
    }

    pub fn apply(&self, raw_x: u16, raw_y: u16) -> (f32, f32) {
        (
            self.x_offset + self.x_scale * raw_x as f32,
            self.y_offset + self.y_scale * raw_y as f32,
        )
    }
}

// Returns (offset, scale), or None when the raw readings don't span a range.
fn fit_axis(raw_min: u16, raw_max: u16, display_min: u16, display_max: u16) -> Option<(f32, f32)> {
    let raw_range = raw_max as f32 - raw_min as f32;
    if raw_range == 0.0 {
        return None;
    }

    let scale = (display_max as f32 - display_min as f32) / raw_range;
    let offset = display_min as f32 - scale * raw_min as f32;
    Some((offset, scale))
}

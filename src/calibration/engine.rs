// SPDX-License-Identifier: GPL-3.0-or-later

use embedded_graphics::prelude::Point;

use crate::consts::calibration::*;
use super::{
    CalibrationCoefficients, CalibrationError, CalibrationResult, CoordinateTransform,
    SharedTransform,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Collecting,
    Menu,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    Save,
    Discard,
    Recalibrate,
}

impl MenuAction {
    /// Returns the menu option under the given display Y coordinate.
    /// Zone edges are inclusive, the first matching zone wins.
    pub fn at(y: i32) -> Option<Self> {
        let within = |(top, bottom): (i32, i32)| (top..=bottom).contains(&y);

        if within(MENU_SAVE_Y) {
            Some(MenuAction::Save)
        } else if within(MENU_DISCARD_Y) {
            Some(MenuAction::Discard)
        } else if within(MENU_RECALIBRATE_Y) {
            Some(MenuAction::Recalibrate)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalibrationPoint {
    pub display_x: u16,
    pub display_y: u16,
    pub raw_x: u16,
    pub raw_y: u16,
    pub collected: bool,
}

impl CalibrationPoint {
    pub const fn new(display_x: u16, display_y: u16) -> Self {
        Self { display_x, display_y, raw_x: 0, raw_y: 0, collected: false }
    }

    pub fn display(&self) -> Point {
        Point::new(self.display_x as i32, self.display_y as i32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationConfig {
    pub points: [(u16, u16); NUM_POINTS],
    pub strict_point_matching: bool,
    pub tolerance_radius: u16,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            points: POINTS,
            strict_point_matching: STRICT_POINT_MATCHING,
            tolerance_radius: TOLERANCE_RADIUS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationState {
    pub mode: Mode,
    pub current_step: usize,
    pub points: [CalibrationPoint; NUM_POINTS],
    pub coefficients: CalibrationCoefficients,
}

/// What the screen compares between two refreshes. `run` changes every time
/// a calibration run starts, even if mode and step look the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub mode: Mode,
    pub step: usize,
    pub run: u16,
}

/// The calibration state machine. It is owned by a single task, the one
/// that draws the screen. The resulting transform is published through the
/// `SharedTransform` when the user saves.
pub struct Calibration<'a> {
    state: CalibrationState,
    config: CalibrationConfig,
    run: u16,
    last_result: Option<CalibrationResult<()>>,
    last_action: Option<MenuAction>,
    active_transform: &'a SharedTransform,
}

impl<'a> Calibration<'a> {
    pub fn new(config: CalibrationConfig, active_transform: &'a SharedTransform) -> Self {
        let mut points = [CalibrationPoint::default(); NUM_POINTS];
        for (point, &(x, y)) in points.iter_mut().zip(config.points.iter()) {
            *point = CalibrationPoint::new(x, y);
        }

        Self {
            state: CalibrationState {
                mode: Mode::Idle,
                current_step: 0,
                points,
                coefficients: CalibrationCoefficients::default(),
            },
            config,
            run: 0,
            last_result: None,
            last_action: None,
            active_transform,
        }
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn current_step(&self) -> usize {
        self.state.current_step
    }

    pub fn point(&self, index: usize) -> Option<&CalibrationPoint> {
        self.state.points.get(index)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot { mode: self.state.mode, step: self.state.current_step, run: self.run }
    }

    /// Outcome of the last coefficient computation done by `show_menu()`.
    pub fn last_result(&self) -> Option<CalibrationResult<()>> {
        self.last_result
    }

    /// Menu option that ended (or restarted) the last run.
    pub fn last_action(&self) -> Option<MenuAction> {
        self.last_action
    }

    pub fn active_transform(&self) -> CoordinateTransform {
        self.active_transform.get()
    }

    /// All points collected, waiting for the screen to show the menu.
    pub fn is_complete(&self) -> bool {
        self.state.mode == Mode::Collecting && self.state.current_step == NUM_POINTS
    }

    pub fn start_calibration(&mut self) {
        for point in &mut self.state.points {
            point.collected = false;
        }
        self.state.current_step = 0;
        self.state.mode = Mode::Collecting;
        self.run = self.run.wrapping_add(1);
        self.last_result = None;
        self.last_action = None;

        let first = &self.state.points[0];
        info!("Starting touch screen calibration");
        debug!("Touch point 1 at x={} y={}", first.display_x, first.display_y);
    }

    /// Records a raw touch for the current point. Returns the number of
    /// points collected so far.
    pub fn ingest_touch(&mut self, raw_x: u16, raw_y: u16) -> CalibrationResult<usize> {
        let step = self.state.current_step;
        if self.state.mode != Mode::Collecting || step >= NUM_POINTS {
            return Err(CalibrationError::NotCollecting);
        }

        let estimate = CoordinateTransform::UNCALIBRATED.to_display(raw_x, raw_y);
        let expected = self.state.points[step].display();
        let delta = estimate - expected;
        let distance_sq = (delta.x * delta.x + delta.y * delta.y) as u32;

        if self.config.strict_point_matching {
            let radius = self.config.tolerance_radius as u32;
            if distance_sq > radius * radius {
                warn!("Touch too far from point {}: dx={} dy={}", step + 1, delta.x, delta.y);
                return Err(CalibrationError::TooFar { distance_sq });
            }
        }

        let point = &mut self.state.points[step];
        point.raw_x = raw_x;
        point.raw_y = raw_y;
        point.collected = true;

        info!("Calibration point {} collected", step + 1);
        debug!("  expected: x={} y={}", expected.x, expected.y);
        debug!("  received: raw x={} y={}, estimated x={} y={}", raw_x, raw_y, estimate.x, estimate.y);
        debug!("  difference: dx={} dy={}", delta.x, delta.y);

        self.state.current_step += 1;
        Ok(self.state.current_step)
    }

    /// Computes the coefficients and enters the menu. Refused, without any
    /// change, until every point is collected.
    pub fn show_menu(&mut self) -> CalibrationResult<()> {
        if !self.is_complete() {
            return Err(CalibrationError::RunIncomplete);
        }

        self.last_result = Some(self.compute_coefficients().map(|_| ()));
        self.state.mode = Mode::Menu;
        self.state.current_step = 0;
        info!("Calibration complete, showing menu");
        Ok(())
    }

    /// Coordinates are in display pixels, see `menu_transform()`.
    pub fn handle_menu_touch(&mut self, display_x: i32, display_y: i32) -> Option<MenuAction> {
        if self.state.mode != Mode::Menu {
            return None;
        }

        let action = MenuAction::at(display_y);
        match action {
            Some(MenuAction::Save) => {
                if self.last_result == Some(Ok(())) {
                    info!("Saving calibration results");
                    self.active_transform.set(CoordinateTransform::calibrated(self.state.coefficients));
                } else {
                    warn!("Calibration data is unusable, keeping the previous transform");
                }
                self.state.mode = Mode::Idle;
            }
            Some(MenuAction::Discard) => {
                info!("Discarding calibration results");
                self.state.mode = Mode::Idle;
            }
            Some(MenuAction::Recalibrate) => {
                info!("Restarting calibration");
                self.start_calibration();
            }
            None => {
                debug!("Menu touch outside of options: x={} y={}", display_x, display_y);
                return None;
            }
        }

        self.last_action = action;
        action
    }

    /// Derives the coefficients from the top-left, top-right and bottom-left
    /// points. Missing points leave the coefficients untouched. Degenerate
    /// axes get scale=1 offset=0 and are reported as an error, while the
    /// coefficients are still updated.
    pub fn compute_coefficients(&mut self) -> CalibrationResult<CalibrationCoefficients> {
        let derivation = match CalibrationCoefficients::derive(&self.state.points) {
            Ok(d) => d,
            Err(e) => {
                error!("Cannot compute calibration coefficients: {:?}", e);
                return Err(e);
            }
        };

        let c = derivation.coefficients;
        self.state.coefficients = c;

        info!("Calibration coefficients:");
        info!("  x_offset={:.3} x_scale={:.6}", c.x_offset, c.x_scale);
        info!("  y_offset={:.3} y_scale={:.6}", c.y_offset, c.y_scale);
        info!("To make them permanent:");
        info!("CalibrationCoefficients {{ x_offset: {:.3}, x_scale: {:.6}, y_offset: {:.3}, y_scale: {:.6} }}",
            c.x_offset, c.x_scale, c.y_offset, c.y_scale);

        if derivation.degenerate.is_empty() {
            Ok(c)
        } else {
            warn!("Degenerate calibration on {:?}, using identity", derivation.degenerate);
            Err(CalibrationError::DegenerateAxes(derivation.degenerate))
        }
    }

    /// Applies the current coefficients, whether or not they were saved.
    pub fn to_display(&self, raw_x: u16, raw_y: u16) -> Point {
        CoordinateTransform::calibrated(self.state.coefficients).to_display(raw_x, raw_y)
    }

    /// Transform to hit-test menu touches with: the fresh coefficients when
    /// they are usable, the active transform otherwise.
    pub fn menu_transform(&self) -> CoordinateTransform {
        match self.last_result {
            Some(Ok(())) => CoordinateTransform::calibrated(self.state.coefficients),
            _ => self.active_transform.get(),
        }
    }
}

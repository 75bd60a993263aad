// SPDX-License-Identifier: GPL-3.0-or-later

use core::fmt::Write;
use embassy_time::Duration;
use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
use heapless::String;

use crate::calibration::{Calibration, MenuAction, Mode, Snapshot};
use crate::consts::{
    calibration::{POINT_SETTLE_DELAY_MS, RESULT_NOTICE_DELAY_MS},
    display::WIDTH,
    ui::{CROSSHAIR_HALF_LENGTH, CROSSHAIR_THICKNESS},
};
use super::{draw_text, fill_rectangle, LARGE_FONT, SMALL_FONT};

/// What the caller should do after a refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refresh {
    Unchanged,
    Redrawn,
    /// The screen shows a transient message. Wait that long, then refresh
    /// again.
    Hold(Duration),
    /// Calibration is over, the application screen should be drawn.
    ShowIdle,
}

// Work left over from a Hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pending {
    Nothing,
    NextPrompt,
    IdleScreen,
}

/// Draws the calibration screens. It watches the calibration state, and
/// only draws when it changed since the last refresh.
pub struct CalibrationScreen {
    last: Option<Snapshot>,
    pending: Pending,
}

impl Default for CalibrationScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationScreen {
    pub const fn new() -> Self {
        Self { last: None, pending: Pending::Nothing }
    }

    /// Draws whatever changed. After a display error, nothing is assumed
    /// to be on screen and the next refresh draws the current state again.
    pub fn refresh<D>(&mut self, cal: &mut Calibration, display: &mut D) -> Result<Refresh, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let refresh = self.redraw(cal, display);
        if refresh.is_err() {
            self.last = None;
            self.pending = Pending::Nothing;
        }
        refresh
    }

    fn redraw<D>(&mut self, cal: &mut Calibration, display: &mut D) -> Result<Refresh, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let snapshot = cal.snapshot();

        // Something else may have happened during the hold. In that case we
        // just redraw whatever the state is now.
        let pending = core::mem::replace(&mut self.pending, Pending::Nothing);
        if self.last == Some(snapshot) {
            match pending {
                Pending::NextPrompt => return self.advance(cal, display),
                Pending::IdleScreen => return Ok(Refresh::ShowIdle),
                Pending::Nothing => return Ok(Refresh::Unchanged),
            }
        }

        let previous = self.last.replace(snapshot);

        match snapshot.mode {
            Mode::Collecting => {
                let same_run = matches!(previous,
                    Some(p) if p.mode == Mode::Collecting && p.run == snapshot.run);

                if same_run && snapshot.step > 0 {
                    let collected = snapshot.step - 1;
                    if let Some(point) = cal.point(collected) {
                        draw_target(display, collected, point.display(), Rgb565::GREEN)?;
                    }
                    self.pending = Pending::NextPrompt;
                    Ok(Refresh::Hold(Duration::from_millis(POINT_SETTLE_DELAY_MS)))
                } else if cal.is_complete() {
                    // Every point is in but its feedback was never shown.
                    self.advance(cal, display)
                } else {
                    draw_prompt(display, cal)?;
                    Ok(Refresh::Redrawn)
                }
            }
            Mode::Menu => {
                draw_menu(display, cal)?;
                Ok(Refresh::Redrawn)
            }
            Mode::Idle => {
                let notice = match cal.last_action() {
                    Some(MenuAction::Save) if previous.is_some() => Some(("Results Saved!", Rgb565::GREEN)),
                    Some(MenuAction::Discard) if previous.is_some() => Some(("Results Discarded", Rgb565::RED)),
                    _ => None,
                };

                match notice {
                    Some((text, color)) => {
                        display.clear(Rgb565::BLACK)?;
                        draw_text(display, 10, 50, text, color, Rgb565::BLACK, LARGE_FONT)?;
                        self.pending = Pending::IdleScreen;
                        Ok(Refresh::Hold(Duration::from_millis(RESULT_NOTICE_DELAY_MS)))
                    }
                    None => Ok(Refresh::ShowIdle),
                }
            }
        }
    }

    // Moves on after the collected point was shown: next target, or the menu
    // once every point is in.
    fn advance<D>(&mut self, cal: &mut Calibration, display: &mut D) -> Result<Refresh, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if cal.is_complete() {
            if let Err(e) = cal.show_menu() {
                warn!("Cannot show the calibration menu: {:?}", e);
            }
            self.last = Some(cal.snapshot());
            draw_menu(display, cal)?;
        } else {
            draw_prompt(display, cal)?;
        }
        Ok(Refresh::Redrawn)
    }
}

fn draw_prompt<D>(display: &mut D, cal: &Calibration) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    display.clear(Rgb565::BLACK)?;
    draw_text(display, 50, 50, "Calibration Mode", Rgb565::YELLOW, Rgb565::BLACK, LARGE_FONT)?;
    draw_text(display, 50, 80, "Touch the points", Rgb565::YELLOW, Rgb565::BLACK, LARGE_FONT)?;

    let step = cal.current_step();
    if let Some(point) = cal.point(step) {
        draw_target(display, step, point.display(), Rgb565::RED)?;
    }
    Ok(())
}

// A crosshair with the 1-based point number next to it.
fn draw_target<D>(display: &mut D, index: usize, center: Point, color: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let half = CROSSHAIR_HALF_LENGTH;
    let length = 2 * half as u32;
    let offset = (CROSSHAIR_THICKNESS / 2) as i32;
    fill_rectangle(display, center.x - half, center.y - offset, length, CROSSHAIR_THICKNESS, color)?;
    fill_rectangle(display, center.x - offset, center.y - half, CROSSHAIR_THICKNESS, length, color)?;

    // A point number is at most 20 digits.
    let mut label: String<20> = String::new();
    write!(label, "{}", index + 1).ok();

    let label_width = (SMALL_FONT.character_size.width * label.len() as u32) as i32;
    let mut x = center.x + half + 5;
    if x + label_width > WIDTH as i32 {
        x = center.x - half - 5 - label_width;
    }
    draw_text(display, x, center.y - half, &label, Rgb565::WHITE, Rgb565::BLACK, SMALL_FONT)
}

const COEFFICIENT_LINE_LEN: usize = WIDTH as usize / 6;

fn draw_menu<D>(display: &mut D, cal: &Calibration) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    display.clear(Rgb565::BLACK)?;

    match cal.last_result() {
        Some(Ok(())) => draw_text(display, 10, 10, "Calibration Complete", Rgb565::GREEN, Rgb565::BLACK, LARGE_FONT)?,
        _ => draw_text(display, 10, 10, "Calibration Failed", Rgb565::RED, Rgb565::BLACK, LARGE_FONT)?,
    }

    // Each label sits at the top of its hit zone.
    draw_text(display, 10, 40, "1. Save Results", Rgb565::WHITE, Rgb565::BLACK, LARGE_FONT)?;
    draw_text(display, 10, 65, "2. Discard Results", Rgb565::WHITE, Rgb565::BLACK, LARGE_FONT)?;
    draw_text(display, 10, 90, "3. Recalibrate", Rgb565::WHITE, Rgb565::BLACK, LARGE_FONT)?;

    let c = cal.state().coefficients;
    // Out of range coefficients are cut at the screen width, 53 columns.
    let mut line: String<COEFFICIENT_LINE_LEN> = String::new();
    write!(line, "x = {:.1} + {:.4} * raw", c.x_offset, c.x_scale).ok();
    draw_text(display, 10, 130, &line, Rgb565::WHITE, Rgb565::BLACK, SMALL_FONT)?;
    line.clear();
    write!(line, "y = {:.1} + {:.4} * raw", c.y_offset, c.y_scale).ok();
    draw_text(display, 10, 142, &line, Rgb565::WHITE, Rgb565::BLACK, SMALL_FONT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationConfig, SharedTransform};
    use crate::ui::test_display::{BusFault, FrameBuffer};

    const RAW: [(u16, u16); 5] = [
        (100, 100),
        (500, 100),
        (500, 500),
        (100, 500),
        (300, 300),
    ];

    const SETTLE: Refresh = Refresh::Hold(Duration::from_millis(POINT_SETTLE_DELAY_MS));
    const NOTICE: Refresh = Refresh::Hold(Duration::from_millis(RESULT_NOTICE_DELAY_MS));

    fn collect(screen: &mut CalibrationScreen, cal: &mut Calibration, fb: &mut FrameBuffer) {
        for &(x, y) in &RAW {
            cal.ingest_touch(x, y).unwrap();
            assert_eq!(screen.refresh(cal, fb), Ok(SETTLE));
            assert_eq!(screen.refresh(cal, fb), Ok(Refresh::Redrawn));
        }
    }

    #[test]
    fn idle_hands_over_to_the_application() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::ShowIdle));
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Unchanged));
        assert_eq!(fb.take_writes(), 0);
    }

    #[test]
    fn start_draws_prompt_and_first_target() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        cal.start_calibration();
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Redrawn));
        assert_eq!(fb.pixel(10, 10), Rgb565::RED);
        assert!(fb.count(Rgb565::YELLOW) > 0);

        fb.take_writes();
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Unchanged));
        assert_eq!(fb.take_writes(), 0);
    }

    #[test]
    fn collected_point_turns_green_then_next_target_shows() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        cal.start_calibration();
        screen.refresh(&mut cal, &mut fb).unwrap();

        cal.ingest_touch(100, 100).unwrap();
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(SETTLE));
        assert_eq!(fb.pixel(10, 10), Rgb565::GREEN);

        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Redrawn));
        assert_eq!(fb.pixel(10, 10), Rgb565::BLACK);
        assert_eq!(fb.pixel(310, 10), Rgb565::RED);
    }

    #[test]
    fn labels_near_the_right_edge_stay_on_screen() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        cal.start_calibration();
        cal.ingest_touch(100, 100).unwrap();
        screen.refresh(&mut cal, &mut fb).unwrap();
        screen.refresh(&mut cal, &mut fb).unwrap();
        assert_eq!(fb.clipped, 0);
    }

    #[test]
    fn last_point_leads_to_the_menu() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        cal.start_calibration();
        screen.refresh(&mut cal, &mut fb).unwrap();
        collect(&mut screen, &mut cal, &mut fb);

        assert_eq!(cal.mode(), Mode::Menu);
        assert_eq!(cal.last_result(), Some(Ok(())));
        assert!(fb.count(Rgb565::GREEN) > 0);
        assert_eq!(fb.count(Rgb565::RED), 0);
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Unchanged));
    }

    #[test]
    fn display_error_on_the_last_point_still_reaches_the_menu() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        cal.start_calibration();
        screen.refresh(&mut cal, &mut fb).unwrap();
        for &(x, y) in &RAW[..4] {
            cal.ingest_touch(x, y).unwrap();
            screen.refresh(&mut cal, &mut fb).unwrap();
            screen.refresh(&mut cal, &mut fb).unwrap();
        }

        cal.ingest_touch(RAW[4].0, RAW[4].1).unwrap();
        fb.failing = true;
        assert_eq!(screen.refresh(&mut cal, &mut fb), Err(BusFault));
        fb.failing = false;

        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Redrawn));
        assert_eq!(cal.mode(), Mode::Menu);
        assert!(fb.count(Rgb565::GREEN) > 0);
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Unchanged));
    }

    #[test]
    fn display_error_during_the_hold_redraws_the_prompt() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        cal.start_calibration();
        screen.refresh(&mut cal, &mut fb).unwrap();
        cal.ingest_touch(100, 100).unwrap();
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(SETTLE));

        fb.failing = true;
        assert_eq!(screen.refresh(&mut cal, &mut fb), Err(BusFault));
        fb.failing = false;

        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Redrawn));
        assert_eq!(fb.pixel(310, 10), Rgb565::RED);
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Unchanged));
    }

    #[test]
    fn failed_computation_shows_in_red() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        cal.start_calibration();
        screen.refresh(&mut cal, &mut fb).unwrap();
        for _ in 0..RAW.len() {
            cal.ingest_touch(2000, 2000).unwrap();
            screen.refresh(&mut cal, &mut fb).unwrap();
            screen.refresh(&mut cal, &mut fb).unwrap();
        }

        assert_eq!(cal.mode(), Mode::Menu);
        assert!(fb.count(Rgb565::RED) > 0);
    }

    #[test]
    fn save_shows_notice_then_idle() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        cal.start_calibration();
        screen.refresh(&mut cal, &mut fb).unwrap();
        collect(&mut screen, &mut cal, &mut fb);

        cal.handle_menu_touch(100, 45);
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(NOTICE));
        assert!(fb.count(Rgb565::GREEN) > 0);
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::ShowIdle));
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Unchanged));
    }

    #[test]
    fn discard_shows_notice_in_red() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        cal.start_calibration();
        screen.refresh(&mut cal, &mut fb).unwrap();
        collect(&mut screen, &mut cal, &mut fb);

        cal.handle_menu_touch(100, 70);
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(NOTICE));
        assert!(fb.count(Rgb565::RED) > 0);
        assert_eq!(fb.count(Rgb565::GREEN), 0);
    }

    #[test]
    fn recalibrate_starts_over() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        cal.start_calibration();
        screen.refresh(&mut cal, &mut fb).unwrap();
        collect(&mut screen, &mut cal, &mut fb);

        cal.handle_menu_touch(100, 100);
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Redrawn));
        assert_eq!(fb.pixel(10, 10), Rgb565::RED);
    }

    #[test]
    fn restart_mid_run_redraws_the_first_target() {
        let shared = SharedTransform::new();
        let mut cal = Calibration::new(CalibrationConfig::default(), &shared);
        let mut screen = CalibrationScreen::new();
        let mut fb = FrameBuffer::new();

        cal.start_calibration();
        screen.refresh(&mut cal, &mut fb).unwrap();
        cal.ingest_touch(100, 100).unwrap();
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(SETTLE));

        // Restarted during the hold: the pending prompt is dropped.
        cal.start_calibration();
        assert_eq!(screen.refresh(&mut cal, &mut fb), Ok(Refresh::Redrawn));
        assert_eq!(fb.pixel(10, 10), Rgb565::RED);
        assert_eq!(fb.pixel(310, 10), Rgb565::BLACK);
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later

use core::fmt::Debug;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::{Channel, Receiver}};
use embassy_time::{Duration, Instant, Timer};
use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
use futures::{select_biased, FutureExt};

use crate::calibration::{Calibration, Mode};
use crate::consts::{
    calibration::TOLERANCE_RADIUS,
    touch_screen::QUEUE_DEPTH,
    ui::{CONTACT_GAP_MS, REFRESH_INTERVAL_MS},
};
use crate::drivers::touch_screen::{TouchEvent, TouchSample};
use super::{CalibrationScreen, IdleScreen, Refresh};

/// Samples flow from the touch task to the UI task through this queue.
pub type TouchQueue = Channel<CriticalSectionRawMutex, TouchSample, QUEUE_DEPTH>;
pub type TouchReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, TouchSample, QUEUE_DEPTH>;

/// Everything the UI task owns: the calibration engine and the screens
/// drawing it.
pub struct Ui<'a> {
    calibration: Calibration<'a>,
    calibration_screen: CalibrationScreen,
    idle_screen: IdleScreen,
    // A resting finger keeps sending moves. Calibration takes one touch per
    // contact, this is set once it did.
    contact_consumed: bool,
    consumed_at: Point,
    last_sample_at: Option<Instant>,
}

impl<'a> Ui<'a> {
    pub fn new(calibration: Calibration<'a>) -> Self {
        Self {
            calibration,
            calibration_screen: CalibrationScreen::new(),
            idle_screen: IdleScreen::new(),
            contact_consumed: false,
            consumed_at: Point::zero(),
            last_sample_at: None,
        }
    }

    pub fn calibration(&self) -> &Calibration<'a> {
        &self.calibration
    }

    pub fn calibration_mut(&mut self) -> &mut Calibration<'a> {
        &mut self.calibration
    }

    /// Routes a touch sample to whatever is on screen.
    pub fn dispatch_touch<D>(&mut self, sample: &TouchSample, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if self.starts_new_contact(sample) {
            self.contact_consumed = false;
        }
        self.last_sample_at = Some(sample.timestamp);

        match self.calibration.mode() {
            Mode::Collecting | Mode::Menu if sample.event.is_contact() && !self.contact_consumed => {
                if self.feed_calibration(sample) {
                    self.contact_consumed = true;
                    self.consumed_at = sample.position();
                }
            }
            Mode::Idle => {
                if self.idle_screen.handle_touch(sample, display)? {
                    self.calibration.start_calibration();
                    self.contact_consumed = true;
                    self.consumed_at = sample.position();
                }
            }
            _ => {}
        }
        Ok(())
    }

    // The release of a contact and the press of the next one can both be
    // dropped when the queue is full. A move far away from the consumed
    // touch after such a gap is taken as a new contact.
    fn starts_new_contact(&self, sample: &TouchSample) -> bool {
        match sample.event {
            TouchEvent::Press | TouchEvent::Release => true,
            TouchEvent::Move => {
                let gap = self.last_sample_at.map_or(false, |t| {
                    sample.timestamp.saturating_duration_since(t) > Duration::from_millis(CONTACT_GAP_MS)
                });
                let delta = sample.position() - self.consumed_at;
                let radius = TOLERANCE_RADIUS as i32;
                gap && delta.x * delta.x + delta.y * delta.y > radius * radius
            }
            TouchEvent::None => false,
        }
    }

    // Returns true when the touch was used.
    fn feed_calibration(&mut self, sample: &TouchSample) -> bool {
        match self.calibration.mode() {
            Mode::Collecting => match self.calibration.ingest_touch(sample.raw_x, sample.raw_y) {
                Ok(_) => true,
                Err(e) => {
                    debug!("Calibration touch rejected: {:?}", e);
                    false
                }
            },
            Mode::Menu => {
                let p = self.calibration.menu_transform().to_display(sample.raw_x, sample.raw_y);
                self.calibration.handle_menu_touch(p.x, p.y).is_some()
            }
            Mode::Idle => false,
        }
    }

    pub fn refresh<D>(&mut self, display: &mut D) -> Result<Refresh, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let refresh = self.calibration_screen.refresh(&mut self.calibration, display)?;
        if refresh == Refresh::ShowIdle {
            let calibrated = self.calibration.active_transform().has_valid_calibration();
            self.idle_screen.draw(display, calibrated)?;
        }
        Ok(refresh)
    }
}

/// Body of the UI task. Touch samples are handled as they come, the screen
/// is refreshed after each of them, and periodically otherwise.
pub async fn run<D>(ui: &mut Ui<'_>, display: &mut D, samples: TouchReceiver<'_>) -> !
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    loop {
        let sample = {
            let next_sample = samples.receive().fuse();
            let tick = Timer::after(Duration::from_millis(REFRESH_INTERVAL_MS)).fuse();
            futures::pin_mut!(next_sample, tick);
            select_biased! {
                sample = next_sample => Some(sample),
                _ = tick => None,
            }
        };

        if let Some(sample) = sample {
            if let Err(e) = ui.dispatch_touch(&sample, display) {
                warn!("Display error: {:?}", e);
            }
        }

        match ui.refresh(display) {
            Ok(Refresh::Hold(delay)) => Timer::after(delay).await,
            Ok(_) => {}
            Err(e) => warn!("Display error: {:?}", e),
        }
    }
}

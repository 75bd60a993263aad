// SPDX-License-Identifier: GPL-3.0-or-later

use embassy_time::{Duration, Instant, Timer};
use embedded_graphics::prelude::Point;
use embedded_hal::{digital::InputPin, spi::SpiDevice};

use crate::calibration::SharedTransform;
use crate::consts::touch_screen::*;

// There's an application note that can be useful to follow for getting good
// results https://www.ti.com/lit/an/sbaa036/sbaa036.pdf

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdcChannel {
    X,
    Y,
    Pressure,
}

impl AdcChannel {
    // The panel is mounted in landscape, so the X and Y muxes are swapped.
    fn mux(self) -> u8 {
        match self {
            AdcChannel::X => 1,
            AdcChannel::Y => 5,
            AdcChannel::Pressure => 3,
        }
    }

    // 1            ccc           0               0             00
    // Start bit    Channel       Mode 12-bits    differential  Power down between conversions
    fn control_byte(self) -> u8 {
        0x80 | ((self.mux() & 0x07) << 4)
    }
}

/// Analog front-end of a resistive touch panel.
pub trait TouchAdc {
    /// State of the touch detection line.
    fn touch_present(&mut self) -> bool;
    /// 12 bit conversion of the given channel. Bus failures read as 0.
    fn read_channel(&mut self, channel: AdcChannel) -> u16;
}

/// XPT2046 / ADS7846 on a SPI bus. The chip select is handled by the
/// `SpiDevice`.
pub struct Ads7846<SPI, IRQ> {
    spi: SPI,
    touch_detected: IRQ,
}

impl<SPI: SpiDevice, IRQ: InputPin> Ads7846<SPI, IRQ> {
    pub fn new(spi: SPI, touch_detected: IRQ) -> Self {
        Self { spi, touch_detected }
    }

    /// Does one conversion to see if something answers on the bus.
    pub fn probe(&mut self) {
        match self.cmd_u12(AdcChannel::X.control_byte()) {
            Ok(v) => info!("Touch controller probe: x={}", v),
            Err(e) => error!("Touch controller probe failed: {:?}", e),
        }
    }

    fn cmd_u12(&mut self, cmd: u8) -> Result<u16, SPI::Error> {
        let mut rx = [0u8; 3];
        self.spi.transfer(&mut rx, &[cmd, 0, 0])?;
        Ok(decode_u12(&rx))
    }
}

// The conversion comes MSB first, right after the busy bit.
fn decode_u12(rx: &[u8; 3]) -> u16 {
    (((rx[1] & 0x7F) as u16) << 5) | (rx[2] >> 3) as u16
}

impl<SPI: SpiDevice, IRQ: InputPin> TouchAdc for Ads7846<SPI, IRQ> {
    fn touch_present(&mut self) -> bool {
        // PENIRQ is active low
        self.touch_detected.is_low().unwrap_or(false)
    }

    fn read_channel(&mut self, channel: AdcChannel) -> u16 {
        self.cmd_u12(channel.control_byte()).unwrap_or_else(|e| {
            warn!("Touch controller read failed on {:?}: {:?}", channel, e);
            0
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TouchEvent {
    #[default]
    None,
    Press,
    Move,
    Release,
}

impl TouchEvent {
    pub fn classify(was_touched: bool, touched: bool) -> Self {
        match (was_touched, touched) {
            (false, true) => TouchEvent::Press,
            (true, true) => TouchEvent::Move,
            (true, false) => TouchEvent::Release,
            (false, false) => TouchEvent::None,
        }
    }

    pub fn is_contact(self) -> bool {
        matches!(self, TouchEvent::Press | TouchEvent::Move)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchSample {
    /// ADC readings, as they come out of the controller.
    pub raw_x: u16,
    pub raw_y: u16,
    /// Display position, through the transform active at sampling time.
    pub x: i32,
    pub y: i32,
    pub pressure: u16,
    pub event: TouchEvent,
    pub timestamp: Instant,
}

impl TouchSample {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

pub struct TouchScreen<'a, D> {
    device: D,
    was_touched: bool,
    transform: &'a SharedTransform,
}

impl<'a, D: TouchAdc> TouchScreen<'a, D> {
    pub fn new(device: D, transform: &'a SharedTransform) -> Self {
        Self { device, was_touched: false, transform }
    }

    pub fn is_touched(&mut self) -> bool {
        self.device.touch_present()
    }

    /// Reads the panel and classifies the sample by its pressure against the
    /// previous one.
    pub fn read_sample(&mut self) -> TouchSample {
        self.sample(true)
    }

    // With `line_active` false, the sample is a release whatever the
    // pressure says.
    fn sample(&mut self, line_active: bool) -> TouchSample {
        let raw_x = self.device.read_channel(AdcChannel::X);
        let raw_y = self.device.read_channel(AdcChannel::Y);
        let pressure = self.device.read_channel(AdcChannel::Pressure);

        let touched = line_active && pressure > PRESS_THRESHOLD;
        let event = TouchEvent::classify(self.was_touched, touched);
        self.was_touched = touched;

        let position = self.transform.get().to_display(raw_x, raw_y);
        trace!("touch raw=({},{}) z={} pos=({},{}) {:?}",
            raw_x, raw_y, pressure, position.x, position.y, event);

        TouchSample {
            raw_x,
            raw_y,
            x: position.x,
            y: position.y,
            pressure,
            event,
            timestamp: Instant::now(),
        }
    }

    /// Waits for the next sample worth reporting: a press or a move while the
    /// panel is touched, and one release when it stops being touched.
    pub async fn next_sample(&mut self) -> TouchSample {
        loop {
            if self.is_touched() {
                // The line must stay active through the debounce delay.
                Timer::after(Duration::from_millis(DEBOUNCE_DELAY_MS)).await;
                if self.is_touched() {
                    let sample = self.read_sample();
                    if sample.event != TouchEvent::None {
                        return sample;
                    }
                }
            } else if self.was_touched {
                return self.sample(false);
            }

            Timer::after(Duration::from_millis(POLL_DELAY_MS)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationCoefficients, CoordinateTransform};
    use core::convert::Infallible;
    use embedded_hal::spi::{self, ErrorKind, ErrorType, Operation};
    use futures::executor::block_on;
    use std::vec::Vec;

    struct MockAdc {
        present: bool,
        x: u16,
        y: u16,
        pressure: u16,
    }

    impl MockAdc {
        fn touching(x: u16, y: u16, pressure: u16) -> Self {
            Self { present: true, x, y, pressure }
        }
    }

    impl TouchAdc for MockAdc {
        fn touch_present(&mut self) -> bool {
            self.present
        }

        fn read_channel(&mut self, channel: AdcChannel) -> u16 {
            match channel {
                AdcChannel::X => self.x,
                AdcChannel::Y => self.y,
                AdcChannel::Pressure => self.pressure,
            }
        }
    }

    // Answers every transfer with the same bytes, and records what was sent.
    struct MockSpi {
        reply: [u8; 3],
        sent: Vec<u8>,
    }

    impl ErrorType for MockSpi {
        type Error = Infallible;
    }

    impl SpiDevice for MockSpi {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
            for op in operations {
                if let Operation::Transfer(read, write) = op {
                    self.sent.extend_from_slice(&write[..]);
                    read.copy_from_slice(&self.reply[..read.len()]);
                }
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct BusError;

    impl spi::Error for BusError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    struct BrokenSpi;

    impl ErrorType for BrokenSpi {
        type Error = BusError;
    }

    impl SpiDevice for BrokenSpi {
        fn transaction(&mut self, _operations: &mut [Operation<'_, u8>]) -> Result<(), BusError> {
            Err(BusError)
        }
    }

    struct Pin(bool);

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = Infallible;
    }

    impl InputPin for Pin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0)
        }
    }

    #[test]
    fn control_bytes() {
        assert_eq!(AdcChannel::X.control_byte(), 0x90);
        assert_eq!(AdcChannel::Y.control_byte(), 0xD0);
        assert_eq!(AdcChannel::Pressure.control_byte(), 0xB0);
    }

    #[test]
    fn conversion_is_decoded_from_the_last_two_bytes() {
        assert_eq!(decode_u12(&[0xFF, 0x7F, 0xF8]), 4095);
        assert_eq!(decode_u12(&[0x00, 0x80, 0x07]), 0);
        assert_eq!(decode_u12(&[0x00, 0x40, 0x00]), 2048);
    }

    #[test]
    fn reads_channel_over_spi() {
        let spi = MockSpi { reply: [0x00, 0x40, 0x08], sent: Vec::new() };
        let mut adc = Ads7846::new(spi, Pin(true));
        assert_eq!(adc.read_channel(AdcChannel::Y), 2049);
        assert_eq!(adc.spi.sent, [0xD0, 0x00, 0x00]);
    }

    #[test]
    fn bus_errors_read_as_zero() {
        let mut adc = Ads7846::new(BrokenSpi, Pin(false));
        assert_eq!(adc.read_channel(AdcChannel::X), 0);
    }

    #[test]
    fn touch_line_is_active_low() {
        let spi = MockSpi { reply: [0; 3], sent: Vec::new() };
        assert!(Ads7846::new(spi, Pin(false)).touch_present());
        let spi = MockSpi { reply: [0; 3], sent: Vec::new() };
        assert!(!Ads7846::new(spi, Pin(true)).touch_present());
    }

    #[test]
    fn event_classification() {
        let shared = SharedTransform::new();
        let mut ts = TouchScreen::new(MockAdc::touching(2000, 2000, 50), &shared);
        assert_eq!(ts.read_sample().event, TouchEvent::None);

        ts.device.pressure = 500;
        assert_eq!(ts.read_sample().event, TouchEvent::Press);
        assert_eq!(ts.read_sample().event, TouchEvent::Move);

        ts.device.pressure = 100;
        assert_eq!(ts.read_sample().event, TouchEvent::Release);
        assert_eq!(ts.read_sample().event, TouchEvent::None);
    }

    #[test]
    fn uncalibrated_samples_are_inverted() {
        let shared = SharedTransform::new();
        let mut ts = TouchScreen::new(MockAdc::touching(4095, 4095, 500), &shared);
        let s = ts.read_sample();
        assert_eq!((s.raw_x, s.raw_y), (4095, 4095));
        assert_eq!(s.position(), Point::new(0, 0));

        ts.device.x = 0;
        ts.device.y = 0;
        assert_eq!(ts.read_sample().position(), Point::new(320, 240));
    }

    #[test]
    fn samples_follow_the_shared_transform() {
        let shared = SharedTransform::new();
        let mut ts = TouchScreen::new(MockAdc::touching(300, 300, 500), &shared);
        shared.set(CoordinateTransform::calibrated(CalibrationCoefficients {
            x_offset: -65.0,
            x_scale: 0.75,
            y_offset: -45.0,
            y_scale: 0.55,
        }));
        assert_eq!(ts.read_sample().position(), Point::new(160, 120));
    }

    #[test]
    fn next_sample_reports_press_then_release() {
        let shared = SharedTransform::new();
        let mut ts = TouchScreen::new(MockAdc::touching(1000, 1000, 500), &shared);

        let s = block_on(ts.next_sample());
        assert_eq!(s.event, TouchEvent::Press);
        assert_eq!(s.raw_x, 1000);

        let s = block_on(ts.next_sample());
        assert_eq!(s.event, TouchEvent::Move);

        // Line goes inactive while the pressure reading is still high.
        ts.device.present = false;
        let s = block_on(ts.next_sample());
        assert_eq!(s.event, TouchEvent::Release);
        assert!(!ts.was_touched);
    }
}

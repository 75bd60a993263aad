// SPDX-License-Identifier: GPL-3.0-or-later

use embassy_stm32::{
    Peripherals,
    gpio::{Input, Level, Output, Pull, Speed},
    mode::Blocking,
    spi::{self, Spi},
    time::Hertz,
};
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};

use tft_touch::consts::{display, touch_screen};
use tft_touch::drivers::{display::Display, touch_screen::Ads7846};

type SpiDevice = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, NoDelay>;

pub type TftDisplay = Display<SpiDevice, Output<'static>, Output<'static>>;
pub type TouchDevice = Ads7846<SpiDevice, Input<'static>>;

/// Black Pill wiring of an ILI9341 + XPT2046 module. The display and the
/// touch controller sit on separate SPI buses.
pub struct Machine {
    pub display: TftDisplay,
    pub backlight: Output<'static>,
    pub touch_screen: TouchDevice,
}

impl Machine {
    pub fn new(p: Peripherals) -> Self {
        //--------------------------
        //  TFT display
        //--------------------------

        let display = {
            let mut config = spi::Config::default();
            config.frequency = Hertz(display::SPI_FREQ_HZ);
            config.mode = spi::MODE_0;
            // The display doesn't talk back, but we keep MISO for the bus.
            let bus = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, config);
            let cs = Output::new(p.PA4, Level::High, Speed::VeryHigh);
            let dc = Output::new(p.PB0, Level::Low, Speed::VeryHigh);
            let reset = Output::new(p.PB1, Level::High, Speed::Low);
            let spi = ExclusiveDevice::new_no_delay(bus, cs).unwrap();
            Display::new(spi, dc, reset)
        };

        let backlight = Output::new(p.PA8, Level::Low, Speed::Low);

        //--------------------------
        //  Touch screen
        //--------------------------

        let touch_screen = {
            let mut config = spi::Config::default();
            config.frequency = Hertz(touch_screen::SPI_FREQ_HZ);
            config.mode = spi::MODE_3;
            let bus = Spi::new_blocking(p.SPI2, p.PB10, p.PB15, p.PB14, config);
            let cs = Output::new(p.PB13, Level::High, Speed::Medium);
            let touch_detected = Input::new(p.PB9, Pull::Up);
            let spi = ExclusiveDevice::new_no_delay(bus, cs).unwrap();
            let mut device = Ads7846::new(spi, touch_detected);
            device.probe();
            device
        };

        Self { display, backlight, touch_screen }
    }
}

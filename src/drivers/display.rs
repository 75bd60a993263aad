// SPDX-License-Identifier: GPL-3.0-or-later

use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};

use crate::consts::display::*;

// ILI9341 commands
const SOFT_RESET: u8 = 0x01;
const SLEEP_OUT: u8 = 0x11;
const GAMMA_SET: u8 = 0x26;
const DISPLAY_ON: u8 = 0x29;
const COLUMN_ADDR: u8 = 0x2A;
const PAGE_ADDR: u8 = 0x2B;
const MEMORY_WRITE: u8 = 0x2C;
const MEMORY_ACCESS_CONTROL: u8 = 0x36;
const PIXEL_FORMAT: u8 = 0x3A;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DisplayError {
    Spi,
    Pin,
}

pub type DisplayResult<T> = Result<T, DisplayError>;

/// ILI9341 TFT controller, 16 bits per pixel over a 4-wire SPI bus.
/// `dc` selects between the command (low) and data (high) registers.
pub struct Display<SPI, DC, RST> {
    spi: SPI,
    dc: DC,
    reset: RST,
}

impl<SPI: SpiDevice, DC: OutputPin, RST: OutputPin> Display<SPI, DC, RST> {
    pub fn new(spi: SPI, dc: DC, reset: RST) -> Self {
        Self { spi, dc, reset }
    }

    pub fn init(&mut self, delay: &mut impl DelayNs) -> DisplayResult<()> {
        self.reset.set_high().map_err(|_| DisplayError::Pin)?;
        delay.delay_ms(5);
        self.reset.set_low().map_err(|_| DisplayError::Pin)?;
        delay.delay_ms(10);
        self.reset.set_high().map_err(|_| DisplayError::Pin)?;
        delay.delay_ms(120);

        self.cmd(SOFT_RESET, &[])?;
        delay.delay_ms(100);

        // Power control A and B, driver timing control A and B, power on
        // sequence, pump ratio.
        self.cmd(0xCB, &[0x39, 0x2C, 0x00, 0x34, 0x02])?;
        self.cmd(0xCF, &[0x00, 0xC1, 0x30])?;
        self.cmd(0xE8, &[0x85, 0x00, 0x78])?;
        self.cmd(0xEA, &[0x00, 0x00])?;
        self.cmd(0xED, &[0x64, 0x03, 0x12, 0x81])?;
        self.cmd(0xF7, &[0x20])?;

        // Power control 1 and 2, VCOM control 1 and 2
        self.cmd(0xC0, &[0x23])?;
        self.cmd(0xC1, &[0x10])?;
        self.cmd(0xC5, &[0x3E, 0x28])?;
        self.cmd(0xC7, &[0x86])?;

        self.cmd(MEMORY_ACCESS_CONTROL, &[MADCTL_LANDSCAPE])?;
        // RGB565
        self.cmd(PIXEL_FORMAT, &[0x55])?;
        // Frame rate control, display function control
        self.cmd(0xB1, &[0x00, 0x18])?;
        self.cmd(0xB6, &[0x08, 0x82, 0x27])?;

        // Gamma settings
        self.cmd(0xF2, &[0x00])?;
        self.cmd(GAMMA_SET, &[0x01])?;
        self.cmd(0xE0, &[0x0F, 0x31, 0x2B, 0x0C, 0x0E, 0x08, 0x4E, 0xF1, 0x37, 0x07, 0x10, 0x03, 0x0E, 0x09, 0x00])?;
        self.cmd(0xE1, &[0x00, 0x0E, 0x14, 0x03, 0x11, 0x07, 0x31, 0xC1, 0x48, 0x08, 0x0F, 0x0C, 0x31, 0x36, 0x0F])?;

        self.cmd(SLEEP_OUT, &[])?;
        delay.delay_ms(120);
        self.cmd(DISPLAY_ON, &[])?;

        self.fill_screen(Rgb565::BLACK)?;
        info!("Display initialized");
        Ok(())
    }

    fn write_cmd(&mut self, cmd: u8) -> DisplayResult<()> {
        self.dc.set_low().map_err(|_| DisplayError::Pin)?;
        self.spi.write(&[cmd]).map_err(|_| DisplayError::Spi)
    }

    fn write_data(&mut self, data: &[u8]) -> DisplayResult<()> {
        self.dc.set_high().map_err(|_| DisplayError::Pin)?;
        self.spi.write(data).map_err(|_| DisplayError::Spi)
    }

    pub fn cmd(&mut self, cmd: u8, args: &[u8]) -> DisplayResult<()> {
        self.write_cmd(cmd)?;
        if !args.is_empty() {
            self.write_data(args)?;
        }
        Ok(())
    }

    /// Selects the inclusive rectangle that the next pixels will fill, row by row.
    pub fn set_address_window(&mut self, top_left: (u16, u16), bottom_right: (u16, u16)) -> DisplayResult<()> {
        let (left, top) = top_left;
        let (right, bottom) = bottom_right;

        let [l0, l1] = left.to_be_bytes();
        let [r0, r1] = right.to_be_bytes();
        self.cmd(COLUMN_ADDR, &[l0, l1, r0, r1])?;

        let [t0, t1] = top.to_be_bytes();
        let [b0, b1] = bottom.to_be_bytes();
        self.cmd(PAGE_ADDR, &[t0, t1, b0, b1])?;

        self.write_cmd(MEMORY_WRITE)
    }

    // Streams pixels in chunks to keep the stack small.
    fn write_pixels(&mut self, colors: impl IntoIterator<Item = Rgb565>) -> DisplayResult<()> {
        let mut buf = [0u8; 2 * PIXEL_CHUNK_LEN];
        let mut len = 0;

        self.dc.set_high().map_err(|_| DisplayError::Pin)?;
        for color in colors {
            let [hi, lo] = RawU16::from(color).into_inner().to_be_bytes();
            buf[len] = hi;
            buf[len + 1] = lo;
            len += 2;
            if len == buf.len() {
                self.spi.write(&buf).map_err(|_| DisplayError::Spi)?;
                len = 0;
            }
        }
        if len > 0 {
            self.spi.write(&buf[..len]).map_err(|_| DisplayError::Spi)?;
        }
        Ok(())
    }

    pub fn draw_pixel(&mut self, x: u16, y: u16, color: Rgb565) -> DisplayResult<()> {
        if x >= WIDTH || y >= HEIGHT {
            return Ok(());
        }
        self.set_address_window((x, y), (x, y))?;
        self.write_pixels(core::iter::once(color))
    }

    /// Fills a rectangle, clipped to the screen.
    pub fn fill_rectangle(&mut self, area: &Rectangle, color: Rgb565) -> DisplayResult<()> {
        let area = area.intersection(&self.bounding_box());
        let bottom_right = match area.bottom_right() {
            Some(p) => p,
            None => return Ok(()),
        };

        let top_left = area.top_left;
        self.set_address_window((top_left.x as u16, top_left.y as u16),
                                (bottom_right.x as u16, bottom_right.y as u16))?;
        let count = area.size.width * area.size.height;
        self.write_pixels((0..count).map(|_| color))
    }

    pub fn fill_screen(&mut self, color: Rgb565) -> DisplayResult<()> {
        let screen = self.bounding_box();
        self.fill_rectangle(&screen, color)
    }
}

// Embedded Graphics integration

use embedded_graphics::{
    prelude::*,
    pixelcolor::{Rgb565, raw::RawU16},
    primitives::Rectangle,
};

impl<SPI: SpiDevice, DC: OutputPin, RST: OutputPin> DrawTarget for Display<SPI, DC, RST> {
    type Color = Rgb565;
    type Error = DisplayError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels.into_iter() {
            if let (Ok(x), Ok(y)) = (u16::try_from(coord.x), u16::try_from(coord.y)) {
                self.draw_pixel(x, y, color)?;
            }
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // Clamp area to drawable part of the display target
        let drawable_area = area.intersection(&self.bounding_box());
        let end = match drawable_area.bottom_right() {
            Some(p) => p,
            None => return Ok(()),
        };

        let start = drawable_area.top_left;
        self.set_address_window((start.x as u16, start.y as u16), (end.x as u16, end.y as u16))?;

        let pixels = area.points()
            .zip(colors)
            .filter(|(pos, _color)| drawable_area.contains(*pos))
            .map(|(_, color)| color);
        self.write_pixels(pixels)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.fill_rectangle(area, color)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill_screen(color)
    }
}

impl<SPI, DC, RST> OriginDimensions for Display<SPI, DC, RST> {
    fn size(&self) -> Size {
        Size::new(WIDTH.into(), HEIGHT.into())
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later

mod calibration_screen;
pub use calibration_screen::*;

mod idle_screen;
pub use idle_screen::*;

mod main_loop;
pub use main_loop::*;

use embedded_graphics::{
    mono_font::{ascii::{FONT_10X20, FONT_6X10}, MonoFont, MonoTextStyleBuilder},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::Rectangle,
    text::{Baseline, Text},
};

pub const LARGE_FONT: &MonoFont<'static> = &FONT_10X20;
pub const SMALL_FONT: &MonoFont<'static> = &FONT_6X10;

pub fn fill_rectangle<D>(display: &mut D, x: i32, y: i32, w: u32, h: u32, color: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    display.fill_solid(&Rectangle::new(Point::new(x, y), Size::new(w, h)), color)
}

/// Draws text with its top-left corner at (x,y). Characters are drawn on
/// an opaque `bg` box.
pub fn draw_text<D>(display: &mut D, x: i32, y: i32, text: &str, fg: Rgb565, bg: Rgb565, font: &MonoFont) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let style = MonoTextStyleBuilder::new()
        .font(font)
        .text_color(fg)
        .background_color(bg)
        .build();
    Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(display)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_display {
    use super::*;
    use std::vec::Vec;

    #[derive(Debug, PartialEq, Eq)]
    pub struct BusFault;

    /// Keeps the last color written to each pixel, and counts the pixels
    /// that were outside of the screen. Every draw fails while `failing` is
    /// set.
    pub struct FrameBuffer {
        pub pixels: Vec<Rgb565>,
        pub writes: usize,
        pub clipped: usize,
        pub failing: bool,
    }

    impl FrameBuffer {
        pub const WIDTH: u32 = 320;
        pub const HEIGHT: u32 = 240;

        pub fn new() -> Self {
            Self {
                pixels: vec![Rgb565::BLACK; (Self::WIDTH * Self::HEIGHT) as usize],
                writes: 0,
                clipped: 0,
                failing: false,
            }
        }

        pub fn pixel(&self, x: i32, y: i32) -> Rgb565 {
            self.pixels[(y as u32 * Self::WIDTH + x as u32) as usize]
        }

        /// Resets the write counter and returns its previous value.
        pub fn take_writes(&mut self) -> usize {
            core::mem::take(&mut self.writes)
        }

        pub fn count(&self, color: Rgb565) -> usize {
            self.pixels.iter().filter(|&&c| c == color).count()
        }
    }

    impl DrawTarget for FrameBuffer {
        type Color = Rgb565;
        type Error = BusFault;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            if self.failing {
                return Err(BusFault);
            }
            for Pixel(p, color) in pixels {
                self.writes += 1;
                if self.bounding_box().contains(p) {
                    let index = (p.y as u32 * Self::WIDTH + p.x as u32) as usize;
                    self.pixels[index] = color;
                } else {
                    self.clipped += 1;
                }
            }
            Ok(())
        }
    }

    impl OriginDimensions for FrameBuffer {
        fn size(&self) -> Size {
            Size::new(Self::WIDTH, Self::HEIGHT)
        }
    }
}

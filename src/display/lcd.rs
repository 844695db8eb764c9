//! ST7735 driver for the Enviro+ 0.96" LCD, only compiled with `hardware`.

use std::convert::Infallible;

use embedded_graphics::mono_font::ascii::FONT_6X12;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use linux_embedded_hal::Delay;
use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use st7735_lcd::{Orientation, ST7735};

use super::{Rgb, StatusPanel, StatusScreen};
use crate::prelude::*;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 80;
const SPI_CLOCK_HZ: u32 = 10_000_000;
const DC_PIN: u8 = 9;
const BACKLIGHT_PIN: u8 = 12;

/// The panel has no reset line wired up.
struct NoReset;

impl embedded_hal::digital::v2::OutputPin for NoReset {
    type Error = Infallible;

    fn set_low(&mut self) -> std::result::Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> std::result::Result<(), Infallible> {
        Ok(())
    }
}

pub struct Lcd {
    display: ST7735<Spi, OutputPin, NoReset>,
    _backlight: OutputPin,
}

impl Lcd {
    pub fn open() -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut backlight = gpio.get(BACKLIGHT_PIN)?.into_output();
        backlight.set_high();
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss1, SPI_CLOCK_HZ, Mode::Mode0)?;
        let dc = gpio.get(DC_PIN)?.into_output();
        let mut display = ST7735::new(spi, dc, NoReset, true, false, WIDTH, HEIGHT);
        display
            .init(&mut Delay)
            .map_err(|_| anyhow!("failed to initialise the ST7735"))?;
        display
            .set_orientation(&Orientation::LandscapeSwapped)
            .map_err(|_| anyhow!("failed to set the ST7735 orientation"))?;
        display.set_offset(0, 24);
        Ok(Self {
            display,
            _backlight: backlight,
        })
    }
}

fn colour(rgb: Rgb) -> Rgb565 {
    Rgb565::new(rgb.0 >> 3, rgb.1 >> 2, rgb.2 >> 3)
}

impl StatusScreen for Lcd {
    fn show(&mut self, panel: &StatusPanel) -> Result {
        self.display
            .clear(colour(panel.background))
            .map_err(|_| anyhow!("failed to clear the LCD"))?;
        let style = MonoTextStyle::new(&FONT_6X12, colour(panel.text));
        for (index, line) in panel.lines.iter().enumerate() {
            Text::new(line, Point::new(4, 20 + 18 * index as i32), style)
                .draw(&mut self.display)
                .map_err(|_| anyhow!("failed to draw onto the LCD"))?;
        }
        Ok(())
    }
}

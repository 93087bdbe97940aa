//! SSD1306 panel over Linux I2C (0.91" 128x32 and 0.96" 128x64 modules)

use super::backend::DisplayBackend;
use crate::types::{Frame, Geometry};
use crate::{HopeTurtleError, Result};
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use linux_embedded_hal::I2cdev;
use log::info;
use ssd1306::{
    mode::BufferedGraphicsMode,
    prelude::*,
    size::{DisplaySize128x32, DisplaySize128x64},
    I2CDisplayInterface, Ssd1306,
};
use std::path::Path;

type Panel<SIZE> = Ssd1306<I2CInterface<I2cdev>, SIZE, BufferedGraphicsMode<SIZE>>;

pub struct OledBackend<SIZE: DisplaySize> {
    panel: Panel<SIZE>,
    geometry: Geometry,
}

/// Open the panel at the usual 0x3C address; `height` selects the module size
pub fn open_oled(bus: &Path, height: u32) -> Result<Box<dyn DisplayBackend>> {
    info!("Initializing OLED on {} ({}px tall)", bus.display(), height);
    let i2c = I2cdev::new(bus).map_err(|e| HopeTurtleError::Display(e.to_string()))?;
    let interface = I2CDisplayInterface::new(i2c);

    if height <= 32 {
        let panel = Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Ok(Box::new(OledBackend::init(panel, Geometry::OLED_128X32)?))
    } else {
        let panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Ok(Box::new(OledBackend::init(panel, Geometry::OLED_128X64)?))
    }
}

impl<SIZE: DisplaySize> OledBackend<SIZE> {
    fn init(mut panel: Panel<SIZE>, geometry: Geometry) -> Result<Self> {
        panel
            .init()
            .map_err(|e| HopeTurtleError::Display(format!("init failed: {:?}", e)))?;
        panel.clear_buffer();
        panel
            .flush()
            .map_err(|e| HopeTurtleError::Display(format!("flush failed: {:?}", e)))?;
        Ok(Self { panel, geometry })
    }
}

impl<SIZE: DisplaySize + Send> DisplayBackend for OledBackend<SIZE> {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn draw(&mut self, frame: &Frame) -> Result<()> {
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        self.panel.clear_buffer();
        for line in &frame.lines {
            Text::with_baseline(&line.text, Point::new(line.x, line.y), style, Baseline::Top)
                .draw(&mut self.panel)
                .map_err(|e| HopeTurtleError::Display(format!("draw failed: {:?}", e)))?;
        }
        self.panel
            .flush()
            .map_err(|e| HopeTurtleError::Display(format!("flush failed: {:?}", e)))
    }

    fn clear(&mut self) -> Result<()> {
        self.panel.clear_buffer();
        self.panel
            .flush()
            .map_err(|e| HopeTurtleError::Display(format!("flush failed: {:?}", e)))
    }

    fn name(&self) -> &'static str {
        "ssd1306"
    }
}

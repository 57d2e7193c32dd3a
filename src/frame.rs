/// Binary animation descriptor sent to the tree.
use crate::config::Config;
use crate::constants::{
    COLORS_OFFSET, COLORS_SIZE, COLOR_WIDTH, FRAME_SIZE, MAX_COLORS, MAX_STEPS, STEPS_OFFSET, STEPS_SIZE,
};
use crate::error::{Error, Result};

/// A fully encoded descriptor. Always `FRAME_SIZE` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame([u8; FRAME_SIZE]);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Reads the u16 header field at `idx` (0 = active .. 7 = led_interval).
    fn field(&self, idx: usize) -> u16 {
        u16::from_le_bytes([self.0[idx * 2], self.0[idx * 2 + 1]])
    }

    pub fn active(&self) -> u16 {
        self.field(0)
    }

    pub fn led_count(&self) -> u16 {
        self.field(1)
    }

    pub fn color_count(&self) -> u16 {
        self.field(2)
    }

    pub fn step_count(&self) -> u16 {
        self.field(3)
    }

    /// The whole color block, padding included.
    pub fn colors(&self) -> &[u8] {
        &self.0[COLORS_OFFSET..COLORS_OFFSET + COLORS_SIZE]
    }

    /// The whole step block, padding included.
    pub fn steps(&self) -> &[u8] {
        &self.0[STEPS_OFFSET..STEPS_OFFSET + STEPS_SIZE]
    }
}

/// Encodes a config into a frame.
///
/// Layout: eight little-endian u16 fields (active, led_count, color_count,
/// step_count, step_shift, color_shift, step_delay, led_interval), then 32
/// color triplets in green/red/blue order, then 64 step bytes. Unused color
/// and step slots are zero.
pub fn encode(config: &Config) -> Result<Frame> {
    if config.colors.len() > MAX_COLORS {
        return Err(Error::OversizedConfig {
            field: "colors",
            len: config.colors.len(),
            max: MAX_COLORS,
        });
    }

    if config.steps.len() > MAX_STEPS {
        return Err(Error::OversizedConfig {
            field: "steps",
            len: config.steps.len(),
            max: MAX_STEPS,
        });
    }

    let header = [
        config.active,
        config.led_count,
        config.colors.len() as u16,
        config.steps.len() as u16,
        config.step_shift,
        config.color_shift,
        config.step_delay,
        config.led_interval,
    ];

    let mut buf = [0u8; FRAME_SIZE];

    for (i, value) in header.iter().enumerate() {
        buf[i * 2..i * 2 + 2].copy_from_slice(&value.to_le_bytes());
    }

    for (i, color) in config.colors.iter().enumerate() {
        let offset = COLORS_OFFSET + i * COLOR_WIDTH;
        buf[offset..offset + COLOR_WIDTH].copy_from_slice(&color.to_wire());
    }

    buf[STEPS_OFFSET..STEPS_OFFSET + config.steps.len()].copy_from_slice(&config.steps);

    Ok(Frame(buf))
}

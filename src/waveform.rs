//! Periodic output tables for the 12 bit DAC of the bench path.

use core::f32::consts::PI;
use serde::{Deserialize, Serialize};

/// Largest DAC code.
pub const DAC_MAX: u16 = 4095;

/// Mid-scale code, the zero line of the sine.
pub const DAC_OFFSET: u16 = 2048;

/// Sine amplitude in codes.
pub const DAC_AMPLITUDE: f32 = 2047.;

/// DAC reference voltage [V].
pub const DAC_VREF: f32 = 3.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
#[repr(u8)]
pub enum Mode {
    Sine = 0,
    Square = 1,
    Triangle = 2,
}

impl Mode {
    pub fn from_u8(v: u8) -> Option<Mode> {
        use Mode::*;

        match v {
            0 => Some(Sine),
            1 => Some(Square),
            2 => Some(Triangle),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        use Mode::*;

        match self {
            Sine => "sine",
            Square => "square",
            Triangle => "triangle",
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Sine
    }
}

/// Fill `buf` with `cycles` periods of `mode`. The table only depends on the arguments, with
/// zero cycles every mode gives a flat mid-scale table.
pub fn regenerate(mode: Mode, cycles: u32, buf: &mut [u16]) {
    let len = buf.len();

    if cycles == 0 {
        buf.fill(DAC_OFFSET);
        return;
    }

    for (i, b) in buf.iter_mut().enumerate() {
        *b = match mode {
            Mode::Sine => sine(i, cycles, len),
            Mode::Square => square(i, cycles, len),
            Mode::Triangle => triangle(i, cycles, len),
        };
    }
}

/// Position of sample `i` within its period, scaled so that a period is `len` long.
fn phase(i: usize, cycles: u32, len: usize) -> u64 {
    (i as u64 * cycles as u64) % len as u64
}

fn sine(i: usize, cycles: u32, len: usize) -> u16 {
    let x = 2. * PI * cycles as f32 * i as f32 / len as f32;
    let v = DAC_OFFSET as f32 + DAC_AMPLITUDE * libm::sinf(x);

    libm::roundf(v).clamp(0., DAC_MAX as f32) as u16
}

fn square(i: usize, cycles: u32, len: usize) -> u16 {
    if 2 * phase(i, cycles, len) < len as u64 {
        DAC_MAX
    } else {
        0
    }
}

fn triangle(i: usize, cycles: u32, len: usize) -> u16 {
    let p = phase(i, cycles, len);
    let len = len as u64;

    let v = if 2 * p < len {
        2 * p * DAC_MAX as u64 / len
    } else {
        2 * (len - p) * DAC_MAX as u64 / len
    };

    v.min(DAC_MAX as u64) as u16
}

/// Convert a span of DAC/ADC codes to volts.
pub fn code_to_volts(code: u16) -> f32 {
    code as f32 * DAC_VREF / DAC_MAX as f32
}

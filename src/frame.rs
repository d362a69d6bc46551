//! Decoding of the 9 byte data frame clocked out of the front-end for every conversion.
//!
//! ```text
//!   byte: 0   1   2 | 3   4   5 | 6   7   8
//!         status    | channel 1 | channel 2
//! ```
//!
//! Status is `1100` + `LOFF_STAT[4:0]` + `GPIO[1:0]` followed by 13 zero bits. The channels are
//! 24 bit big-endian two's-complement codes.

use serde::{Deserialize, Serialize};

pub const FRAME_SZ: usize = 9;

/// Reference voltage [V] used to convert a truncated sample to volts.
pub const VREF: f32 = 2.42;

/// Full-scale code of the truncated 16 bit sample.
pub const FULL_SCALE: f32 = 32767.0;

const STATUS_PREAMBLE: u8 = 0b1100;

/// One raw transfer as read from the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct RawFrame(pub [u8; FRAME_SZ]);

/// Two channel samples truncated to 16 bits, and the voltage of channel 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, defmt::Format)]
pub struct DecodedSample {
    pub ch1: i16,
    pub ch2: i16,
    pub voltage: f32,
}

/// The status word leading every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct Status(pub u32);

impl Status {
    /// The status word must start with `1100`.
    pub fn is_valid(&self) -> bool {
        (self.0 >> 20) as u8 == STATUS_PREAMBLE
    }

    /// `LOFF_STAT[4:0]`: RLD, IN2N, IN2P, IN1N, IN1P.
    pub fn lead_off(&self) -> u8 {
        ((self.0 >> 15) & 0x1f) as u8
    }

    pub fn rld_off(&self) -> bool {
        self.lead_off() & 0x10 != 0
    }

    /// Any electrode of channel 1 is disconnected.
    pub fn ch1_lead_off(&self) -> bool {
        self.lead_off() & 0b0011 != 0
    }

    /// Any electrode of channel 2 is disconnected.
    pub fn ch2_lead_off(&self) -> bool {
        self.lead_off() & 0b1100 != 0
    }

    pub fn gpio(&self) -> u8 {
        ((self.0 >> 13) & 0b11) as u8
    }
}

impl RawFrame {
    pub fn status(&self) -> Status {
        Status(be24(&self.0[0..3]) as u32)
    }

    /// Sign-extended 24 bit code of channel `ch` (0 or 1).
    pub fn code(&self, ch: usize) -> i32 {
        let off = 3 + 3 * ch;
        let v = be24(&self.0[off..off + 3]);
        (v << 8) >> 8
    }

    /// Decode the channel samples. Any 9 bytes are accepted, the status word is not consulted.
    pub fn decode(&self) -> DecodedSample {
        let ch1 = truncate(be24(&self.0[3..6]));
        let ch2 = truncate(be24(&self.0[6..9]));

        DecodedSample {
            ch1,
            ch2,
            voltage: voltage(ch1),
        }
    }
}

impl From<[u8; FRAME_SZ]> for RawFrame {
    fn from(b: [u8; FRAME_SZ]) -> RawFrame {
        RawFrame(b)
    }
}

/// Concatenate three bytes big-endian into the low 24 bits.
fn be24(b: &[u8]) -> i32 {
    (b[0] as i32) << 16 | (b[1] as i32) << 8 | b[2] as i32
}

/// Drop the least significant byte of the 24 bit code and keep the remaining 16 bits as a
/// signed sample.
fn truncate(code: i32) -> i16 {
    ((code >> 8) & 0xffff) as u16 as i16
}

pub fn voltage(sample: i16) -> f32 {
    sample as f32 * VREF / FULL_SCALE
}

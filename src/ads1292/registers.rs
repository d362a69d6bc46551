//! Register map and typed register fields of the ADS1292(R).
//!
//! Every configuration register has a struct with named fields that packs to and from the
//! register byte. Bits that the datasheet requires to be set are always written as 1.

use serde::{Deserialize, Serialize};

pub const NREG: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum Register {
    Id = 0,
    Config1 = 1,
    Config2 = 2,
    Loff = 3,
    Ch1Set = 4,
    Ch2Set = 5,
    RldSens = 6,
    LoffSens = 7,
    LoffStat = 8,
    Resp1 = 9,
    Resp2 = 10,
    Gpio = 11,
}

impl Register {
    pub const fn addr(self) -> u8 {
        self as u8
    }

    /// Registers the chip may report differently from what was written.
    pub const fn is_volatile(self) -> bool {
        matches!(self, Register::Id | Register::LoffStat | Register::Gpio)
    }

    pub fn from_addr(a: u8) -> Option<Register> {
        use Register::*;

        Some(match a {
            0 => Id,
            1 => Config1,
            2 => Config2,
            3 => Loff,
            4 => Ch1Set,
            5 => Ch2Set,
            6 => RldSens,
            7 => LoffSens,
            8 => LoffStat,
            9 => Resp1,
            10 => Resp2,
            11 => Gpio,
            _ => return None,
        })
    }
}

/// Identity codes reported in the ID register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum DeviceId {
    Ads1292 = 0x53,
    Ads1292R = 0x73,
}

impl DeviceId {
    pub fn from_byte(b: u8) -> Option<DeviceId> {
        match b {
            0x53 => Some(DeviceId::Ads1292),
            0x73 => Some(DeviceId::Ads1292R),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub enum DataRate {
    Sps125 = 0,
    Sps250 = 1,
    Sps500 = 2,
    Sps1k = 3,
    Sps2k = 4,
    Sps4k = 5,
    Sps8k = 6,
}

impl DataRate {
    pub const fn hz(&self) -> f32 {
        use DataRate::*;

        match self {
            Sps125 => 125.,
            Sps250 => 250.,
            Sps500 => 500.,
            Sps1k => 1000.,
            Sps2k => 2000.,
            Sps4k => 4000.,
            Sps8k => 8000.,
        }
    }

    fn from_bits(b: u8) -> DataRate {
        use DataRate::*;

        match b & 0b111 {
            0 => Sps125,
            1 => Sps250,
            2 => Sps500,
            3 => Sps1k,
            4 => Sps2k,
            5 => Sps4k,
            _ => Sps8k,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub enum Gain {
    X6 = 0,
    X1 = 1,
    X2 = 2,
    X3 = 3,
    X4 = 4,
    X8 = 5,
    X12 = 6,
}

impl Gain {
    pub const fn factor(&self) -> u8 {
        use Gain::*;

        match self {
            X6 => 6,
            X1 => 1,
            X2 => 2,
            X3 => 3,
            X4 => 4,
            X8 => 8,
            X12 => 12,
        }
    }

    fn from_bits(b: u8) -> Gain {
        use Gain::*;

        match b & 0b111 {
            1 => X1,
            2 => X2,
            3 => X3,
            4 => X4,
            5 => X8,
            6 => X12,
            _ => X6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub enum Mux {
    Normal = 0,
    Shorted = 1,
    RldMeasure = 2,
    Mvdd = 3,
    Temperature = 4,
    TestSignal = 5,
    RldDrp = 6,
    RldDrm = 7,
    RldDrpm = 8,
    RspIn3p = 9,
}

impl Mux {
    fn from_bits(b: u8) -> Mux {
        use Mux::*;

        match b & 0x0f {
            1 => Shorted,
            2 => RldMeasure,
            3 => Mvdd,
            4 => Temperature,
            5 => TestSignal,
            6 => RldDrp,
            7 => RldDrm,
            8 => RldDrpm,
            9 => RspIn3p,
            _ => Normal,
        }
    }
}

fn bit(b: u8, n: u8) -> bool {
    b & (1 << n) != 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct Config1 {
    pub single_shot: bool,
    pub data_rate: DataRate,
}

impl Config1 {
    pub const fn to_byte(&self) -> u8 {
        (self.single_shot as u8) << 7 | self.data_rate as u8
    }

    pub fn from_byte(b: u8) -> Config1 {
        Config1 {
            single_shot: bit(b, 7),
            data_rate: DataRate::from_bits(b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct Config2 {
    pub lead_off_comparators: bool,
    pub reference_buffer: bool,
    /// 4.033 V reference instead of 2.42 V.
    pub vref_4v: bool,
    pub clock_output: bool,
    pub internal_test: bool,
    /// Test signal at 1 Hz instead of DC.
    pub test_freq_1hz: bool,
}

impl Config2 {
    pub const fn to_byte(&self) -> u8 {
        0x80 | (self.lead_off_comparators as u8) << 6
            | (self.reference_buffer as u8) << 5
            | (self.vref_4v as u8) << 4
            | (self.clock_output as u8) << 3
            | (self.internal_test as u8) << 1
            | self.test_freq_1hz as u8
    }

    pub fn from_byte(b: u8) -> Config2 {
        Config2 {
            lead_off_comparators: bit(b, 6),
            reference_buffer: bit(b, 5),
            vref_4v: bit(b, 4),
            clock_output: bit(b, 3),
            internal_test: bit(b, 1),
            test_freq_1hz: bit(b, 0),
        }
    }

    pub const fn vref(&self) -> f32 {
        if self.vref_4v {
            4.033
        } else {
            2.42
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct Loff {
    /// Lead-off comparator threshold, 3 bits.
    pub comparator_threshold: u8,
    /// Lead-off current magnitude, 2 bits.
    pub current: u8,
    /// AC lead-off detection instead of DC.
    pub ac: bool,
}

impl Loff {
    pub const fn to_byte(&self) -> u8 {
        (self.comparator_threshold & 0b111) << 5 | 0x10 | (self.current & 0b11) << 2 | self.ac as u8
    }

    pub fn from_byte(b: u8) -> Loff {
        Loff {
            comparator_threshold: b >> 5,
            current: (b >> 2) & 0b11,
            ac: bit(b, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct ChannelSet {
    pub power_down: bool,
    pub gain: Gain,
    pub mux: Mux,
}

impl ChannelSet {
    pub const fn to_byte(&self) -> u8 {
        (self.power_down as u8) << 7 | (self.gain as u8) << 4 | self.mux as u8
    }

    pub fn from_byte(b: u8) -> ChannelSet {
        ChannelSet {
            power_down: bit(b, 7),
            gain: Gain::from_bits(b >> 4),
            mux: Mux::from_bits(b),
        }
    }
}

/// Routing of the electrodes to the right-leg drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct RldSens {
    /// Chop frequency, 2 bits.
    pub chop: u8,
    pub rld_buffer: bool,
    pub rld_lead_off_sense: bool,
    pub ch2n: bool,
    pub ch2p: bool,
    pub ch1n: bool,
    pub ch1p: bool,
}

impl RldSens {
    pub const fn to_byte(&self) -> u8 {
        (self.chop & 0b11) << 6
            | (self.rld_buffer as u8) << 5
            | (self.rld_lead_off_sense as u8) << 4
            | (self.ch2n as u8) << 3
            | (self.ch2p as u8) << 2
            | (self.ch1n as u8) << 1
            | self.ch1p as u8
    }

    pub fn from_byte(b: u8) -> RldSens {
        RldSens {
            chop: b >> 6,
            rld_buffer: bit(b, 5),
            rld_lead_off_sense: bit(b, 4),
            ch2n: bit(b, 3),
            ch2p: bit(b, 2),
            ch1n: bit(b, 1),
            ch1p: bit(b, 0),
        }
    }
}

/// Lead-off detection per electrode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct LoffSens {
    pub flip2: bool,
    pub flip1: bool,
    pub ch2n: bool,
    pub ch2p: bool,
    pub ch1n: bool,
    pub ch1p: bool,
}

impl LoffSens {
    pub const fn to_byte(&self) -> u8 {
        (self.flip2 as u8) << 5
            | (self.flip1 as u8) << 4
            | (self.ch2n as u8) << 3
            | (self.ch2p as u8) << 2
            | (self.ch1n as u8) << 1
            | self.ch1p as u8
    }

    pub fn from_byte(b: u8) -> LoffSens {
        LoffSens {
            flip2: bit(b, 5),
            flip1: bit(b, 4),
            ch2n: bit(b, 3),
            ch2p: bit(b, 2),
            ch1n: bit(b, 1),
            ch1p: bit(b, 0),
        }
    }
}

/// Respiration demodulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct Resp1 {
    pub demodulation: bool,
    pub modulation: bool,
    /// Demodulation phase, 4 bits.
    pub phase: u8,
    pub external_clock: bool,
}

impl Resp1 {
    pub const fn to_byte(&self) -> u8 {
        (self.demodulation as u8) << 7
            | (self.modulation as u8) << 6
            | (self.phase & 0x0f) << 2
            | 0x02
            | self.external_clock as u8
    }

    pub fn from_byte(b: u8) -> Resp1 {
        Resp1 {
            demodulation: bit(b, 7),
            modulation: bit(b, 6),
            phase: (b >> 2) & 0x0f,
            external_clock: bit(b, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct Resp2 {
    pub calibration: bool,
    /// 64 kHz modulation instead of 32 kHz.
    pub freq_64k: bool,
    /// Right-leg reference generated internally.
    pub rldref_internal: bool,
}

impl Resp2 {
    pub const fn to_byte(&self) -> u8 {
        (self.calibration as u8) << 7
            | (self.freq_64k as u8) << 2
            | (self.rldref_internal as u8) << 1
            | 0x01
    }

    pub fn from_byte(b: u8) -> Resp2 {
        Resp2 {
            calibration: bit(b, 7),
            freq_64k: bit(b, 2),
            rldref_internal: bit(b, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct Gpio {
    /// Direction (1 = input) of GPIO2 and GPIO1.
    pub control: u8,
    pub data: u8,
}

impl Gpio {
    pub const fn to_byte(&self) -> u8 {
        (self.control & 0b11) << 2 | self.data & 0b11
    }

    pub fn from_byte(b: u8) -> Gpio {
        Gpio {
            control: (b >> 2) & 0b11,
            data: b & 0b11,
        }
    }
}

/// Local mirror of the chip registers, indexed by register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct RegisterMap(pub [u8; NREG]);

/// Typed view of the configuration registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct Configuration {
    pub config1: Config1,
    pub config2: Config2,
    pub loff: Loff,
    pub ch1: ChannelSet,
    pub ch2: ChannelSet,
    pub rld_sens: RldSens,
    pub loff_sens: LoffSens,
    pub resp1: Resp1,
    pub resp2: Resp2,
    pub gpio: Gpio,
}

impl Default for Configuration {
    /// ECG acquisition at 500 SPS, internal 2.42 V reference, gain 6 on both channels with
    /// channel 2 driving the right leg.
    fn default() -> Self {
        Configuration {
            config1: Config1 {
                single_shot: false,
                data_rate: DataRate::Sps500,
            },
            config2: Config2 {
                lead_off_comparators: false,
                reference_buffer: true,
                vref_4v: false,
                clock_output: false,
                internal_test: false,
                test_freq_1hz: false,
            },
            loff: Loff {
                comparator_threshold: 0,
                current: 0,
                ac: false,
            },
            ch1: ChannelSet {
                power_down: false,
                gain: Gain::X6,
                mux: Mux::Normal,
            },
            ch2: ChannelSet {
                power_down: false,
                gain: Gain::X6,
                mux: Mux::Normal,
            },
            rld_sens: RldSens {
                chop: 0,
                rld_buffer: true,
                rld_lead_off_sense: false,
                ch2n: true,
                ch2p: true,
                ch1n: false,
                ch1p: false,
            },
            loff_sens: LoffSens {
                flip2: false,
                flip1: false,
                ch2n: false,
                ch2p: false,
                ch1n: false,
                ch1p: false,
            },
            resp1: Resp1 {
                demodulation: false,
                modulation: false,
                phase: 0,
                external_clock: false,
            },
            resp2: Resp2 {
                calibration: false,
                freq_64k: false,
                rldref_internal: true,
            },
            gpio: Gpio {
                control: 0b11,
                data: 0,
            },
        }
    }
}

impl Configuration {
    pub fn to_map(&self) -> RegisterMap {
        RegisterMap([
            DeviceId::Ads1292R as u8,
            self.config1.to_byte(),
            self.config2.to_byte(),
            self.loff.to_byte(),
            self.ch1.to_byte(),
            self.ch2.to_byte(),
            self.rld_sens.to_byte(),
            self.loff_sens.to_byte(),
            0x00,
            self.resp1.to_byte(),
            self.resp2.to_byte(),
            self.gpio.to_byte(),
        ])
    }
}

impl RegisterMap {
    pub fn get(&self, r: Register) -> u8 {
        self.0[r.addr() as usize]
    }

    pub fn set(&mut self, r: Register, v: u8) {
        self.0[r.addr() as usize] = v;
    }

    pub fn configuration(&self) -> Configuration {
        use Register as R;

        Configuration {
            config1: Config1::from_byte(self.get(R::Config1)),
            config2: Config2::from_byte(self.get(R::Config2)),
            loff: Loff::from_byte(self.get(R::Loff)),
            ch1: ChannelSet::from_byte(self.get(R::Ch1Set)),
            ch2: ChannelSet::from_byte(self.get(R::Ch2Set)),
            rld_sens: RldSens::from_byte(self.get(R::RldSens)),
            loff_sens: LoffSens::from_byte(self.get(R::LoffSens)),
            resp1: Resp1::from_byte(self.get(R::Resp1)),
            resp2: Resp2::from_byte(self.get(R::Resp2)),
            gpio: Gpio::from_byte(self.get(R::Gpio)),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.configuration().config1.data_rate.hz()
    }

    /// Compare against registers read back from the chip, ignoring the registers the chip may
    /// legitimately report differently. Returns the first mismatch as `(register, wrote, read)`.
    pub fn mismatch(&self, read: &RegisterMap) -> Option<(Register, u8, u8)> {
        (0..NREG as u8)
            .filter_map(Register::from_addr)
            .filter(|r| !r.is_volatile())
            .find(|r| self.get(*r) != read.get(*r))
            .map(|r| (r, self.get(r), read.get(r)))
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Configuration::default().to_map()
    }
}

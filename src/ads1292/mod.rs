//! Driver for the ADS1292(R) analog front-end.
//!
//! Every transfer is framed by pulling chip-select low, waiting a short guard, clocking the
//! bytes and waiting again before releasing chip-select. The chip has to be taken out of
//! continuous-read mode (`SDATAC`) before registers can be accessed.

use core::fmt::Debug;
use embedded_hal::blocking::{
    delay::{DelayMs, DelayUs},
    spi::Transfer,
};
use embedded_hal::digital::v2::OutputPin;

use crate::frame::{RawFrame, FRAME_SZ};
use crate::retry::Retry;

pub mod registers;
pub use registers::{DeviceId, Register, RegisterMap, NREG};

/// Guard around command and register transfers [us].
pub const CMD_GUARD_US: u16 = 100;

/// Guard around frame reads [us].
pub const FRAME_GUARD_US: u16 = 1;

/// Settling time between the steps of the power-on sequence [ms].
pub const POWER_ON_DELAY_MS: u16 = 1000;

/// Time for the internal reference to settle after it is enabled [ms].
pub const REFERENCE_SETTLE_MS: u16 = 10;

/// Dummy byte clocked out while reading.
const DUMMY: u8 = 0x00;

/// Byte clocked out while reading a data frame.
const FRAME_DUMMY: u8 = 0xff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum Command {
    Wakeup = 0x02,
    Standby = 0x04,
    Reset = 0x06,
    Start = 0x08,
    Stop = 0x0a,
    OffsetCal = 0x1a,
    /// Start continuous read.
    Rdatac = 0x10,
    /// Stop continuous read.
    Sdatac = 0x11,
    Rdata = 0x12,
}

/// Opcode prefix of register read.
pub const RREG: u8 = 0x20;

/// Opcode prefix of register write.
pub const WREG: u8 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Error<E: Debug> {
    Spi(E),
    /// Any of the control lines could not be set.
    Pin,
    /// The identity register did not hold a known device code.
    UnknownDevice(u8),
    VerifyMismatch {
        register: Register,
        wrote: u8,
        read: u8,
    },
    /// A transfer of `len` registers starting at `register` runs past the last register.
    Length { register: Register, len: usize },
}

impl<E: Debug> From<E> for Error<E> {
    fn from(e: E) -> Error<E> {
        Error::Spi(e)
    }
}

/// Operations the acquisition loop needs from a sensor front-end.
pub trait Frontend {
    type Error: Debug + defmt::Format;

    /// Power cycle and reset the chip, leaving it out of continuous-read mode.
    fn power_on_reset(&mut self, delay: &mut impl Delay) -> Result<(), Self::Error>;

    /// Read the identity register until a known device answers, or `retry` is exhausted.
    fn probe_device_id(
        &mut self,
        retry: Retry,
        delay: &mut impl Delay,
    ) -> Result<DeviceId, Self::Error>;

    /// Write all registers except the identity register, then read all of them back and
    /// compare.
    fn write_register_table(
        &mut self,
        map: &RegisterMap,
        delay: &mut impl Delay,
    ) -> Result<(), Self::Error>;

    fn send_command(&mut self, cmd: Command, delay: &mut impl Delay) -> Result<(), Self::Error>;

    fn start_continuous(&mut self, delay: &mut impl Delay) -> Result<(), Self::Error>;

    fn halt(&mut self, delay: &mut impl Delay) -> Result<(), Self::Error>;

    fn read_frame(&mut self, delay: &mut impl Delay) -> Result<RawFrame, Self::Error>;

    /// Write `map` and re-attempt the whole table until it verifies or `retry` is exhausted.
    fn configure(
        &mut self,
        map: &RegisterMap,
        retry: Retry,
        delay: &mut impl Delay,
    ) -> Result<(), Self::Error> {
        retry.run(delay, |_, delay| self.write_register_table(map, delay))
    }

    /// Reset, identify and configure the chip, then start continuous conversion.
    fn bring_up(
        &mut self,
        map: &RegisterMap,
        probe: Retry,
        verify: Retry,
        delay: &mut impl Delay,
    ) -> Result<DeviceId, Self::Error> {
        self.power_on_reset(delay)?;
        let id = self.probe_device_id(probe, delay)?;
        self.configure(map, verify, delay)?;
        self.start_continuous(delay)?;

        Ok(id)
    }
}

/// Registers following `reg` must cover `len`, the opcode count can not address past the map.
fn check_range<E: Debug>(reg: Register, len: usize) -> Result<(), Error<E>> {
    if len > NREG - reg.addr() as usize {
        Err(Error::Length { register: reg, len })
    } else {
        Ok(())
    }
}

/// Millisecond and microsecond delays.
pub trait Delay: DelayMs<u16> + DelayUs<u16> {}
impl<D: DelayMs<u16> + DelayUs<u16>> Delay for D {}

pub struct Ads1292<SPI, CS, START, PWDN> {
    spi: SPI,
    cs: CS,
    start: START,
    pwdn: PWDN,
}

impl<E, SPI, CS, START, PWDN> Ads1292<SPI, CS, START, PWDN>
where
    E: Debug,
    SPI: Transfer<u8, Error = E>,
    CS: OutputPin,
    START: OutputPin,
    PWDN: OutputPin,
{
    /// Take ownership of the bus and control lines. Chip-select is released and conversion is
    /// stopped, the chip is otherwise left untouched.
    pub fn new(
        spi: SPI,
        mut cs: CS,
        mut start: START,
        pwdn: PWDN,
    ) -> Result<Ads1292<SPI, CS, START, PWDN>, Error<E>> {
        cs.set_high().map_err(|_| Error::Pin)?;
        start.set_low().map_err(|_| Error::Pin)?;

        Ok(Ads1292 {
            spi,
            cs,
            start,
            pwdn,
        })
    }

    pub fn release(self) -> (SPI, CS, START, PWDN) {
        (self.spi, self.cs, self.start, self.pwdn)
    }

    /// Run `f` with chip-select asserted and `guard_us` guards on both sides.
    fn selected<T>(
        &mut self,
        guard_us: u16,
        delay: &mut impl Delay,
        f: impl FnOnce(&mut SPI) -> Result<T, E>,
    ) -> Result<T, Error<E>> {
        self.cs.set_low().map_err(|_| Error::Pin)?;
        delay.delay_us(guard_us);

        let r = f(&mut self.spi);

        delay.delay_us(guard_us);
        self.cs.set_high().map_err(|_| Error::Pin)?;

        Ok(r?)
    }

    /// Write `data.len()` consecutive registers starting at `reg`.
    pub fn write_registers(
        &mut self,
        reg: Register,
        data: &[u8],
        delay: &mut impl Delay,
    ) -> Result<(), Error<E>> {
        if data.is_empty() {
            return Ok(());
        }
        check_range(reg, data.len())?;

        defmt::trace!("writing {} registers from {:?}", data.len(), reg);

        self.selected(CMD_GUARD_US, delay, |spi| {
            spi.transfer(&mut [WREG | reg.addr(), (data.len() - 1) as u8])?;

            let mut buf = [0u8; NREG];
            let buf = &mut buf[..data.len()];
            buf.copy_from_slice(data);
            spi.transfer(buf)?;

            Ok(())
        })
    }

    /// Read `out.len()` consecutive registers starting at `reg`.
    pub fn read_registers(
        &mut self,
        reg: Register,
        out: &mut [u8],
        delay: &mut impl Delay,
    ) -> Result<(), Error<E>> {
        if out.is_empty() {
            return Ok(());
        }
        check_range(reg, out.len())?;

        self.selected(CMD_GUARD_US, delay, |spi| {
            spi.transfer(&mut [RREG | reg.addr(), (out.len() - 1) as u8])?;

            for b in out.iter_mut() {
                *b = DUMMY;
            }
            spi.transfer(out)?;

            Ok(())
        })
    }

    pub fn read_register(&mut self, reg: Register, delay: &mut impl Delay) -> Result<u8, Error<E>> {
        let mut b = [0u8];
        self.read_registers(reg, &mut b, delay)?;
        Ok(b[0])
    }

    pub fn write_register(
        &mut self,
        reg: Register,
        v: u8,
        delay: &mut impl Delay,
    ) -> Result<(), Error<E>> {
        self.write_registers(reg, &[v], delay)
    }

    /// Read all registers.
    pub fn read_register_map(&mut self, delay: &mut impl Delay) -> Result<RegisterMap, Error<E>> {
        let mut m = RegisterMap([0u8; NREG]);
        self.read_registers(Register::Id, &mut m.0, delay)?;
        Ok(m)
    }

}

impl<E, SPI, CS, START, PWDN> Frontend for Ads1292<SPI, CS, START, PWDN>
where
    E: Debug + defmt::Format,
    SPI: Transfer<u8, Error = E>,
    CS: OutputPin,
    START: OutputPin,
    PWDN: OutputPin,
{
    type Error = Error<E>;

    fn power_on_reset(&mut self, delay: &mut impl Delay) -> Result<(), Error<E>> {
        defmt::info!("ads1292: power-on reset..");

        self.start.set_low().map_err(|_| Error::Pin)?;
        self.cs.set_high().map_err(|_| Error::Pin)?;
        self.pwdn.set_low().map_err(|_| Error::Pin)?;
        self.pwdn.set_high().map_err(|_| Error::Pin)?;
        delay.delay_ms(POWER_ON_DELAY_MS);

        self.send_command(Command::Sdatac, delay)?;
        delay.delay_ms(POWER_ON_DELAY_MS);

        self.send_command(Command::Reset, delay)?;
        delay.delay_ms(POWER_ON_DELAY_MS);

        self.send_command(Command::Sdatac, delay)?;
        delay.delay_ms(POWER_ON_DELAY_MS);

        Ok(())
    }

    fn probe_device_id(
        &mut self,
        retry: Retry,
        delay: &mut impl Delay,
    ) -> Result<DeviceId, Error<E>> {
        defmt::debug!(
            "ads1292: probing device id ({} attempts, every {} ms, up to {} ms)..",
            retry.attempts,
            retry.interval_ms,
            retry.timeout_ms()
        );

        let id = retry.run(delay, |_, delay| {
            let b = self.read_register(Register::Id, delay)?;
            DeviceId::from_byte(b).ok_or(Error::UnknownDevice(b))
        })?;

        defmt::info!("ads1292: identified {:?}", id);

        Ok(id)
    }

    fn write_register_table(
        &mut self,
        map: &RegisterMap,
        delay: &mut impl Delay,
    ) -> Result<(), Error<E>> {
        self.write_registers(Register::Config1, &map.0[1..], delay)?;
        delay.delay_ms(REFERENCE_SETTLE_MS);

        let read = self.read_register_map(delay)?;

        match map.mismatch(&read) {
            None => {
                defmt::info!("ads1292: register table verified: {:?}", read);
                Ok(())
            }
            Some((register, wrote, read)) => {
                defmt::warn!(
                    "ads1292: register {:?} verify failed: wrote {:#x}, read {:#x}",
                    register,
                    wrote,
                    read
                );

                Err(Error::VerifyMismatch {
                    register,
                    wrote,
                    read,
                })
            }
        }
    }

    fn send_command(&mut self, cmd: Command, delay: &mut impl Delay) -> Result<(), Error<E>> {
        defmt::trace!("ads1292: command {:?}", cmd);

        self.selected(CMD_GUARD_US, delay, |spi| {
            spi.transfer(&mut [cmd as u8])?;
            Ok(())
        })
    }

    fn start_continuous(&mut self, delay: &mut impl Delay) -> Result<(), Error<E>> {
        defmt::info!("ads1292: starting continuous conversion.");
        self.send_command(Command::Rdatac, delay)?;
        self.start.set_high().map_err(|_| Error::Pin)
    }

    fn halt(&mut self, delay: &mut impl Delay) -> Result<(), Error<E>> {
        defmt::info!("ads1292: halting conversion.");
        self.start.set_low().map_err(|_| Error::Pin)?;
        self.send_command(Command::Sdatac, delay)
    }

    fn read_frame(&mut self, delay: &mut impl Delay) -> Result<RawFrame, Error<E>> {
        self.selected(FRAME_GUARD_US, delay, |spi| {
            let mut b = [FRAME_DUMMY; FRAME_SZ];
            spi.transfer(&mut b)?;
            Ok(RawFrame(b))
        })
    }
}

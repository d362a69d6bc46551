//! Host-side stand-ins for the hardware: a simulated ADS1292 on a SPI bus, its control lines,
//! delays that only count, push-button keys and a display recording what is drawn.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use core::convert::Infallible;
use embedded_hal::blocking::{
    delay::{DelayMs, DelayUs},
    spi::Transfer,
};
use embedded_hal::digital::v2::{InputPin, OutputPin};

use crate::ads1292::{Command, Register, NREG, RREG, WREG};
use crate::display::{Color, Display, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct BusError;

#[derive(Debug, Default)]
pub struct MockDelay {
    pub ms: u32,
    pub us: u32,
}

impl DelayMs<u16> for MockDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.ms += ms as u32;
    }
}

impl DelayMs<u32> for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.ms += ms;
    }
}

impl DelayUs<u16> for MockDelay {
    fn delay_us(&mut self, us: u16) {
        self.us += us as u32;
    }
}

impl DelayUs<u32> for MockDelay {
    fn delay_us(&mut self, us: u32) {
        self.us += us;
    }
}

/// Where the chip is in the byte stream of the current select window.
#[derive(Debug, Clone, Copy)]
enum Parse {
    Opcode,
    ReadCount { addr: u8 },
    Reading { addr: u8, left: u8 },
    WriteCount { addr: u8 },
    Writing { addr: u8, left: u8 },
}

struct State {
    regs: [u8; NREG],

    cs: bool,
    start: bool,
    pwdn: bool,

    continuous: bool,
    parse: Parse,

    commands: Vec<u8>,
    unselected: usize,

    /// Identity reads answered with 0x00 before the chip responds.
    id_silent: u32,

    /// Remaining writes to a register that are stored as 0xff.
    corrupt: [u32; NREG],

    frames: VecDeque<u8>,
    fail: bool,
}

impl State {
    fn new(id: u8) -> State {
        let mut regs = [0u8; NREG];
        regs[Register::Id.addr() as usize] = id;

        State {
            regs,
            cs: true,
            start: false,
            pwdn: false,
            continuous: true,
            parse: Parse::Opcode,
            commands: Vec::new(),
            unselected: 0,
            id_silent: 0,
            corrupt: [0; NREG],
            frames: VecDeque::new(),
            fail: false,
        }
    }

    fn clock(&mut self, b: u8) -> u8 {
        match self.parse {
            Parse::Opcode => match b & 0xe0 {
                RREG => {
                    self.parse = Parse::ReadCount { addr: b & 0x1f };
                    0
                }
                WREG => {
                    self.parse = Parse::WriteCount { addr: b & 0x1f };
                    0
                }
                _ if b == 0xff => self.frames.pop_front().unwrap_or(0),
                _ => {
                    self.command(b);
                    0
                }
            },
            Parse::ReadCount { addr } => {
                self.parse = Parse::Reading { addr, left: b + 1 };
                0
            }
            Parse::Reading { addr, left } => {
                self.parse = if left > 1 {
                    Parse::Reading {
                        addr: addr + 1,
                        left: left - 1,
                    }
                } else {
                    Parse::Opcode
                };
                self.read(addr)
            }
            Parse::WriteCount { addr } => {
                self.parse = Parse::Writing { addr, left: b + 1 };
                0
            }
            Parse::Writing { addr, left } => {
                self.parse = if left > 1 {
                    Parse::Writing {
                        addr: addr + 1,
                        left: left - 1,
                    }
                } else {
                    Parse::Opcode
                };
                self.write(addr, b);
                0
            }
        }
    }

    fn command(&mut self, b: u8) {
        self.commands.push(b);

        if b == Command::Rdatac as u8 {
            self.continuous = true;
        } else if b == Command::Sdatac as u8 {
            self.continuous = false;
        }
    }

    fn read(&mut self, addr: u8) -> u8 {
        let a = addr as usize;
        if a >= NREG {
            return 0;
        }

        if a == Register::Id.addr() as usize && self.id_silent > 0 {
            self.id_silent -= 1;
            return 0x00;
        }

        self.regs[a]
    }

    fn write(&mut self, addr: u8, v: u8) {
        let a = addr as usize;
        if a >= NREG || a == Register::Id.addr() as usize || a == Register::LoffStat.addr() as usize
        {
            return;
        }

        if self.corrupt[a] > 0 {
            self.corrupt[a] -= 1;
            self.regs[a] = 0xff;
        } else {
            self.regs[a] = v;
        }
    }
}

/// Simulated front-end. Hand out the bus and the control lines with [`Chip::spi`] and friends, and
/// inspect the chip through the handle afterwards.
#[derive(Clone)]
pub struct Chip(Rc<RefCell<State>>);

impl Chip {
    pub fn new(id: u8) -> Chip {
        Chip(Rc::new(RefCell::new(State::new(id))))
    }

    pub fn spi(&self) -> Spi {
        Spi(self.0.clone())
    }

    pub fn cs(&self) -> Pin {
        Pin {
            state: self.0.clone(),
            line: Line::Cs,
        }
    }

    pub fn start(&self) -> Pin {
        Pin {
            state: self.0.clone(),
            line: Line::Start,
        }
    }

    pub fn pwdn(&self) -> Pin {
        Pin {
            state: self.0.clone(),
            line: Line::Pwdn,
        }
    }

    pub fn set_continuous(&self, on: bool) {
        self.0.borrow_mut().continuous = on;
    }

    pub fn continuous(&self) -> bool {
        self.0.borrow().continuous
    }

    /// Plain command opcodes received, register access excluded.
    pub fn commands(&self) -> Vec<u8> {
        self.0.borrow().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.0.borrow_mut().commands.clear();
    }

    pub fn cs_high(&self) -> bool {
        self.0.borrow().cs
    }

    pub fn start_high(&self) -> bool {
        self.0.borrow().start
    }

    pub fn pwdn_high(&self) -> bool {
        self.0.borrow().pwdn
    }

    /// Bytes clocked while chip-select was released.
    pub fn unselected_bytes(&self) -> usize {
        self.0.borrow().unselected
    }

    /// Answer the first `n` identity reads with 0x00.
    pub fn answer_id_after(&self, n: u32) {
        self.0.borrow_mut().id_silent = n;
    }

    /// Store 0xff instead of the written value for the next `times` writes to `reg`.
    pub fn corrupt(&self, reg: Register, times: u32) {
        self.0.borrow_mut().corrupt[reg.addr() as usize] = times;
    }

    pub fn register(&self, reg: Register) -> u8 {
        self.0.borrow().regs[reg.addr() as usize]
    }

    pub fn push_frame(&self, f: [u8; 9]) {
        self.0.borrow_mut().frames.extend(f.iter().copied());
    }

    pub fn pending_frame_bytes(&self) -> usize {
        self.0.borrow().frames.len()
    }

    pub fn fail_bus(&self, fail: bool) {
        self.0.borrow_mut().fail = fail;
    }
}

pub struct Spi(Rc<RefCell<State>>);

impl Transfer<u8> for Spi {
    type Error = BusError;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], BusError> {
        let mut s = self.0.borrow_mut();

        if s.fail {
            return Err(BusError);
        }

        if s.cs {
            s.unselected += words.len();
            return Ok(words);
        }

        for w in words.iter_mut() {
            *w = s.clock(*w);
        }

        Ok(words)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Cs,
    Start,
    Pwdn,
}

pub struct Pin {
    state: Rc<RefCell<State>>,
    line: Line,
}

impl Pin {
    fn set(&mut self, high: bool) {
        let mut s = self.state.borrow_mut();

        match self.line {
            Line::Cs => {
                // a new select window starts a new command.
                if high {
                    s.parse = Parse::Opcode;
                }
                s.cs = high;
            }
            Line::Start => s.start = high,
            Line::Pwdn => s.pwdn = high,
        }
    }
}

impl OutputPin for Pin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.set(true);
        Ok(())
    }
}

/// Active-low push button.
#[derive(Debug, Clone, Copy, Default)]
pub struct Key {
    pub pressed: bool,
}

impl Key {
    pub fn pressed() -> Key {
        Key { pressed: true }
    }

    pub fn released() -> Key {
        Key { pressed: false }
    }
}

impl InputPin for Key {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(!self.pressed)
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        Ok(self.pressed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Clear(Color),
    Fill(Rect, Color),
    Line(u16, u16, u16, u16, Color),
    Text(u16, u16, String, Color),
    Number(u16, u16, f32, u8, Color),
}

/// Display recording every primitive drawn.
#[derive(Debug, Default)]
pub struct Canvas {
    pub ops: Vec<Op>,
}

impl Canvas {
    pub fn lines(&self) -> impl Iterator<Item = (u16, u16, u16, u16)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            Op::Line(x0, y0, x1, y1, _) => Some((*x0, *y0, *x1, *y1)),
            _ => None,
        })
    }

    pub fn numbers(&self) -> impl Iterator<Item = f32> + '_ {
        self.ops.iter().filter_map(|op| match op {
            Op::Number(_, _, v, _, _) => Some(*v),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.ops.iter().filter_map(|op| match op {
            Op::Text(_, _, t, _) => Some(t.as_str()),
            _ => None,
        })
    }
}

impl Display for Canvas {
    type Error = Infallible;

    fn clear(&mut self, color: Color) -> Result<(), Infallible> {
        self.ops.push(Op::Clear(color));
        Ok(())
    }

    fn fill_rect(&mut self, area: Rect, color: Color) -> Result<(), Infallible> {
        self.ops.push(Op::Fill(area, color));
        Ok(())
    }

    fn draw_line(
        &mut self,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
        color: Color,
    ) -> Result<(), Infallible> {
        self.ops.push(Op::Line(x0, y0, x1, y1, color));
        Ok(())
    }

    fn draw_text(&mut self, x: u16, y: u16, text: &str, color: Color) -> Result<(), Infallible> {
        self.ops.push(Op::Text(x, y, String::from(text), color));
        Ok(())
    }

    fn draw_number(
        &mut self,
        x: u16,
        y: u16,
        value: f32,
        decimals: u8,
        color: Color,
    ) -> Result<(), Infallible> {
        self.ops.push(Op::Number(x, y, value, decimals, color));
        Ok(())
    }
}

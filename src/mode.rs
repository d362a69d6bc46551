//! The waveform mode shared between the key polling task and the bench task.

use core::sync::atomic::{AtomicU8, Ordering};
use embedded_hal::digital::v2::InputPin;

use crate::waveform::Mode;

/// Single writer (key polling), any number of readers.
pub struct ModeSelector(AtomicU8);

impl ModeSelector {
    pub const fn new(mode: Mode) -> ModeSelector {
        ModeSelector(AtomicU8::new(mode as u8))
    }

    pub fn load(&self) -> Mode {
        Mode::from_u8(self.0.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn store(&self, mode: Mode) {
        self.0.store(mode as u8, Ordering::Relaxed);
    }

    /// Read the three active-low keys in order and select the mode of the first one pressed. If
    /// no key is pressed (or a key cannot be read) the mode is left as it is.
    pub fn poll<K0, K1, K2>(&self, sine: &K0, square: &K1, triangle: &K2) -> Mode
    where
        K0: InputPin,
        K1: InputPin,
        K2: InputPin,
    {
        let pressed = if sine.is_low().unwrap_or(false) {
            Some(Mode::Sine)
        } else if square.is_low().unwrap_or(false) {
            Some(Mode::Square)
        } else if triangle.is_low().unwrap_or(false) {
            Some(Mode::Triangle)
        } else {
            None
        };

        match pressed {
            Some(m) if m != self.load() => {
                defmt::info!("mode: {:?}", m);
                self.store(m);
                m
            }
            Some(m) => m,
            None => self.load(),
        }
    }
}

impl Default for ModeSelector {
    fn default() -> Self {
        ModeSelector::new(Mode::default())
    }
}

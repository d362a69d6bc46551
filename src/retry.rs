//! Bounded retries for operations that may legitimately fail a few times before the hardware
//! settles (device identification, register table write-back).

use core::fmt::Debug;
use embedded_hal::blocking::delay::DelayMs;

use crate::config;

/// Attempts at writing and verifying the register table.
pub const VERIFY_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct Retry {
    pub attempts: u32,
    pub interval_ms: u16,
}

impl Retry {
    pub const fn new(attempts: u32, interval_ms: u16) -> Retry {
        Retry {
            attempts,
            interval_ms,
        }
    }

    /// Retry policy for identifying the front-end at startup.
    pub const fn probe() -> Retry {
        Retry::new(config::PROBE_ATTEMPTS, config::PROBE_INTERVAL_MS)
    }

    /// Retry policy for re-writing a register table that did not verify. There is no backoff.
    pub const fn verify() -> Retry {
        Retry::new(VERIFY_ATTEMPTS, 0)
    }

    /// Upper bound of the time spent waiting between attempts [ms].
    pub fn timeout_ms(&self) -> u32 {
        self.attempts
            .saturating_sub(1)
            .saturating_mul(self.interval_ms as u32)
    }

    /// Run `op` until it succeeds or `attempts` have been made. The last error is returned if
    /// no attempt succeeds. `op` gets the attempt number (starting at 0) and the delay.
    pub fn run<D: DelayMs<u16>, T, E: Debug + defmt::Format>(
        &self,
        delay: &mut D,
        mut op: impl FnMut(u32, &mut D) -> Result<T, E>,
    ) -> Result<T, E> {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;

        loop {
            match op(attempt, delay) {
                Ok(v) => return Ok(v),
                Err(e) if attempt + 1 >= attempts => {
                    defmt::error!("giving up after {} attempts: {:?}", attempts, e);
                    return Err(e);
                }
                Err(e) => {
                    defmt::warn!("attempt {}/{} failed: {:?}", attempt + 1, attempts, e);
                    delay.delay_ms(self.interval_ms);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDelay;

    #[test]
    fn succeeds_after_failures() {
        let mut delay = MockDelay::default();
        let r = Retry::new(5, 100);

        let v = r.run(&mut delay, |n, _| if n < 3 { Err(n) } else { Ok(n * 10) });

        assert_eq!(v, Ok(30));
        assert_eq!(delay.ms, 300);
    }

    #[test]
    fn bounded() {
        let mut delay = MockDelay::default();
        let r = Retry::new(4, 250);
        let mut calls = 0;

        let v: Result<(), u32> = r.run(&mut delay, |n, _| {
            calls += 1;
            Err(n)
        });

        assert_eq!(v, Err(3));
        assert_eq!(calls, 4);
        assert_eq!(delay.ms, r.timeout_ms());
        assert_eq!(r.timeout_ms(), 750);
    }

    #[test]
    fn zero_attempts_tries_once() {
        let mut delay = MockDelay::default();
        let r = Retry::new(0, 10);
        let mut calls = 0;

        let v: Result<(), u32> = r.run(&mut delay, |n, _| {
            calls += 1;
            Err(n)
        });

        assert_eq!(v, Err(0));
        assert_eq!(calls, 1);
        assert_eq!(delay.ms, 0);
    }

    #[test]
    fn timeout_saturates() {
        assert_eq!(Retry::new(u32::MAX, u16::MAX).timeout_ms(), u32::MAX);
        assert_eq!(Retry::new(0, 1000).timeout_ms(), 0);
        assert_eq!(Retry::verify().timeout_ms(), 0);
    }

    #[test]
    fn probe_policy_is_configured() {
        let r = Retry::probe();
        assert_eq!(r.attempts, config::PROBE_ATTEMPTS);
        assert!(r.attempts > 0);
    }
}

#![cfg_attr(not(test), no_std)]

use static_assertions as sa;

pub mod config {
    include!(concat!(env!("OUT_DIR"), "/config.rs"));
}

pub mod acquisition;
pub mod ads1292;
pub mod bench;
pub mod display;
pub mod fir;
pub mod frame;
pub mod mailbox;
pub mod mode;
pub mod plot;
pub mod retry;
pub mod ring;
pub mod spectrum;
pub mod telemetry;
pub mod waveform;

#[cfg(test)]
mod mock;

pub use acquisition::{EcgConfig, EcgTask};
pub use ads1292::{Ads1292, Frontend};
pub use bench::{BenchConfig, BenchTask};
pub use mailbox::DataReady;
pub use mode::ModeSelector;
pub use waveform::Mode;

sa::const_assert!(acquisition::ECG_N.is_power_of_two());
sa::const_assert!(bench::BENCH_N.is_power_of_two());
sa::const_assert_eq!(ads1292::NREG, 12);
sa::const_assert_eq!(fir::NTAP % 2, 1);
sa::const_assert!(config::ECG_ANALYZE_EVERY > 0);
sa::const_assert!(config::BENCH_DECIMATE > 0);

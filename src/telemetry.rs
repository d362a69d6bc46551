//! Reports streamed to the host, one COBS framed postcard packet each.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::waveform::Mode;

/// Largest encoded report, COBS overhead and sentinel included.
pub const MAX_REPORT_SZ: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, defmt::Format)]
pub struct EcgSampleReport {
    pub seq: u32,
    pub ch1: i16,
    pub ch2: i16,
    pub filtered: i16,

    /// `LOFF_STAT[4:0]` of the frame.
    pub lead_off: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, defmt::Format)]
pub struct EcgAnalysisReport {
    pub seq: u32,
    pub peak_bin: u16,
    pub peak_hz: f32,
    pub peak_magnitude: f32,

    /// Peak-to-peak of the filtered samples currently buffered [codes].
    pub peak_to_peak: u16,

    /// Peak-to-peak in volts.
    pub vpp: f32,

    pub dropped: u32,
    pub rejected: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, defmt::Format)]
pub struct BenchReport {
    pub seq: u32,
    pub mode: Mode,
    pub peak_bin: u16,
    pub peak_hz: f32,
    pub vpp: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, defmt::Format)]
pub enum Report {
    EcgSample(EcgSampleReport),
    EcgAnalysis(EcgAnalysisReport),
    Bench(BenchReport),
}

impl From<EcgSampleReport> for Report {
    fn from(r: EcgSampleReport) -> Report {
        Report::EcgSample(r)
    }
}

impl From<EcgAnalysisReport> for Report {
    fn from(r: EcgAnalysisReport) -> Report {
        Report::EcgAnalysis(r)
    }
}

impl From<BenchReport> for Report {
    fn from(r: BenchReport) -> Report {
        Report::Bench(r)
    }
}

/// Encode `report` into `buf`, returning the packet including the trailing zero sentinel.
pub fn encode<'a>(report: &Report, buf: &'a mut [u8]) -> Result<&'a mut [u8], postcard::Error> {
    postcard::to_slice_cobs(report, buf)
}

/// Encode `report` into an owned packet.
pub fn encode_vec(report: &Report) -> Result<Vec<u8, MAX_REPORT_SZ>, postcard::Error> {
    postcard::to_vec_cobs(report)
}
